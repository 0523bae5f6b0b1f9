use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::SiteStore;

/// Replace the custom targeting variables. Blank and repeated names are dropped.
pub fn set<S: SiteStore>(store: &mut S, variables: Vec<String>) -> Result<CmdResult> {
    let mut cleaned: Vec<String> = Vec::with_capacity(variables.len());
    for variable in variables {
        let variable = variable.trim().to_string();
        if !variable.is_empty() && !cleaned.contains(&variable) {
            cleaned.push(variable);
        }
    }
    store.set_custom_variables(&cleaned)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Saved {} custom variable(s)",
        cleaned.len()
    )));
    Ok(result.with_custom_variables(cleaned))
}

pub fn show<S: SiteStore>(store: &S) -> Result<CmdResult> {
    Ok(CmdResult::default().with_custom_variables(store.custom_variables()?))
}
