use crate::commands::{CmdMessage, CmdResult};
use crate::context::Snapshot;
use crate::error::{AdLayersError, Result};
use crate::model::DFP_CACHE_OPTION;
use crate::server::AdServerRegistry;
use crate::settings::{self, AdServerSettings};
use crate::store::SiteStore;
use serde_json::Value;

/// Save ad server settings given as submitted form values.
pub fn set<S: SiteStore>(store: &mut S, value: Value) -> Result<CmdResult> {
    let settings: AdServerSettings = match value {
        Value::Object(_) => serde_json::from_value(value)?,
        _ => {
            return Err(AdLayersError::Api(
                "Ad server settings must be a JSON object".to_string(),
            ))
        }
    };
    save(store, settings)
}

/// Save settings and rebuild the breakpoint cache.
pub fn save<S: SiteStore>(store: &mut S, settings: AdServerSettings) -> Result<CmdResult> {
    store.set_settings(&settings)?;
    let mut result = compile_into(store, &settings)?;
    result.messages.insert(0, CmdMessage::success("Ad server settings saved"));
    Ok(result.with_settings(settings))
}

pub fn show<S: SiteStore>(store: &S) -> Result<CmdResult> {
    Ok(CmdResult::default()
        .with_settings(store.settings()?)
        .with_compiled(store.compiled_settings()?))
}

/// Rebuild the breakpoint cache from the stored settings.
pub fn compile<S: SiteStore>(store: &mut S) -> Result<CmdResult> {
    let settings = store.settings()?;
    compile_into(store, &settings)
}

fn compile_into<S: SiteStore>(store: &mut S, settings: &AdServerSettings) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    match settings::compile(settings) {
        Some(compiled) => {
            store.set_compiled_settings(&compiled)?;
            tracing::info!(breakpoints = compiled.len(), "breakpoint cache compiled");
            result.add_message(CmdMessage::info(format!(
                "Compiled {} breakpoint(s)",
                compiled.len()
            )));
            Ok(result.with_compiled(compiled))
        }
        None => {
            store.delete_option(DFP_CACHE_OPTION)?;
            result.add_message(CmdMessage::warning(
                "No breakpoints or ad units are configured; no ad tags will be generated",
            ));
            Ok(result)
        }
    }
}

/// The settings screen of a server, as JSON. Defaults to the configured server.
pub fn fields(
    registry: &AdServerRegistry,
    snapshot: &Snapshot,
    key: Option<&str>,
) -> Result<CmdResult> {
    let server = match key {
        Some(key) => registry.get(key),
        None => registry.active(&snapshot.settings),
    };
    let Some(server) = server else {
        let options: Vec<String> = registry.options().into_iter().map(|(key, _)| key).collect();
        return Err(AdLayersError::Api(format!(
            "No ad server selected. Available: {}",
            options.join(", ")
        )));
    };
    let fields = server.settings_fields(snapshot);
    Ok(CmdResult::default().with_output(serde_json::to_string_pretty(&fields)?))
}
