use crate::commands::{CmdMessage, CmdResult};
use crate::error::{AdLayersError, Result};
use crate::model::{
    AdLayer, LayerMeta, PostId, PostStatus, AD_LAYER_POST_TYPE, CUSTOM_VARIABLES_OPTION,
    PRIORITY_OPTION, SETTINGS_OPTION,
};
use crate::request::Site;
use crate::store::SiteStore;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Version written into export files. Newer files are refused on import.
pub const EXPORT_VERSION: u64 = 1;

#[derive(Debug, Serialize)]
pub struct ExportPayload {
    pub version: u64,
    pub ad_layers: Value,
    pub ad_layers_custom_variables: Value,
    pub ad_layers_ad_server_settings: Value,
    pub layers: Vec<ExportedLayer>,
}

#[derive(Debug, Serialize)]
pub struct ExportedLayer {
    pub post_object: ExportedPost,
    pub meta: LayerMeta,
}

#[derive(Debug, Serialize)]
pub struct ExportedPost {
    #[serde(rename = "ID")]
    pub id: PostId,
    pub post_title: String,
    pub post_status: PostStatus,
    pub post_type: &'static str,
}

impl From<AdLayer> for ExportedLayer {
    fn from(layer: AdLayer) -> Self {
        Self {
            post_object: ExportedPost {
                id: layer.id,
                post_title: layer.title,
                post_status: layer.status,
                post_type: AD_LAYER_POST_TYPE,
            },
            meta: layer.meta,
        }
    }
}

/// Options as stored, plus every exportable layer in priority order.
pub fn payload<S: SiteStore>(store: &S) -> Result<ExportPayload> {
    // Missing options export as `false`, the way they read on the site.
    let option = |name: &str| -> Result<Value> {
        Ok(store.get_option(name)?.unwrap_or(Value::Bool(false)))
    };

    let mut layers = Vec::new();
    for entry in store.priority()? {
        let layer = match store.get_layer(entry.post_id) {
            Ok(layer) => layer,
            Err(AdLayersError::LayerNotFound(id)) => {
                tracing::warn!(layer = %id, "priority entry without a layer post, not exported");
                continue;
            }
            Err(e) => return Err(e),
        };
        if layer.status.is_exportable() {
            layers.push(ExportedLayer::from(layer));
        }
    }

    Ok(ExportPayload {
        version: EXPORT_VERSION,
        ad_layers: option(PRIORITY_OPTION)?,
        ad_layers_custom_variables: option(CUSTOM_VARIABLES_OPTION)?,
        ad_layers_ad_server_settings: option(SETTINGS_OPTION)?,
        layers,
    })
}

/// `{site}.ad_layers.{date}.json`, without the site part when the name is blank.
pub fn filename(site: &Site, date: NaiveDate) -> String {
    let sitename: String = site
        .name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    let prefix = if sitename.is_empty() {
        String::new()
    } else {
        format!("{}.", sitename)
    };
    format!("{}ad_layers.{}.json", prefix, date.format("%Y-%m-%d"))
}

/// Write the export file. Without a destination it is named after the site
/// and today's date, in the current directory.
pub fn run<S: SiteStore>(
    store: &S,
    site: &Site,
    destination: Option<PathBuf>,
) -> Result<CmdResult> {
    let payload = payload(store)?;
    let content = serde_json::to_string_pretty(&payload)?;
    let path = destination
        .unwrap_or_else(|| PathBuf::from(filename(site, Utc::now().date_naive())));
    fs::write(&path, &content).map_err(AdLayersError::Io)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Exported {} layer(s) to {}",
        payload.layers.len(),
        path.display()
    )));
    Ok(result.with_written_paths(vec![path]).with_output(content))
}
