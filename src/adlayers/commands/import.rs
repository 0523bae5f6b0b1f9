//! Import of an export file.
//!
//! The file is checked first; a file that fails the checks changes nothing.
//! After that the import runs to the end: options that cannot be imported and
//! layers that cannot be created are reported and skipped, never rolled back.

use crate::commands::export::EXPORT_VERSION;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{AdLayersError, Result};
use crate::lenient;
use crate::model::{
    AdLayer, LayerMeta, LayerRef, PostId, PostStatus, CUSTOM_VARIABLES_OPTION, DFP_CACHE_OPTION,
    PRIORITY_OPTION, SETTINGS_OPTION,
};
use crate::settings;
use crate::store::SiteStore;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Options taken from the file, in import order.
const IMPORTED_OPTIONS: [&str; 2] = [SETTINGS_OPTION, CUSTOM_VARIABLES_OPTION];

const CORRUPT_FILE: &str =
    "Sorry, there has been an error. This file may not contain data or is corrupt.";
const NO_OPTIONS: &str =
    "Sorry, there has been an error. This file appears valid, but does not seem to have any options.";

/// Import from the text of an export file.
pub fn run<S: SiteStore>(
    store: &mut S,
    content: &str,
    override_existing: bool,
) -> Result<CmdResult> {
    let data: Value = serde_json::from_str(content)
        .map_err(|_| AdLayersError::Import(CORRUPT_FILE.to_string()))?;
    import(store, &data, override_existing)
}

/// Import a parsed export file.
pub fn import<S: SiteStore>(
    store: &mut S,
    data: &Value,
    override_existing: bool,
) -> Result<CmdResult> {
    check(data)?;
    let mut result = CmdResult::default();

    for name in IMPORTED_OPTIONS {
        import_option(store, data, name, override_existing, &mut result)?;
    }
    refresh_cache(store)?;

    for layer in store.list_layers()? {
        store.delete_layer(layer.id)?;
    }
    tracing::info!("existing ad layers deleted for import");

    let imported = import_layers(store, data, &mut result)?;

    store.delete_option(PRIORITY_OPTION)?;
    let priority = rebuild_priority(data, &imported);
    if !priority.is_empty() {
        store.set_priority(&priority)?;
    }

    result.add_message(CmdMessage::success(format!(
        "All done. Imported {} layer(s).",
        imported.len()
    )));
    let layers = store.list_layers()?;
    Ok(result.with_affected_layers(layers).with_priority(priority))
}

fn check(data: &Value) -> Result<()> {
    let version = data.get("version").unwrap_or(&Value::Null);
    if is_empty(version) {
        return Err(AdLayersError::Import(CORRUPT_FILE.to_string()));
    }
    let number = version_number(version);
    if number > EXPORT_VERSION as f64 {
        return Err(AdLayersError::Import(format!(
            "This JSON file (version {}) is from a newer version of this plugin and may not be compatible. Please update this plugin.",
            number.trunc()
        )));
    }
    let sections = [
        PRIORITY_OPTION,
        CUSTOM_VARIABLES_OPTION,
        SETTINGS_OPTION,
        "layers",
    ];
    if sections
        .iter()
        .all(|key| data.get(*key).map_or(true, is_empty))
    {
        return Err(AdLayersError::Import(NO_OPTIONS.to_string()));
    }
    Ok(())
}

fn version_number(version: &Value) -> f64 {
    match version {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

/// Emptiness as the export format understands it.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn import_option<S: SiteStore>(
    store: &mut S,
    data: &Value,
    name: &str,
    override_existing: bool,
    result: &mut CmdResult,
) -> Result<()> {
    if !override_existing && store.option_exists(name)? {
        result.add_message(CmdMessage::error(format!(
            "Skipped option `{}` because it currently exists.",
            name
        )));
        return Ok(());
    }
    match data.get(name).filter(|value| !value.is_null()) {
        Some(value) => {
            store.update_option(name, value.clone())?;
            result.add_message(CmdMessage::info(format!("Imported option `{}`.", name)));
        }
        None => result.add_message(CmdMessage::error(format!(
            "Could not find option `{}` in export file.",
            name
        ))),
    }
    Ok(())
}

fn refresh_cache<S: SiteStore>(store: &mut S) -> Result<()> {
    match settings::compile(&store.settings()?) {
        Some(compiled) => store.set_compiled_settings(&compiled),
        None => store.delete_option(DFP_CACHE_OPTION),
    }
}

/// Create the layers of the file. Returns new post ids by title.
fn import_layers<S: SiteStore>(
    store: &mut S,
    data: &Value,
    result: &mut CmdResult,
) -> Result<BTreeMap<String, PostId>> {
    let mut imported = BTreeMap::new();
    let layers = match data.get("layers") {
        Some(Value::Array(layers)) if !layers.is_empty() => layers.as_slice(),
        _ => {
            result.add_message(CmdMessage::error("No layers to import."));
            return Ok(imported);
        }
    };

    for entry in layers {
        let post = entry.get("post_object").unwrap_or(&Value::Null);
        let exported_id = post.get("ID").map(lenient::absint).unwrap_or(0);
        if is_empty(entry) || exported_id == 0 {
            result.add_message(CmdMessage::error(
                "Skipping: Layer does not have proper data.",
            ));
            continue;
        }

        let title = post
            .get("post_title")
            .and_then(scalar_string)
            .unwrap_or_default();
        let status = post
            .get("post_status")
            .and_then(scalar_string)
            .and_then(|status| status.parse::<PostStatus>().ok())
            .unwrap_or_default();

        // The exported id is kept when it is free, so a round trip keeps ids.
        let wanted = PostId(u64::from(exported_id));
        let id = if store.get_layer(wanted).is_err() {
            wanted
        } else {
            store.allocate_id()?
        };

        let mut layer = AdLayer::new(id, title, status);
        layer.meta = whitelisted_meta(entry.get("meta"));
        layer.imported_at = Some(Utc::now());

        if let Err(e) = store.save_layer(&layer) {
            tracing::warn!(error = %e, "layer insert failed during import");
            result.add_message(CmdMessage::error(format!(
                "Skipping: Layer {} could not be created",
                layer.title
            )));
            continue;
        }
        result.add_message(CmdMessage::info(format!(
            "Imported layer {} \"{}\"",
            layer.id, layer.title
        )));
        imported.insert(layer.title.clone(), layer.id);
    }
    Ok(imported)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Layer meta restricted to the exported keys.
fn whitelisted_meta(meta: Option<&Value>) -> LayerMeta {
    let Some(Value::Object(meta)) = meta else {
        return LayerMeta::default();
    };
    let allowed: Map<String, Value> = meta
        .iter()
        .filter(|(key, _)| LayerMeta::KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    serde_json::from_value(Value::Object(allowed)).unwrap_or_default()
}

/// The file's priority order, mapped by title onto the imported layers.
fn rebuild_priority(data: &Value, imported: &BTreeMap<String, PostId>) -> Vec<LayerRef> {
    let Some(Value::Array(entries)) = data.get(PRIORITY_OPTION) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let title = entry.get("title").and_then(scalar_string)?;
            if title.is_empty() {
                return None;
            }
            let id = imported.get(&title)?;
            Some(LayerRef::new(*id, title))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{export, layers, settings as settings_cmd, variables, MessageLevel};
    use crate::store::memory::InMemoryStore;
    use serde_json::json;

    fn file() -> Value {
        json!({
            "version": 1,
            "ad_layers": [
                { "post_id": 12, "title": "Home" },
                { "post_id": "14", "title": "Articles" }
            ],
            "ad_layers_custom_variables": ["section"],
            "ad_layers_ad_server_settings": {
                "ad_server": "Ad_Layers_DFP",
                "account_id": "6355419",
                "breakpoints": [{ "title": "all", "min_width": 0, "min_height": 0 }],
                "ad_units": [{ "code": "sidebar", "sizes": [{ "width": 300, "height": 250 }] }]
            },
            "layers": [
                {
                    "post_object": { "ID": 14, "post_title": "Articles", "post_status": "publish", "post_type": "ad-layer" },
                    "meta": { "ad_layer_post_types": ["post"], "ad_layers_secret": "x" }
                },
                {
                    "post_object": { "ID": "12", "post_title": "Home", "post_status": "publish", "post_type": "ad-layer" },
                    "meta": { "ad_layer_page_types": ["home"] }
                },
                { "post_object": { "post_title": "Broken" } }
            ]
        })
    }

    fn errors(result: &CmdResult) -> Vec<&str> {
        result
            .messages
            .iter()
            .filter(|m| m.level == MessageLevel::Error)
            .map(|m| m.content.as_str())
            .collect()
    }

    #[test]
    fn checks_reject_bad_files() {
        let mut store = InMemoryStore::new();
        assert!(matches!(run(&mut store, "not json", true), Err(AdLayersError::Import(_))));
        assert!(import(&mut store, &json!({ "layers": [] }), true).is_err());

        let err = import(&mut store, &json!({ "version": 2, "layers": [1] }), true).unwrap_err();
        assert!(err.to_string().contains("version 2"));

        let err = import(&mut store, &json!({ "version": 1, "ad_layers": "" }), true).unwrap_err();
        assert!(err.to_string().contains("does not seem to have any options"));
    }

    #[test]
    fn imports_options_layers_and_priority() {
        let mut store = InMemoryStore::new();
        let result = import(&mut store, &file(), true).unwrap();

        assert_eq!(errors(&result), vec!["Skipping: Layer does not have proper data."]);
        assert_eq!(
            store.priority().unwrap(),
            vec![
                LayerRef::new(PostId(12), "Home"),
                LayerRef::new(PostId(14), "Articles")
            ]
        );
        assert_eq!(store.custom_variables().unwrap(), vec!["section"]);
        assert_eq!(store.compiled_settings().unwrap().len(), 1);

        let articles = store.get_layer(PostId(14)).unwrap();
        assert_eq!(articles.meta.post_types, vec!["post"]);
        assert!(articles.imported_at.is_some());
    }

    #[test]
    fn existing_layers_are_replaced() {
        let mut store = InMemoryStore::new();
        store
            .save_layer(&AdLayer::new(PostId(3), "Old", PostStatus::Publish))
            .unwrap();
        import(&mut store, &file(), true).unwrap();
        assert!(store.get_layer(PostId(3)).is_err());
        assert_eq!(store.list_layers().unwrap().len(), 2);
    }

    #[test]
    fn existing_options_are_kept_without_override() {
        let mut store = InMemoryStore::new();
        store.set_custom_variables(&["mine".to_string()]).unwrap();
        let result = import(&mut store, &file(), false).unwrap();

        assert!(errors(&result)
            .contains(&"Skipped option `ad_layers_custom_variables` because it currently exists."));
        assert_eq!(store.custom_variables().unwrap(), vec!["mine"]);
        assert_eq!(store.settings().unwrap().account_id, "6355419");
    }

    #[test]
    fn missing_option_is_reported() {
        let mut store = InMemoryStore::new();
        let mut data = file();
        data.as_object_mut().unwrap().remove("ad_layers_custom_variables");
        let result = import(&mut store, &data, true).unwrap();
        assert!(errors(&result)
            .contains(&"Could not find option `ad_layers_custom_variables` in export file."));
    }

    #[test]
    fn failed_inserts_are_skipped() {
        let mut store = InMemoryStore::new();
        store.fail_layer_writes(true);
        let result = import(&mut store, &file(), true).unwrap();
        let errors = errors(&result);
        assert!(errors.contains(&"Skipping: Layer Articles could not be created"));
        assert!(errors.contains(&"Skipping: Layer Home could not be created"));
        assert!(store.priority().unwrap().is_empty());
        assert_eq!(store.custom_variables().unwrap(), vec!["section"]);
    }

    #[test]
    fn export_then_import_gives_back_the_same_options() {
        let mut source = InMemoryStore::new();
        settings_cmd::set(&mut source, file()["ad_layers_ad_server_settings"].clone()).unwrap();
        variables::set(&mut source, vec!["section".into(), "author".into()]).unwrap();
        for title in ["A", "B"] {
            layers::create(
                &mut source,
                title.into(),
                PostStatus::Publish,
                LayerMeta::default(),
                BTreeMap::new(),
            )
            .unwrap();
        }
        let ids: Vec<PostId> = source.priority().unwrap().iter().map(|e| e.post_id).collect();
        layers::reorder(&mut source, &[ids[1], ids[0]]).unwrap();

        let content = serde_json::to_string(&export::payload(&source).unwrap()).unwrap();
        let mut target = InMemoryStore::new();
        run(&mut target, &content, true).unwrap();

        for name in [SETTINGS_OPTION, CUSTOM_VARIABLES_OPTION] {
            assert_eq!(
                target.get_option(name).unwrap(),
                source.get_option(name).unwrap(),
                "{name} differs after import"
            );
        }
        let titles = |store: &InMemoryStore| -> Vec<String> {
            store.priority().unwrap().into_iter().map(|e| e.title).collect()
        };
        assert_eq!(titles(&source), vec!["B", "A"]);
        assert_eq!(titles(&target), titles(&source));
    }
}
