//! # Storage Layer
//!
//! Ad layers keeps two kinds of data, mirroring where a publishing site keeps
//! them:
//!
//! - **Options**: named JSON values (`ad_layers`, `ad_layers_ad_server_settings`,
//!   `ad_layers_custom_variables`, `ad_layers_dfp_settings`).
//! - **Layer posts**: [`AdLayer`] records with their meta.
//!
//! The [`SiteStore`] trait hides the backend:
//!
//! - [`fs::FileStore`]: JSON files in a data directory
//! - [`memory::InMemoryStore`]: in-memory storage for tests
//!
//! ## Storage Format
//!
//! For `FileStore`:
//! ```text
//! <data dir>/
//! ├── options.json   # option name -> value
//! ├── layers.json    # layer posts and the next post id
//! └── config.json    # rendering config (see config.rs)
//! ```
//!
//! Typed accessors for the options are provided on the trait so commands never
//! touch raw JSON. Stored values are read leniently: an option holding `""` or
//! `null` reads as empty.

use crate::error::{AdLayersError, Result};
use crate::lenient;
use crate::model::{
    AdLayer, LayerRef, PostId, CUSTOM_VARIABLES_OPTION, DFP_CACHE_OPTION, PRIORITY_OPTION,
    SETTINGS_OPTION,
};
use crate::settings::{AdServerSettings, CompiledBreakpoint};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod fs;
pub mod memory;

/// Abstract interface for option and layer storage.
pub trait SiteStore {
    /// Read an option. `None` when it was never set.
    fn get_option(&self, name: &str) -> Result<Option<Value>>;

    /// Create or replace an option.
    fn update_option(&mut self, name: &str, value: Value) -> Result<()>;

    fn delete_option(&mut self, name: &str) -> Result<()>;

    /// Save a layer post (create or update)
    fn save_layer(&mut self, layer: &AdLayer) -> Result<()>;

    /// Get a layer post by id
    fn get_layer(&self, id: PostId) -> Result<AdLayer>;

    /// All layer posts, by id
    fn list_layers(&self) -> Result<Vec<AdLayer>>;

    /// Delete a layer post permanently
    fn delete_layer(&mut self, id: PostId) -> Result<()>;

    /// Reserve an id for a new post
    fn allocate_id(&mut self) -> Result<PostId>;

    fn option_exists(&self, name: &str) -> Result<bool> {
        Ok(self.get_option(name)?.is_some())
    }

    fn priority(&self) -> Result<Vec<LayerRef>> {
        read_list(self.get_option(PRIORITY_OPTION)?)
    }

    fn set_priority(&mut self, priority: &[LayerRef]) -> Result<()> {
        self.update_option(PRIORITY_OPTION, serde_json::to_value(priority)?)
    }

    fn settings(&self) -> Result<AdServerSettings> {
        match self.get_option(SETTINGS_OPTION)? {
            Some(Value::Object(map)) => Ok(serde_json::from_value(Value::Object(map))?),
            _ => Ok(AdServerSettings::default()),
        }
    }

    fn set_settings(&mut self, settings: &AdServerSettings) -> Result<()> {
        self.update_option(SETTINGS_OPTION, serde_json::to_value(settings)?)
    }

    fn custom_variables(&self) -> Result<Vec<String>> {
        read_list(self.get_option(CUSTOM_VARIABLES_OPTION)?)
    }

    fn set_custom_variables(&mut self, variables: &[String]) -> Result<()> {
        self.update_option(CUSTOM_VARIABLES_OPTION, serde_json::to_value(variables)?)
    }

    fn compiled_settings(&self) -> Result<Vec<CompiledBreakpoint>> {
        read_list(self.get_option(DFP_CACHE_OPTION)?)
    }

    fn set_compiled_settings(&mut self, compiled: &[CompiledBreakpoint]) -> Result<()> {
        self.update_option(DFP_CACHE_OPTION, serde_json::to_value(compiled)?)
    }
}

fn read_list<T: DeserializeOwned>(value: Option<Value>) -> Result<Vec<T>> {
    match value {
        Some(value) => lenient::list(value).map_err(AdLayersError::Serialization),
        None => Ok(Vec::new()),
    }
}
