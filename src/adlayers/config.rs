use crate::error::{AdLayersError, Result};
use crate::request::Site;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_AD_UNIT_PREFIX: &str = "div-gpt-ad-";

/// Rendering knobs and the site description, stored in `<data dir>/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdLayersConfig {
    /// Prefix of the element id an ad unit renders into
    #[serde(default = "default_ad_unit_prefix")]
    pub ad_unit_prefix: String,

    /// Emit the script that loads the GPT library
    #[serde(default = "default_true")]
    pub output_gpt_library: bool,

    #[serde(default = "default_true")]
    pub enable_async_rendering: bool,

    #[serde(default = "default_true")]
    pub single_request_mode: bool,

    #[serde(default = "default_true")]
    pub collapse_empty_divs: bool,

    #[serde(default)]
    pub site: Site,
}

fn default_ad_unit_prefix() -> String {
    DEFAULT_AD_UNIT_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AdLayersConfig {
    fn default() -> Self {
        Self {
            ad_unit_prefix: default_ad_unit_prefix(),
            output_gpt_library: true,
            enable_async_rendering: true,
            single_request_mode: true,
            collapse_empty_divs: true,
            site: Site::default(),
        }
    }
}

impl AdLayersConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(AdLayersError::Io)?;
        let config: AdLayersConfig =
            serde_json::from_str(&content).map_err(AdLayersError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(AdLayersError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(AdLayersError::Serialization)?;
        fs::write(config_path, content).map_err(AdLayersError::Io)?;
        Ok(())
    }

    /// The element id for an ad unit.
    pub fn ad_unit_id(&self, ad_unit: &str) -> String {
        format!("{}{}", self.ad_unit_prefix, ad_unit)
    }
}
