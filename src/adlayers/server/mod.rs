//! # Ad Servers
//!
//! An [`AdServer`] turns the active layer into page markup: a header block
//! that defines slots and targeting, and one element per rendered unit. The
//! configured server is chosen by key (`ad_server` in the settings) from an
//! [`AdServerRegistry`]; unknown keys select nothing and render nothing.
//!
//! - [`dfp::Dfp`]: DoubleClick for Publishers / Google Publisher Tag
//! - [`debug::Debug`]: placeholder images, for layout work

use crate::context::{RequestContext, Snapshot};
use crate::error::Result;
use crate::request::Site;
use crate::settings::AdServerSettings;
use crate::targeting;
use crate::template::FormattingTags;
use serde::Serialize;

pub mod debug;
pub mod dfp;

/// The js class used when no server is configured.
pub const DEFAULT_JS_API_CLASS: &str = "AdLayersAPI";

pub trait AdServer {
    /// Registry key, stored in the settings.
    fn key(&self) -> &'static str;

    fn display_label(&self) -> &'static str;

    /// Name of the browser-side API class for this server.
    fn js_api_class(&self) -> &'static str {
        DEFAULT_JS_API_CLASS
    }

    /// Script handle of the browser library.
    fn handle(&self) -> &'static str;

    /// Tags available in path templates and targeting values.
    fn formatting_tags(&self, site: &Site) -> FormattingTags {
        FormattingTags::for_site(site)
    }

    /// Fields of the settings screen.
    fn settings_fields(&self, snapshot: &Snapshot) -> Vec<SettingsField>;

    /// Unit codes that can be placed, sorted.
    fn ad_units(&self, settings: &AdServerSettings) -> Vec<String> {
        settings.ad_unit_codes()
    }

    fn render_header(&self, _ctx: &RequestContext<'_>) -> Result<String> {
        Ok(String::new())
    }

    fn render_footer(&self, _ctx: &RequestContext<'_>) -> Result<String> {
        Ok(String::new())
    }

    /// Markup for one unit. Empty when the unit is not part of the active layer.
    fn render_unit(&self, ctx: &RequestContext<'_>, ad_unit: &str) -> Result<String>;
}

/// Whether `ad_unit` is assigned to the request's active layer.
pub fn in_active_layer(ctx: &RequestContext<'_>, ad_unit: &str) -> bool {
    !ad_unit.is_empty()
        && ctx
            .active_ad_layer()
            .is_some_and(|layer| layer.ad_unit(ad_unit).is_some())
}

/// Known servers, selectable by key.
pub struct AdServerRegistry {
    servers: Vec<Box<dyn AdServer>>,
}

impl Default for AdServerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(dfp::Dfp));
        registry.register(Box::new(debug::Debug));
        registry
    }
}

impl AdServerRegistry {
    pub fn empty() -> Self {
        Self {
            servers: Vec::new(),
        }
    }

    /// Add a server. A server with the same key is replaced.
    pub fn register(&mut self, server: Box<dyn AdServer>) {
        match self.servers.iter_mut().find(|s| s.key() == server.key()) {
            Some(existing) => *existing = server,
            None => self.servers.push(server),
        }
    }

    pub fn get(&self, key: &str) -> Option<&dyn AdServer> {
        self.servers
            .iter()
            .find(|s| s.key() == key)
            .map(|s| s.as_ref())
    }

    /// The server selected in the settings.
    pub fn active(&self, settings: &AdServerSettings) -> Option<&dyn AdServer> {
        let key = settings.ad_server.as_deref()?;
        let server = self.get(key);
        if server.is_none() {
            tracing::warn!(ad_server = key, "configured ad server is not registered");
        }
        server
    }

    /// `(key, label)` pairs for a server picker.
    pub fn options(&self) -> Vec<(String, String)> {
        self.servers
            .iter()
            .map(|s| (s.key().to_string(), s.display_label().to_string()))
            .collect()
    }
}

/// The `adLayersAdServer` global read by the browser API.
pub fn ad_server_script(server: Option<&dyn AdServer>) -> String {
    let class = server.map_or(DEFAULT_JS_API_CLASS, |s| s.js_api_class());
    format!(
        "<script type=\"text/javascript\">\nvar adLayersAdServer = {{\"jsAPIClass\":{}}};\n</script>",
        targeting::json_string(class)
    )
}

/// A settings screen field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsField {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    /// Stored as a number even when entered as text.
    Number,
    Select { options: Vec<(String, String)> },
    /// Stores `checked_value` when ticked.
    Checkbox { checked_value: String },
    Checkboxes { options: Vec<String> },
    /// A repeatable group of child fields.
    Group { children: Vec<SettingsField> },
}

impl SettingsField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            description: None,
        }
    }

    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn number(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Number)
    }

    pub fn group(
        name: impl Into<String>,
        label: impl Into<String>,
        children: Vec<SettingsField>,
    ) -> Self {
        Self::new(name, label, FieldKind::Group { children })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The custom targeting group shared by layers and servers.
pub fn custom_targeting_field(name: &str, snapshot: &Snapshot) -> SettingsField {
    let variables = snapshot
        .custom_variables
        .iter()
        .map(|v| (v.clone(), v.clone()))
        .collect();
    SettingsField::group(
        name,
        "Custom Targeting",
        vec![
            SettingsField::new(
                "custom_variable",
                "Custom Variable",
                FieldKind::Select { options: variables },
            ),
            SettingsField::new(
                "source",
                "Source",
                FieldKind::Select {
                    options: targeting::sources(&snapshot.config.site),
                },
            ),
            SettingsField::text("values", "Values")
                .with_description("Used when the source is Other"),
        ],
    )
}
