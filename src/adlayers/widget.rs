//! Sidebar widget that places one ad unit.

use crate::context::RequestContext;
use crate::error::Result;
use crate::lenient;
use crate::server::AdServer;
use crate::settings::AdServerSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const WIDGET_ID: &str = "ad_layers_ad_widget";
pub const WIDGET_LABEL: &str = "Ad Layers Ad Widget";
pub const NO_SLOTS_MESSAGE: &str = "No ad slots are currently available.";

/// A saved widget instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdUnitWidget {
    #[serde(default, deserialize_with = "lenient::string")]
    pub ad_slot: String,
}

impl AdUnitWidget {
    pub fn new(ad_slot: impl Into<String>) -> Self {
        Self {
            ad_slot: ad_slot.into(),
        }
    }

    /// Validate submitted form values. `None` rejects the update.
    pub fn update(new_instance: Value) -> Option<Self> {
        serde_json::from_value::<Self>(new_instance)
            .ok()
            .filter(|widget| !widget.ad_slot.is_empty())
    }

    /// The unit wrapped in the sidebar's markup, or nothing.
    pub fn render(
        &self,
        server: Option<&dyn AdServer>,
        ctx: &RequestContext<'_>,
        before_widget: &str,
        after_widget: &str,
    ) -> Result<String> {
        let Some(server) = server else {
            return Ok(String::new());
        };
        if self.ad_slot.is_empty() {
            return Ok(String::new());
        }
        let markup = server.render_unit(ctx, &self.ad_slot)?;
        if markup.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{}{}{}", before_widget, markup, after_widget))
    }

    /// Slots the form can offer. Empty means [`NO_SLOTS_MESSAGE`] is shown.
    pub fn slot_options(server: Option<&dyn AdServer>, settings: &AdServerSettings) -> Vec<String> {
        server.map(|s| s.ad_units(settings)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdLayersConfig;
    use crate::context::Snapshot;
    use crate::model::{AdLayer, LayerAdUnit, LayerRef, PostId, PostStatus};
    use crate::request::Request;
    use crate::resolver::LayerSet;
    use crate::server::dfp::Dfp;
    use crate::settings::GlobalAdUnit;
    use serde_json::json;

    #[test]
    fn update_rejects_empty_slot() {
        assert_eq!(AdUnitWidget::update(json!({ "ad_slot": "" })), None);
        assert_eq!(AdUnitWidget::update(json!({})), None);
        assert_eq!(
            AdUnitWidget::update(json!({ "ad_slot": "sidebar" })),
            Some(AdUnitWidget::new("sidebar"))
        );
        assert_eq!(
            AdUnitWidget::update(json!({ "ad_slot": 300 })),
            Some(AdUnitWidget::new("300"))
        );
    }

    #[test]
    fn render_wraps_markup() {
        let mut layer = AdLayer::new(PostId(1), "All", PostStatus::Publish);
        layer.meta.ad_units = vec![LayerAdUnit::new("sidebar")];
        let snapshot = Snapshot {
            config: AdLayersConfig::default(),
            layers: LayerSet::new(vec![LayerRef::new(PostId(1), "All")], vec![layer]),
            ..Default::default()
        };
        let ctx = RequestContext::new(&snapshot, Request::Home);

        let out = AdUnitWidget::new("sidebar")
            .render(Some(&Dfp), &ctx, "<aside>", "</aside>")
            .unwrap();
        assert!(out.starts_with("<aside><div id=\"div-gpt-ad-sidebar\""));
        assert!(out.ends_with("</div></aside>"));

        let empty = AdUnitWidget::new("footer")
            .render(Some(&Dfp), &ctx, "<aside>", "</aside>")
            .unwrap();
        assert_eq!(empty, "");
    }

    #[test]
    fn slot_options_come_from_the_server() {
        let settings = AdServerSettings {
            ad_units: vec![GlobalAdUnit::new("b"), GlobalAdUnit::new("a")],
            ..Default::default()
        };
        assert_eq!(AdUnitWidget::slot_options(Some(&Dfp), &settings), vec!["a", "b"]);
        assert!(AdUnitWidget::slot_options(None, &settings).is_empty());
    }
}
