//! Placeholder ads for checking layouts without an ad account.

use super::{in_active_layer, AdServer, SettingsField};
use crate::context::{RequestContext, Snapshot};
use crate::error::Result;
use crate::settings::GlobalAdUnit;
use minijinja::{context, Environment};

const UNIT_TEMPLATE: &str = r#"<div id="ad-layers-debug-ad-{{ ad_unit|e }}" class="ad-layers-debug-ad">
	<img src="//placehold.it/{{ width }}x{{ height }}" />
</div>
"#;

pub struct Debug;

impl Debug {
    pub const KEY: &'static str = "Ad_Layers_Debug";
}

/// Placeholder size: explicit width and height, else the default size, else
/// the first complete size.
fn placeholder_size(unit: &GlobalAdUnit) -> Option<[u32; 2]> {
    if unit.width > 0 && unit.height > 0 {
        return Some([unit.width, unit.height]);
    }
    let complete = || unit.sizes.iter().filter(|size| size.is_complete());
    complete()
        .filter(|size| size.is_default())
        .last()
        .or_else(|| complete().next())
        .map(|size| size.dimensions())
}

impl AdServer for Debug {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn display_label(&self) -> &'static str {
        "Debug Mode"
    }

    fn handle(&self) -> &'static str {
        "ad-layers-debug"
    }

    fn settings_fields(&self, _snapshot: &Snapshot) -> Vec<SettingsField> {
        vec![SettingsField::group(
            "ad_units",
            "Ad Units",
            vec![
                SettingsField::text("code", "Code"),
                SettingsField::number("width", "Width"),
                SettingsField::number("height", "Height"),
            ],
        )]
    }

    fn render_unit(&self, ctx: &RequestContext<'_>, ad_unit: &str) -> Result<String> {
        if !in_active_layer(ctx, ad_unit) {
            return Ok(String::new());
        }
        let Some([width, height]) = ctx.settings().ad_unit(ad_unit).and_then(placeholder_size)
        else {
            tracing::debug!(ad_unit, "no placeholder size for unit");
            return Ok(String::new());
        };

        let mut env = Environment::new();
        env.add_template("debug_unit", UNIT_TEMPLATE)?;
        let output = env.get_template("debug_unit")?.render(context! {
            ad_unit => ad_unit,
            width => width,
            height => height,
        })?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdLayersConfig;
    use crate::model::{AdLayer, LayerAdUnit, LayerRef, PostId, PostStatus};
    use crate::request::Request;
    use crate::resolver::LayerSet;
    use crate::settings::{AdServerSettings, Size};

    fn snapshot() -> Snapshot {
        let mut explicit = GlobalAdUnit::new("box");
        explicit.width = 300;
        explicit.height = 250;
        let settings = AdServerSettings {
            ad_server: Some(Debug::KEY.into()),
            ad_units: vec![
                explicit,
                GlobalAdUnit::new("banner")
                    .with_size(Size::new(320, 50))
                    .with_size(Size::new(728, 90).default_size()),
                GlobalAdUnit::new("empty"),
            ],
            ..Default::default()
        };
        let mut layer = AdLayer::new(PostId(1), "All", PostStatus::Publish);
        layer.meta.ad_units = ["box", "banner", "empty"].map(LayerAdUnit::new).to_vec();
        Snapshot {
            config: AdLayersConfig::default(),
            settings,
            layers: LayerSet::new(vec![LayerRef::new(PostId(1), "All")], vec![layer]),
            ..Default::default()
        }
    }

    #[test]
    fn renders_placeholder_image() {
        let snapshot = snapshot();
        let ctx = RequestContext::new(&snapshot, Request::Home);
        assert_eq!(
            Debug.render_unit(&ctx, "box").unwrap(),
            "<div id=\"ad-layers-debug-ad-box\" class=\"ad-layers-debug-ad\">\n\t<img src=\"//placehold.it/300x250\" />\n</div>"
        );
        assert!(Debug
            .render_unit(&ctx, "banner")
            .unwrap()
            .contains("placehold.it/728x90"));
    }

    #[test]
    fn last_default_size_wins() {
        let unit = GlobalAdUnit::new("rail")
            .with_size(Size::new(300, 250).default_size())
            .with_size(Size::new(160, 600))
            .with_size(Size::new(300, 600).default_size());
        assert_eq!(placeholder_size(&unit), Some([300, 600]));
    }

    #[test]
    fn unknown_or_unsized_units_render_nothing() {
        let snapshot = snapshot();
        let ctx = RequestContext::new(&snapshot, Request::Home);
        assert_eq!(Debug.render_unit(&ctx, "empty").unwrap(), "");
        assert_eq!(Debug.render_unit(&ctx, "missing").unwrap(), "");
    }

    #[test]
    fn no_header() {
        let snapshot = snapshot();
        let ctx = RequestContext::new(&snapshot, Request::Home);
        assert_eq!(Debug.render_header(&ctx).unwrap(), "");
    }
}
