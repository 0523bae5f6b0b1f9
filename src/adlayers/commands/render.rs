//! Front-end output for one request.

use crate::commands::{CmdMessage, CmdResult};
use crate::context::{RequestContext, Snapshot};
use crate::error::{AdLayersError, Result};
use crate::model::LayerRef;
use crate::page_types;
use crate::request::{Request, Site};
use crate::server::{self, AdServer, AdServerRegistry};
use crate::shortcode;
use crate::template::FormattingTags;
use crate::widget::{AdUnitWidget, NO_SLOTS_MESSAGE};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct Resolution<'a> {
    layer: Option<&'a LayerRef>,
    page_type: &'a str,
}

fn context<'a>(
    server: Option<&dyn AdServer>,
    snapshot: &'a Snapshot,
    request: Request,
) -> RequestContext<'a> {
    let mut ctx = RequestContext::new(snapshot, request);
    if let Some(server) = server {
        *ctx.tags_mut() = server.formatting_tags(&snapshot.config.site);
    }
    ctx
}

fn no_server(result: &mut CmdResult) {
    result.add_message(CmdMessage::warning(
        "No ad server is configured; nothing is rendered",
    ));
}

/// The active layer and page type of a request, as JSON.
pub fn resolve(snapshot: &Snapshot, request: Request) -> Result<CmdResult> {
    let ctx = RequestContext::new(snapshot, request);
    let resolution = Resolution {
        layer: ctx.active_layer(),
        page_type: ctx.page_type(),
    };
    let output = serde_json::to_string_pretty(&resolution)?;

    let mut result = CmdResult::default();
    if resolution.layer.is_none() {
        result.add_message(CmdMessage::info("No ad layer matches this request"));
    }
    Ok(result.with_output(output))
}

/// Everything the page head needs: the server global and the header block.
pub fn head(
    registry: &AdServerRegistry,
    snapshot: &Snapshot,
    request: Request,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    let Some(server) = registry.active(&snapshot.settings) else {
        no_server(&mut result);
        return Ok(result.with_output(""));
    };
    let ctx = context(Some(server), snapshot, request);
    let header = server.render_header(&ctx)?;
    let footer = server.render_footer(&ctx)?;

    let output = [server::ad_server_script(Some(server)), header, footer]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(result.with_output(output))
}

/// Markup for one unit.
pub fn unit(
    registry: &AdServerRegistry,
    snapshot: &Snapshot,
    request: Request,
    ad_unit: &str,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    let Some(server) = registry.active(&snapshot.settings) else {
        no_server(&mut result);
        return Ok(result.with_output(""));
    };
    let ctx = context(Some(server), snapshot, request);
    let output = server.render_unit(&ctx, ad_unit)?;
    if output.is_empty() {
        result.add_message(CmdMessage::info(format!(
            "Ad unit `{}` is not part of the active layer",
            ad_unit
        )));
    }
    Ok(result.with_output(output))
}

/// Post content with its ad unit shortcodes replaced.
pub fn content(
    registry: &AdServerRegistry,
    snapshot: &Snapshot,
    request: Request,
    content: &str,
) -> Result<CmdResult> {
    let server = registry.active(&snapshot.settings);
    let ctx = context(server, snapshot, request);
    let output = shortcode::render_content(server, &ctx, content)?;
    Ok(CmdResult::default().with_output(output))
}

/// A widget instance wrapped in the sidebar markup.
pub fn widget(
    registry: &AdServerRegistry,
    snapshot: &Snapshot,
    request: Request,
    instance: Value,
    before_widget: &str,
    after_widget: &str,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    let Some(widget) = AdUnitWidget::update(instance) else {
        return Err(AdLayersError::Api(
            "A widget needs a non-empty `ad_slot`".to_string(),
        ));
    };
    let server = registry.active(&snapshot.settings);
    if server.is_none() {
        no_server(&mut result);
    }
    let ctx = context(server, snapshot, request);
    let output = widget.render(server, &ctx, before_widget, after_widget)?;
    Ok(result.with_output(output))
}

/// Ad slots a widget can be set to, one per line.
pub fn widget_slots(registry: &AdServerRegistry, snapshot: &Snapshot) -> Result<CmdResult> {
    let slots = AdUnitWidget::slot_options(registry.active(&snapshot.settings), &snapshot.settings);
    let mut result = CmdResult::default();
    if slots.is_empty() {
        result.add_message(CmdMessage::info(NO_SLOTS_MESSAGE));
    }
    Ok(result.with_output(slots.join("\n")))
}

/// The page type catalog of a site, as JSON.
pub fn page_types(site: &Site) -> Result<CmdResult> {
    let output = serde_json::to_string_pretty(&page_types::page_types(site))?;
    Ok(CmdResult::default().with_output(output))
}

/// Formatting tags and what they stand for, one per line.
pub fn formatting_tags(registry: &AdServerRegistry, snapshot: &Snapshot) -> Result<CmdResult> {
    let tags = match registry.active(&snapshot.settings) {
        Some(server) => server.formatting_tags(&snapshot.config.site),
        None => FormattingTags::for_site(&snapshot.config.site),
    };
    let output = tags
        .describe()
        .into_iter()
        .map(|(tag, description)| format!("{}\t{}", tag, description))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(CmdResult::default().with_output(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdLayersConfig;
    use crate::model::{AdLayer, LayerAdUnit, PostId, PostStatus};
    use crate::request::Post;
    use crate::resolver::LayerSet;
    use crate::settings::{self, AdServerSettings, Breakpoint, GlobalAdUnit, Size};

    fn snapshot(ad_server: Option<&str>) -> Snapshot {
        let settings = AdServerSettings {
            ad_server: ad_server.map(str::to_string),
            account_id: "6355419".into(),
            breakpoints: vec![Breakpoint::new("all", 0, 0)],
            ad_units: vec![GlobalAdUnit::new("sidebar").with_size(Size::new(300, 250))],
            ..Default::default()
        };
        let mut home = AdLayer::new(PostId(1), "Home", PostStatus::Publish);
        home.meta.page_types = vec!["home".into()];
        home.meta.ad_units = vec![LayerAdUnit::new("sidebar")];
        Snapshot {
            config: AdLayersConfig::default(),
            compiled: settings::compile(&settings).unwrap_or_default(),
            settings,
            layers: LayerSet::new(vec![home.as_ref()], vec![home]),
            custom_variables: Vec::new(),
        }
    }

    #[test]
    fn resolve_reports_layer_and_page_type() {
        let snapshot = snapshot(None);
        let out = resolve(&snapshot, Request::Home).unwrap().output.unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["layer"]["post_id"], 1);
        assert_eq!(json["page_type"], "home");

        let result = resolve(&snapshot, Request::Singular(Post::new(5, "post"))).unwrap();
        assert!(result.output.unwrap().contains("\"layer\": null"));
        assert_eq!(result.messages.len(), 1);
    }

    #[test]
    fn head_includes_server_global_and_header() {
        let snapshot = snapshot(Some("Ad_Layers_DFP"));
        let out = head(&AdServerRegistry::default(), &snapshot, Request::Home)
            .unwrap()
            .output
            .unwrap();
        assert!(out.starts_with("<script type=\"text/javascript\">\nvar adLayersAdServer"));
        assert!(out.contains("dfpAdUnits[\"sidebar\"]"));
    }

    #[test]
    fn nothing_without_a_server() {
        let snapshot = snapshot(None);
        let result = head(&AdServerRegistry::default(), &snapshot, Request::Home).unwrap();
        assert_eq!(result.output.as_deref(), Some(""));
        assert_eq!(result.messages.len(), 1);
    }

    #[test]
    fn content_shortcodes() {
        let snapshot = snapshot(Some("Ad_Layers_DFP"));
        let out = content(
            &AdServerRegistry::default(),
            &snapshot,
            Request::Home,
            "<p>x</p>[ad-unit unit=\"sidebar\"]",
        )
        .unwrap()
        .output
        .unwrap();
        assert!(out.starts_with("<p>x</p><div id=\"div-gpt-ad-sidebar\""));
    }

    #[test]
    fn unit_outside_layer_is_empty() {
        let snapshot = snapshot(Some("Ad_Layers_DFP"));
        let result = unit(
            &AdServerRegistry::default(),
            &snapshot,
            Request::Home,
            "leaderboard",
        )
        .unwrap();
        assert_eq!(result.output.as_deref(), Some(""));
    }

    #[test]
    fn tag_listing() {
        let out = formatting_tags(&AdServerRegistry::default(), &snapshot(None))
            .unwrap()
            .output
            .unwrap();
        assert!(out.starts_with("#account_id#\t"));
        assert!(out.contains("#category#\t"));
    }

    #[test]
    fn widget_wraps_unit_markup() {
        let snapshot = snapshot(Some("Ad_Layers_DFP"));
        let registry = AdServerRegistry::default();
        let out = widget(
            &registry,
            &snapshot,
            Request::Home,
            serde_json::json!({ "ad_slot": "sidebar" }),
            "<li>",
            "</li>",
        )
        .unwrap()
        .output
        .unwrap();
        assert!(out.starts_with("<li><div id=\"div-gpt-ad-sidebar\""));
        assert!(out.ends_with("</li>"));

        let empty = serde_json::json!({ "ad_slot": "" });
        assert!(widget(&registry, &snapshot, Request::Home, empty, "", "").is_err());
    }

    #[test]
    fn widget_slots_come_from_the_server() {
        let registry = AdServerRegistry::default();
        let out = widget_slots(&registry, &snapshot(Some("Ad_Layers_DFP")))
            .unwrap()
            .output
            .unwrap();
        assert_eq!(out, "sidebar");

        let none = widget_slots(&registry, &snapshot(None)).unwrap();
        assert_eq!(none.messages[0].content, NO_SLOTS_MESSAGE);
    }
}
