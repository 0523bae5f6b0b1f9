//! Ad unit path selection.
//!
//! A unit's path template is, in order of precedence: the layer's path
//! override for the unit, the unit's global path override, the template for
//! the current page type, the template for `all`, and finally
//! `/{account_id}/{domain}`.

use crate::model::AdLayer;
use crate::page_types::ALL_PAGE_TYPES;
use crate::settings::AdServerSettings;
use crate::template::{FormattingTags, TagContext, Template};

/// The path override in effect for `ad_unit`, if any.
pub fn unit_path_override<'a>(
    settings: &'a AdServerSettings,
    layer: Option<&'a AdLayer>,
    ad_unit: &str,
) -> Option<&'a str> {
    if ad_unit.is_empty() {
        return None;
    }
    let layer_override = layer
        .and_then(|layer| layer.ad_unit(ad_unit))
        .and_then(|unit| unit.path_override.as_deref());
    let global_override = settings
        .ad_unit(ad_unit)
        .and_then(|unit| unit.path_override.as_deref());
    layer_override
        .or(global_override)
        .filter(|path| !path.trim().is_empty())
}

/// The unrendered template for a unit on a page type.
pub fn select_template(
    settings: &AdServerSettings,
    layer: Option<&AdLayer>,
    page_type: &str,
    ad_unit: &str,
    domain: &str,
) -> String {
    if let Some(path) = unit_path_override(settings, layer, ad_unit) {
        return path.to_string();
    }
    settings
        .path_template(page_type)
        .or_else(|| settings.path_template(ALL_PAGE_TYPES))
        .map(str::to_string)
        .unwrap_or_else(|| format!("/{}/{}", settings.account_id, domain))
}

/// Render the final path. The result never ends with a slash.
pub fn resolve_path(
    settings: &AdServerSettings,
    layer: Option<&AdLayer>,
    tags: &FormattingTags,
    ctx: &TagContext<'_>,
) -> String {
    let source = select_template(settings, layer, ctx.page_type, ctx.ad_unit, ctx.domain);
    let path = tags.render(&Template::parse(&source), ctx);
    path.trim_end_matches('/').to_string()
}
