//! DoubleClick for Publishers (Google Publisher Tag).
//!
//! The header defines one slot per unit of the active layer. Each unit gets a
//! size mapping built from the compiled breakpoints, a default size, and its
//! targeting. Units render as a `<div>` that asks GPT to display the slot.
//!
//! Mappings, slots and ad details are keyed by the unit code exactly as it is
//! configured.

use super::{custom_targeting_field, in_active_layer, AdServer, FieldKind, SettingsField};
use crate::context::{RequestContext, Snapshot};
use crate::error::Result;
use crate::model::{AdLayer, LayerAdUnit, TargetingRule};
use crate::page_types::{self, ALL_PAGE_TYPES};
use crate::settings::CompiledBreakpoint;
use crate::targeting::{self, json_string};
use minijinja::{context, Environment};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};

const HEADER_TEMPLATE: &str = "dfp_header";
const UNIT_TEMPLATE: &str = "dfp_unit";

const TEMPLATES: [(&str, &str); 2] = [
    (
        HEADER_TEMPLATE,
        r#"{% if gpt_library %}
<script type='text/javascript'>
var dfpAdUnits = {};
var googletag = googletag || {};
googletag.cmd = googletag.cmd || [];
(function() {
	var gads = document.createElement('script');
	gads.async = true;
	gads.type = 'text/javascript';
	var useSSL = 'https:' === document.location.protocol;
	gads.src = (useSSL ? 'https:' : 'http:') + '//www.googletagservices.com/tag/js/gpt.js';
	var node = document.getElementsByTagName('script')[0];
	node.parentNode.insertBefore(gads, node);
})();
</script>
{% endif %}
<script type="text/javascript">
var dfpBuiltMappings = {}, dfpAdUnits = {};
googletag.cmd.push(function() {
{% for line in lines %}
	{{ line }}
{% endfor %}
	if ( typeof AdLayersAPI === 'undefined' || ! AdLayersAPI.isDebug() ) {
		googletag.enableServices();
	}
});
var dfpSizeMapping = {{ size_mapping }};
var dfpAdLayer = {{ ad_layer }};
var dfpAdDetails = {{ ad_details }};
</script>
"#,
    ),
    (
        UNIT_TEMPLATE,
        r#"<div id="{{ id|e }}" class="dfp-ad dfp-{{ class }}" data-ad-unit="{{ ad_unit|e }}">
	<script type="text/javascript">
		if ( "undefined" !== typeof googletag ) {
			googletag.cmd.push( function() { googletag.display({{ id_js }}); } );
		}
	</script>
</div>
"#,
    ),
];

/// The DFP server.
pub struct Dfp;

impl Dfp {
    pub const KEY: &'static str = "Ad_Layers_DFP";

    fn environment() -> Result<Environment<'static>> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        for (name, source) in TEMPLATES {
            env.add_template_owned(name.to_string(), source.to_string())?;
        }
        Ok(env)
    }
}

/// Default slot size: the size marked default, or every size of the first
/// breakpoint the unit appears in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
enum DefaultSize {
    One([u32; 2]),
    All(Vec<[u32; 2]>),
}

impl DefaultSize {
    fn is_empty(&self) -> bool {
        matches!(self, DefaultSize::All(sizes) if sizes.is_empty())
    }
}

type Mapping = ([u32; 2], Vec<[u32; 2]>);

/// Slot data for the units of one layer.
#[derive(Debug, Default)]
struct SlotPlan<'a> {
    mappings: Vec<(String, Vec<Mapping>)>,
    defaults: BTreeMap<String, DefaultSize>,
    out_of_page: BTreeSet<String>,
    targeting: BTreeMap<String, &'a [TargetingRule]>,
}

impl<'a> SlotPlan<'a> {
    fn build(compiled: &'a [CompiledBreakpoint], layer: &'a AdLayer) -> Self {
        let mut plan = Self::default();
        for breakpoint in compiled {
            for unit in &breakpoint.ad_units {
                if unit.code.is_empty() || unit.sizes.is_empty() {
                    continue;
                }
                let Some(layer_unit) = layer.ad_unit(&unit.code) else {
                    continue;
                };
                let code = unit.code.clone();

                let mut sizes = Vec::new();
                for size in unit.sizes.iter().filter(|s| s.is_complete()) {
                    sizes.push(size.dimensions());
                    if size.is_default() {
                        plan.defaults
                            .insert(code.clone(), DefaultSize::One(size.dimensions()));
                    }
                    if size.is_out_of_page() {
                        plan.out_of_page.insert(code.clone());
                    }
                }

                if plan.defaults.get(&code).map_or(true, DefaultSize::is_empty) {
                    plan.defaults
                        .insert(code.clone(), DefaultSize::All(sizes.clone()));
                }

                if sanitize_key(&code).is_empty() {
                    continue;
                }

                let viewport = [breakpoint.min_width, breakpoint.min_height];
                match plan.mappings.iter_mut().find(|(key, _)| *key == code) {
                    Some((_, mappings)) => mappings.push((viewport, sizes)),
                    None => plan.mappings.push((code.clone(), vec![(viewport, sizes)])),
                }

                let rules: &[TargetingRule] = if !layer_unit.custom_targeting.is_empty() {
                    &layer_unit.custom_targeting
                } else {
                    &unit.custom_targeting
                };
                if !rules.is_empty() {
                    plan.targeting.insert(code, rules);
                }
            }
        }
        plan
    }

    fn default_size(&self, code: &str) -> Option<&DefaultSize> {
        self.defaults.get(code).filter(|size| !size.is_empty())
    }

    fn has_mapping(&self, code: &str) -> bool {
        self.mappings
            .iter()
            .any(|(key, mappings)| key == code && !mappings.is_empty())
    }

    fn size_mapping_json(&self) -> Value {
        let map: Map<String, Value> = self
            .mappings
            .iter()
            .map(|(code, mappings)| (code.clone(), json!(mappings)))
            .collect();
        Value::Object(map)
    }
}

/// Lowercase alphanumerics, dashes and underscores only.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Characters allowed in an HTML class name.
fn html_class(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

fn to_json(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Layer units in meta order, first occurrence of each code.
fn layer_units(layer: &AdLayer) -> Vec<&LayerAdUnit> {
    let mut seen = BTreeSet::new();
    layer
        .meta
        .ad_units
        .iter()
        .filter(|unit| !unit.ad_unit.is_empty() && seen.insert(unit.ad_unit.as_str()))
        .collect()
}

impl AdServer for Dfp {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn display_label(&self) -> &'static str {
        "DoubleClick for Publishers (DFP)"
    }

    fn js_api_class(&self) -> &'static str {
        "AdLayersDFPAPI"
    }

    fn handle(&self) -> &'static str {
        "ad-layers-dfp"
    }

    fn settings_fields(&self, snapshot: &Snapshot) -> Vec<SettingsField> {
        let mut page_type_options = vec![(ALL_PAGE_TYPES.to_string(), "All Pages".to_string())];
        page_type_options.extend(
            page_types::page_types(&snapshot.config.site)
                .into_iter()
                .map(|page_type| (page_type.key, page_type.label)),
        );

        let mut size_fields = vec![
            SettingsField::number("width", "Width"),
            SettingsField::number("height", "Height"),
            SettingsField::new(
                "out_of_page",
                "Out of Page",
                FieldKind::Checkbox {
                    checked_value: "oop".into(),
                },
            ),
            SettingsField::new(
                "default_size",
                "Default Size",
                FieldKind::Checkbox {
                    checked_value: "default".into(),
                },
            ),
        ];
        if !snapshot.settings.breakpoints.is_empty() {
            size_fields.push(SettingsField::new(
                "breakpoints",
                "Breakpoints",
                FieldKind::Checkboxes {
                    options: snapshot
                        .settings
                        .breakpoints
                        .iter()
                        .map(|b| b.title.clone())
                        .filter(|title| !title.is_empty())
                        .collect(),
                },
            ));
        }

        vec![
            SettingsField::text("account_id", "DFP Account ID"),
            SettingsField::group(
                "path_templates",
                "Path Templates",
                vec![
                    SettingsField::text("path_template", "Path Template"),
                    SettingsField::new(
                        "page_type",
                        "Page Type",
                        FieldKind::Select {
                            options: page_type_options,
                        },
                    ),
                ],
            )
            .with_description("Formatting tags are replaced when the path is rendered"),
            SettingsField::group(
                "breakpoints",
                "Breakpoints",
                vec![
                    SettingsField::text("title", "Title"),
                    SettingsField::number("min_width", "Minimum Width"),
                    SettingsField::number("min_height", "Minimum Height"),
                ],
            ),
            SettingsField::group(
                "ad_units",
                "Ad Units",
                vec![
                    SettingsField::text("code", "Code"),
                    SettingsField::text("path_override", "Custom Path Template"),
                    SettingsField::group("sizes", "Sizes", size_fields),
                    custom_targeting_field("custom_targeting", snapshot),
                ],
            ),
        ]
    }

    fn render_header(&self, ctx: &RequestContext<'_>) -> Result<String> {
        let Some(active) = ctx.active_layer() else {
            return Ok(String::new());
        };
        let config = ctx.config();

        let mut lines = Vec::new();
        let mut details = Map::new();
        let mut size_mapping = Value::Object(Map::new());

        if let Some(layer) = ctx.active_ad_layer() {
            let plan = SlotPlan::build(&ctx.snapshot().compiled, layer);
            size_mapping = plan.size_mapping_json();

            for (code, mappings) in &plan.mappings {
                let sizes: String = mappings
                    .iter()
                    .map(|(viewport, sizes)| {
                        Ok(format!(".addSize({},{})", to_json(viewport)?, to_json(sizes)?))
                    })
                    .collect::<Result<_>>()?;
                lines.push(format!(
                    "dfpBuiltMappings[{}] = googletag.sizeMapping(){}.build();",
                    json_string(code),
                    sizes
                ));
            }

            for unit in layer_units(layer) {
                let code = unit.ad_unit.as_str();
                let Some(default) = plan.default_size(code) else {
                    tracing::debug!(ad_unit = code, "no sizes for unit, slot not defined");
                    continue;
                };
                let path = ctx.path(code);
                let pairs = plan
                    .targeting
                    .get(code)
                    .map(|rules| ctx.targeting(rules, code))
                    .unwrap_or_default();

                details.insert(
                    code.to_string(),
                    json!({
                        "path": path,
                        "sizes": default,
                        "targeting": targeting::to_json(&pairs),
                    }),
                );

                if unit.do_not_render {
                    continue;
                }

                let id = json_string(&config.ad_unit_id(code));
                let slot = if plan.out_of_page.contains(code) {
                    format!("defineOutOfPageSlot({},{})", json_string(&path), id)
                } else {
                    let mapping = if plan.has_mapping(code) {
                        format!(".defineSizeMapping(dfpBuiltMappings[{}])", json_string(code))
                    } else {
                        String::new()
                    };
                    format!(
                        "defineSlot({},{},{}){}",
                        json_string(&path),
                        to_json(default)?,
                        id,
                        mapping
                    )
                };
                lines.push(format!(
                    "dfpAdUnits[{}] = googletag.{}{}.addService(googletag.pubads());",
                    json_string(code),
                    slot,
                    targeting::to_js(&pairs)
                ));
            }

            let page_targeting = ctx.targeting(&layer.meta.custom_targeting, "");
            if !page_targeting.is_empty() {
                lines.push(format!(
                    "googletag.pubads(){};",
                    targeting::to_js(&page_targeting)
                ));
            }
        }

        if config.enable_async_rendering {
            lines.push("googletag.pubads().enableAsyncRendering();".to_string());
        }
        if config.single_request_mode {
            lines.push("googletag.pubads().enableSingleRequest();".to_string());
        }
        if config.collapse_empty_divs {
            lines.push("googletag.pubads().collapseEmptyDivs();".to_string());
        }

        let env = Self::environment()?;
        let output = env.get_template(HEADER_TEMPLATE)?.render(context! {
            gpt_library => config.output_gpt_library,
            lines => lines,
            size_mapping => to_json(&size_mapping)?,
            ad_layer => to_json(active)?,
            ad_details => to_json(&Value::Object(details))?,
        })?;
        Ok(output)
    }

    fn render_unit(&self, ctx: &RequestContext<'_>, ad_unit: &str) -> Result<String> {
        if !in_active_layer(ctx, ad_unit) {
            return Ok(String::new());
        }
        let id = ctx.config().ad_unit_id(ad_unit);
        let id_js = json_string(&id);
        let env = Self::environment()?;
        let output = env.get_template(UNIT_TEMPLATE)?.render(context! {
            id_js => id_js,
            id => id,
            class => html_class(ad_unit),
            ad_unit => ad_unit,
        })?;
        Ok(output)
    }
}
