//! Ad server settings and the compiled breakpoint cache.
//!
//! Settings are edited per ad unit (each unit lists its sizes and the
//! breakpoints a size applies to). Tag generation wants the opposite shape, so
//! [`compile`] regroups units under each breakpoint. The result is stored in
//! its own option and rebuilt whenever the settings are saved.

use crate::lenient;
use crate::model::TargetingRule;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdServerSettings {
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub ad_server: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub account_id: String,
    #[serde(default, deserialize_with = "lenient::list")]
    pub path_templates: Vec<PathTemplate>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub breakpoints: Vec<Breakpoint>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub ad_units: Vec<GlobalAdUnit>,
}

impl AdServerSettings {
    pub fn ad_unit(&self, code: &str) -> Option<&GlobalAdUnit> {
        self.ad_units.iter().find(|unit| unit.code == code)
    }

    /// Configured unit codes, sorted.
    pub fn ad_unit_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .ad_units
            .iter()
            .map(|unit| unit.code.clone())
            .filter(|code| !code.is_empty())
            .collect();
        codes.sort();
        codes
    }

    /// The template configured for `page_type`. Later entries win.
    pub fn path_template(&self, page_type: &str) -> Option<&str> {
        self.path_templates
            .iter()
            .rev()
            .find(|t| t.page_type == page_type)
            .map(|t| t.path_template.as_str())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTemplate {
    #[serde(default, deserialize_with = "lenient::string")]
    pub path_template: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub page_type: String,
}

impl PathTemplate {
    pub fn new(page_type: impl Into<String>, path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
            page_type: page_type.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::uint")]
    pub min_width: u32,
    #[serde(default, deserialize_with = "lenient::uint")]
    pub min_height: u32,
}

impl Breakpoint {
    pub fn new(title: impl Into<String>, min_width: u32, min_height: u32) -> Self {
        Self {
            title: title.into(),
            min_width,
            min_height,
        }
    }
}

/// An ad unit defined in the ad server settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalAdUnit {
    #[serde(default, deserialize_with = "lenient::string")]
    pub code: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub path_override: Option<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub sizes: Vec<Size>,
    #[serde(
        default,
        deserialize_with = "lenient::list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub custom_targeting: Vec<TargetingRule>,
    /// Placeholder dimensions used by the debug server.
    #[serde(default, deserialize_with = "lenient::uint", skip_serializing_if = "is_zero")]
    pub width: u32,
    #[serde(default, deserialize_with = "lenient::uint", skip_serializing_if = "is_zero")]
    pub height: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl GlobalAdUnit {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.sizes.push(size);
        self
    }
}

/// One size of an ad unit.
///
/// `default_size` and `out_of_page` are checkbox values: set when they hold
/// `"default"` and `"oop"` respectively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    #[serde(default, deserialize_with = "lenient::uint")]
    pub width: u32,
    #[serde(default, deserialize_with = "lenient::uint")]
    pub height: u32,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_size: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub out_of_page: Option<String>,
    /// Breakpoint titles this size applies to. `None` means every breakpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoints: Option<Vec<String>>,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn default_size(mut self) -> Self {
        self.default_size = Some("default".to_string());
        self
    }

    pub fn out_of_page(mut self) -> Self {
        self.out_of_page = Some("oop".to_string());
        self
    }

    pub fn for_breakpoints<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.breakpoints = Some(titles.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_default(&self) -> bool {
        self.default_size.as_deref() == Some("default")
    }

    pub fn is_out_of_page(&self) -> bool {
        self.out_of_page.as_deref() == Some("oop")
    }

    /// Both dimensions are set.
    pub fn is_complete(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn dimensions(&self) -> [u32; 2] {
        [self.width, self.height]
    }
}

/// A breakpoint with the units (and sizes) that apply to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledBreakpoint {
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::uint")]
    pub min_width: u32,
    #[serde(default, deserialize_with = "lenient::uint")]
    pub min_height: u32,
    #[serde(default, deserialize_with = "lenient::list")]
    pub ad_units: Vec<GlobalAdUnit>,
}

/// Regroup unit sizes under each breakpoint.
///
/// Sizes without a breakpoint list apply everywhere; sizes whose list omits a
/// breakpoint are dropped from it, and a unit left without sizes is not added.
/// Returns `None` when there are no breakpoints or no units.
pub fn compile(settings: &AdServerSettings) -> Option<Vec<CompiledBreakpoint>> {
    if settings.breakpoints.is_empty() || settings.ad_units.is_empty() {
        return None;
    }

    let compiled = settings
        .breakpoints
        .iter()
        .map(|breakpoint| {
            let ad_units = settings
                .ad_units
                .iter()
                .filter_map(|unit| {
                    let sizes: Vec<Size> = unit
                        .sizes
                        .iter()
                        .filter(|size| match &size.breakpoints {
                            Some(titles) => titles.contains(&breakpoint.title),
                            None => true,
                        })
                        .map(|size| Size {
                            breakpoints: None,
                            ..size.clone()
                        })
                        .collect();
                    if sizes.is_empty() {
                        None
                    } else {
                        Some(GlobalAdUnit {
                            sizes,
                            ..unit.clone()
                        })
                    }
                })
                .collect();
            CompiledBreakpoint {
                title: breakpoint.title.clone(),
                min_width: breakpoint.min_width,
                min_height: breakpoint.min_height,
                ad_units,
            }
        })
        .collect();

    Some(compiled)
}
