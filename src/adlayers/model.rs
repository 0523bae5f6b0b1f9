use crate::lenient;
use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Post type used for ad layer posts.
pub const AD_LAYER_POST_TYPE: &str = "ad-layer";

/// Option holding the layer priority list.
pub const PRIORITY_OPTION: &str = "ad_layers";
/// Option holding the ad server settings.
pub const SETTINGS_OPTION: &str = "ad_layers_ad_server_settings";
/// Option holding the available custom targeting variables.
pub const CUSTOM_VARIABLES_OPTION: &str = "ad_layers_custom_variables";
/// Option holding the compiled (breakpoint oriented) DFP settings.
pub const DFP_CACHE_OPTION: &str = "ad_layers_dfp_settings";

pub type TermId = u64;

/// A post identifier.
///
/// Stored values come from several writers and are sometimes serialized as
/// numeric strings; both forms deserialize to the same id, so `"12"` and `12`
/// compare equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl PostId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for PostId {
    fn from(id: u64) -> Self {
        PostId(id)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PostId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(PostId)
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(PostId(n)),
            Raw::Text(s) => s
                .parse()
                .map_err(|_| de::Error::custom(format!("invalid post id: {:?}", s))),
        }
    }
}

/// One entry of the layer priority list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRef {
    pub post_id: PostId,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
}

impl LayerRef {
    pub fn new(post_id: PostId, title: impl Into<String>) -> Self {
        Self {
            post_id,
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostStatus {
    Publish,
    #[default]
    Draft,
    Pending,
    Future,
    Private,
    Trash,
    AutoDraft,
}

impl PostStatus {
    /// Statuses carried over by the exporter.
    pub fn is_exportable(self) -> bool {
        matches!(
            self,
            PostStatus::Publish | PostStatus::Draft | PostStatus::Future | PostStatus::Pending
        )
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PostStatus::Publish => "publish",
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Future => "future",
            PostStatus::Private => "private",
            PostStatus::Trash => "trash",
            PostStatus::AutoDraft => "auto-draft",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown post status: {}", s))
    }
}

/// A key/value targeting rule. `source` selects where values come from:
/// `other` (the static `values`), `author`, `post_type` or a taxonomy slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetingRule {
    #[serde(default, deserialize_with = "lenient::string")]
    pub custom_variable: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub source: String,
    #[serde(default, deserialize_with = "lenient::list")]
    pub values: Vec<String>,
}

impl TargetingRule {
    pub fn new(custom_variable: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            custom_variable: custom_variable.into(),
            source: source.into(),
            values: Vec::new(),
        }
    }

    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }
}

/// An ad unit assigned to a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerAdUnit {
    #[serde(default, deserialize_with = "lenient::string")]
    pub ad_unit: String,
    #[serde(default, deserialize_with = "lenient::list")]
    pub custom_targeting: Vec<TargetingRule>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub path_override: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub do_not_render: bool,
}

impl LayerAdUnit {
    pub fn new(ad_unit: impl Into<String>) -> Self {
        Self {
            ad_unit: ad_unit.into(),
            custom_targeting: Vec::new(),
            path_override: None,
            do_not_render: false,
        }
    }
}

/// The exportable post meta of a layer. Field names are the meta keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMeta {
    #[serde(
        rename = "ad_layer_ad_units",
        default,
        deserialize_with = "lenient::list"
    )]
    pub ad_units: Vec<LayerAdUnit>,
    #[serde(
        rename = "ad_layer_page_types",
        default,
        deserialize_with = "lenient::list"
    )]
    pub page_types: Vec<String>,
    #[serde(
        rename = "ad_layer_taxonomies",
        default,
        deserialize_with = "lenient::list"
    )]
    pub taxonomies: Vec<String>,
    #[serde(
        rename = "ad_layer_post_types",
        default,
        deserialize_with = "lenient::list"
    )]
    pub post_types: Vec<String>,
    #[serde(
        rename = "ad_layer_custom_targeting",
        default,
        deserialize_with = "lenient::list"
    )]
    pub custom_targeting: Vec<TargetingRule>,
}

impl LayerMeta {
    /// Meta keys moved by import/export.
    pub const KEYS: [&'static str; 5] = [
        "ad_layer_ad_units",
        "ad_layer_page_types",
        "ad_layer_taxonomies",
        "ad_layer_post_types",
        "ad_layer_custom_targeting",
    ];
}

/// An `ad-layer` post with its meta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdLayer {
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub meta: LayerMeta,
    /// Terms assigned to the layer post itself, by taxonomy.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub terms: BTreeMap<String, Vec<TermId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
}

impl AdLayer {
    pub fn new(id: PostId, title: impl Into<String>, status: PostStatus) -> Self {
        Self {
            id,
            title: title.into(),
            status,
            meta: LayerMeta::default(),
            terms: BTreeMap::new(),
            imported_at: None,
        }
    }

    pub fn as_ref(&self) -> LayerRef {
        LayerRef::new(self.id, self.title.clone())
    }

    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Publish
    }

    /// Taxonomy restrictions: the configured taxonomies (any term) merged with
    /// the layer's own terms (one of those terms).
    pub fn taxonomy_restrictions(&self) -> BTreeMap<&str, &[TermId]> {
        let mut restrictions: BTreeMap<&str, &[TermId]> = self
            .meta
            .taxonomies
            .iter()
            .map(|taxonomy| (taxonomy.as_str(), &[][..]))
            .collect();
        for (taxonomy, terms) in &self.terms {
            if !terms.is_empty() {
                restrictions.insert(taxonomy.as_str(), terms.as_slice());
            }
        }
        restrictions
    }

    pub fn ad_unit(&self, code: &str) -> Option<&LayerAdUnit> {
        self.meta.ad_units.iter().find(|unit| unit.ad_unit == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_id_accepts_numbers_and_strings() {
        let a: LayerRef = serde_json::from_value(json!({ "post_id": 12, "title": "A" })).unwrap();
        let b: LayerRef =
            serde_json::from_value(json!({ "post_id": "12", "title": "A" })).unwrap();
        assert_eq!(a.post_id, b.post_id);
        assert_eq!(a, b);
    }

    #[test]
    fn post_id_rejects_garbage() {
        let res: Result<LayerRef, _> = serde_json::from_value(json!({ "post_id": "abc" }));
        assert!(res.is_err());
    }

    #[test]
    fn meta_tolerates_empty_strings() {
        let meta: LayerMeta = serde_json::from_value(json!({
            "ad_layer_ad_units": "",
            "ad_layer_page_types": ["home"],
            "ad_layer_taxonomies": null,
        }))
        .unwrap();
        assert!(meta.ad_units.is_empty());
        assert_eq!(meta.page_types, vec!["home"]);
        assert!(meta.taxonomies.is_empty());
    }

    #[test]
    fn ad_unit_flags_and_overrides() {
        let unit: LayerAdUnit = serde_json::from_value(json!({
            "ad_unit": "sidebar",
            "path_override": "",
            "do_not_render": "1",
        }))
        .unwrap();
        assert_eq!(unit.path_override, None);
        assert!(unit.do_not_render);
    }

    #[test]
    fn taxonomy_restrictions_merge_terms() {
        let mut layer = AdLayer::new(PostId(1), "L", PostStatus::Publish);
        layer.meta.taxonomies = vec!["post_tag".into()];
        layer.terms.insert("category".into(), vec![4, 5]);
        let restrictions = layer.taxonomy_restrictions();
        assert_eq!(restrictions.len(), 2);
        assert!(restrictions["post_tag"].is_empty());
        assert_eq!(restrictions["category"], &[4, 5]);
    }

    #[test]
    fn status_parses_kebab_case() {
        assert_eq!("auto-draft".parse::<PostStatus>(), Ok(PostStatus::AutoDraft));
        assert!(PostStatus::Pending.is_exportable());
        assert!(!PostStatus::Trash.is_exportable());
    }
}
