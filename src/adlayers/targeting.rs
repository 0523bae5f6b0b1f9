//! Custom targeting key/values.

use crate::model::TargetingRule;
use crate::request::{Request, Site};
use crate::template::{FormattingTags, TagContext};
use serde::Serialize;

pub const SOURCE_OTHER: &str = "other";
pub const SOURCE_AUTHOR: &str = "author";
pub const SOURCE_POST_TYPE: &str = "post_type";

/// A targeting value: one string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TargetingValue {
    One(String),
    Many(Vec<String>),
}

impl TargetingValue {
    pub fn is_empty(&self) -> bool {
        match self {
            TargetingValue::One(value) => value.is_empty(),
            TargetingValue::Many(values) => values.is_empty(),
        }
    }
}

/// Selectable sources: every taxonomy, then post type, author and other.
pub fn sources(site: &Site) -> Vec<(String, String)> {
    let mut sources: Vec<(String, String)> = site
        .taxonomy_labels()
        .into_iter()
        .map(|(name, label)| (name.to_string(), label.to_string()))
        .collect();
    sources.extend([
        (SOURCE_POST_TYPE.to_string(), "Post Type".to_string()),
        (SOURCE_AUTHOR.to_string(), "Author".to_string()),
        (SOURCE_OTHER.to_string(), "Other".to_string()),
    ]);
    sources
}

/// The value of one rule for the current request, if it applies.
pub fn value(
    rule: &TargetingRule,
    tags: &FormattingTags,
    ctx: &TagContext<'_>,
) -> Option<TargetingValue> {
    let value = match (rule.source.as_str(), ctx.request) {
        (SOURCE_OTHER, _) => Some(TargetingValue::Many(
            rule.values
                .iter()
                .map(|value| tags.render_str(value, ctx))
                .collect(),
        )),
        (SOURCE_AUTHOR, Request::Singular(post)) => post.author.clone().map(TargetingValue::One),
        (SOURCE_AUTHOR, Request::Author { display_name }) => {
            Some(TargetingValue::One(display_name.clone()))
        }
        (SOURCE_POST_TYPE, Request::Singular(post)) => {
            Some(TargetingValue::One(post.post_type.clone()))
        }
        (SOURCE_POST_TYPE, Request::PostTypeArchive { post_type }) => {
            Some(TargetingValue::One(post_type.clone()))
        }
        (taxonomy, request) if ctx.site.taxonomy_exists(taxonomy) => match request {
            Request::Singular(post) => Some(TargetingValue::Many(
                post.terms_in(taxonomy)
                    .iter()
                    .filter_map(|id| ctx.site.term(*id))
                    .map(|term| term.slug.clone())
                    .collect(),
            )),
            Request::TermArchive { term, .. } if term.taxonomy == taxonomy => {
                Some(TargetingValue::One(term.slug.clone()))
            }
            _ => None,
        },
        _ => None,
    };
    value.filter(|value| !value.is_empty())
}

/// Key/value pairs for a set of rules, in rule order.
///
/// Rules without a variable or without a value are skipped; a repeated key
/// keeps its first position and takes the later value.
pub fn collect(
    rules: &[TargetingRule],
    tags: &FormattingTags,
    ctx: &TagContext<'_>,
) -> Vec<(String, TargetingValue)> {
    let mut pairs: Vec<(String, TargetingValue)> = Vec::new();
    for rule in rules {
        if rule.custom_variable.is_empty() {
            continue;
        }
        let Some(value) = value(rule, tags, ctx) else {
            continue;
        };
        match pairs.iter_mut().find(|(key, _)| *key == rule.custom_variable) {
            Some(existing) => existing.1 = value,
            None => pairs.push((rule.custom_variable.clone(), value)),
        }
    }
    pairs
}

/// `.setTargeting("key",value)` calls for a set of pairs.
pub fn to_js(pairs: &[(String, TargetingValue)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                ".setTargeting({},{})",
                json_string(key),
                serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
            )
        })
        .collect()
}

/// Pairs as a JSON object for the front-end ad details.
pub fn to_json(pairs: &[(String, TargetingValue)]) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = pairs
        .iter()
        .map(|(key, value)| {
            (
                key.clone(),
                serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
            )
        })
        .collect();
    serde_json::Value::Object(map)
}

pub(crate) fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Post, Term};

    fn site() -> Site {
        Site {
            terms: vec![Term::new(1, "category", "news"), Term::new(2, "category", "sports")],
            ..Site::default()
        }
    }

    fn pairs(rules: &[TargetingRule], request: &Request) -> Vec<(String, TargetingValue)> {
        let site = site();
        let tags = FormattingTags::for_site(&site);
        let ctx = TagContext {
            site: &site,
            request,
            account_id: "6355419",
            domain: "example.org",
            ad_unit: "",
            page_type: "default",
        };
        collect(rules, &tags, &ctx)
    }

    #[test]
    fn other_values_substitute_tags() {
        let rules = [TargetingRule::new("domain", "other").with_values(["#domain#"])];
        let js = to_js(&pairs(&rules, &Request::Home));
        assert_eq!(js, r#".setTargeting("domain",["example.org"])"#);
    }

    #[test]
    fn singular_sources() {
        let request = Request::Singular(
            Post::new(4, "post")
                .with_author("Jane Doe")
                .with_terms("category", vec![1, 2]),
        );
        let rules = [
            TargetingRule::new("author", "author"),
            TargetingRule::new("type", "post_type"),
            TargetingRule::new("section", "category"),
            TargetingRule::new("tags", "post_tag"),
        ];
        let js = to_js(&pairs(&rules, &request));
        assert_eq!(
            js,
            r#".setTargeting("author","Jane Doe").setTargeting("type","post").setTargeting("section",["news","sports"])"#
        );
    }

    #[test]
    fn term_archive_uses_archived_slug() {
        let request = Request::term_archive(Term::new(2, "category", "sports"));
        let rules = [
            TargetingRule::new("section", "category"),
            TargetingRule::new("tags", "post_tag"),
            TargetingRule::new("author", "author"),
        ];
        assert_eq!(
            pairs(&rules, &request),
            vec![("section".to_string(), TargetingValue::One("sports".into()))]
        );
    }

    #[test]
    fn unknown_sources_and_missing_keys_are_dropped() {
        let rules = [
            TargetingRule::new("x", "nonexistent"),
            TargetingRule::new("", "other").with_values(["a"]),
            TargetingRule::new("empty", "other"),
        ];
        assert!(pairs(&rules, &Request::Home).is_empty());
    }

    #[test]
    fn repeated_keys_keep_position_and_take_last_value() {
        let rules = [
            TargetingRule::new("a", "other").with_values(["1"]),
            TargetingRule::new("b", "other").with_values(["2"]),
            TargetingRule::new("a", "other").with_values(["3"]),
        ];
        let js = to_js(&pairs(&rules, &Request::Home));
        assert_eq!(js, r#".setTargeting("a",["3"]).setTargeting("b",["2"])"#);
    }

    #[test]
    fn source_options() {
        let keys: Vec<String> = sources(&site()).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["category", "post_tag", "post_type", "author", "other"]);
    }
}
