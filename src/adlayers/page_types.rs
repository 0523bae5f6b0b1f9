//! Page type catalog and detection.
//!
//! Page type keys are shared by layer rules (`ad_layer_page_types`) and path
//! templates. Singular views use the post type name, taxonomy archives the
//! taxonomy name, and post type archives `archive::{post_type}`.

use crate::model::AD_LAYER_POST_TYPE;
use crate::request::{Request, Site};
use serde::Serialize;

pub const ARCHIVE_PREFIX: &str = "archive::";
pub const DEFAULT_PAGE_TYPE: &str = "default";
/// Path template key that applies to every page type.
pub const ALL_PAGE_TYPES: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageType {
    pub key: String,
    pub label: String,
}

impl PageType {
    fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// All page types of a site, in matching order.
pub fn page_types(site: &Site) -> Vec<PageType> {
    let mut types = vec![PageType::new("home", "Home Page")];

    types.extend(
        site.post_types
            .iter()
            .filter(|p| p.name != AD_LAYER_POST_TYPE)
            .map(|p| PageType::new(&p.name, &p.label)),
    );
    types.extend(
        site.post_types
            .iter()
            .filter(|p| p.has_archive)
            .map(|p| {
                PageType::new(
                    format!("{}{}", ARCHIVE_PREFIX, p.name),
                    format!("{} Archive", p.label),
                )
            }),
    );
    types.extend(
        site.taxonomies
            .iter()
            .map(|t| PageType::new(&t.name, format!("{} Archive", t.label))),
    );
    types.extend([
        PageType::new("author", "Author Archive"),
        PageType::new("date", "Date Archive"),
        PageType::new("notfound", "404 Page"),
        PageType::new("search", "Search Results"),
        PageType::new(DEFAULT_PAGE_TYPE, "Default"),
    ]);

    // Keys are unique; a later registration only replaces the label.
    let mut unique: Vec<PageType> = Vec::with_capacity(types.len());
    for page_type in types {
        match unique.iter_mut().find(|p| p.key == page_type.key) {
            Some(existing) => existing.label = page_type.label,
            None => unique.push(page_type),
        }
    }
    unique
}

/// Whether `key` describes the given request.
pub fn matches(site: &Site, key: &str, request: &Request) -> bool {
    match (key, request) {
        ("home", Request::Home) => true,
        ("author", Request::Author { .. }) => true,
        ("date", Request::Date) => true,
        ("notfound", Request::NotFound) => true,
        ("search", Request::Search) => true,
        (_, Request::PostTypeArchive { post_type }) => {
            key.strip_prefix(ARCHIVE_PREFIX) == Some(post_type.as_str())
        }
        (_, Request::Singular(post)) => site.post_type_exists(key) && post.post_type == key,
        (_, Request::TermArchive { term, .. }) => {
            site.taxonomy_exists(key) && term.taxonomy == key
        }
        _ => false,
    }
}

/// The first catalog key matching the request, or `default`.
pub fn current_page_type(site: &Site, request: &Request) -> String {
    page_types(site)
        .into_iter()
        .map(|p| p.key)
        .find(|key| matches(site, key, request))
        .unwrap_or_else(|| DEFAULT_PAGE_TYPE.to_string())
}
