//! Active layer resolution.
//!
//! Layers are evaluated in priority order and the first one whose rules match
//! the request wins. Each kind of request has its own predicate:
//!
//! | request            | post types        | taxonomies | page types                    |
//! |--------------------|-------------------|------------|-------------------------------|
//! | singular           | empty or contains | any match  | empty or contains post type   |
//! | home               | empty             | empty      | empty or contains `home`      |
//! | term archive       | empty             | empty      | empty or contains taxonomy    |
//! | post type archive  | empty or contains | empty      | empty or `archive::{type}`    |
//! | author/date/404/search | empty         | empty      | must contain the key          |
//!
//! Singular posts and term archives can force a layer through their own
//! `ad_layer` meta.

use crate::model::{AdLayer, LayerRef, PostId};
use crate::page_types::ARCHIVE_PREFIX;
use crate::request::{Post, Request};
use std::collections::BTreeMap;

/// The priority list with the layer posts it refers to.
#[derive(Debug, Clone, Default)]
pub struct LayerSet {
    pub priority: Vec<LayerRef>,
    pub layers: BTreeMap<PostId, AdLayer>,
}

impl LayerSet {
    pub fn new(priority: Vec<LayerRef>, layers: impl IntoIterator<Item = AdLayer>) -> Self {
        Self {
            priority,
            layers: layers.into_iter().map(|layer| (layer.id, layer)).collect(),
        }
    }

    pub fn get(&self, id: PostId) -> Option<&AdLayer> {
        self.layers.get(&id)
    }

    /// A reference to a forced layer. The stored title wins over the list title.
    fn forced(&self, id: PostId) -> LayerRef {
        let title = self
            .layers
            .get(&id)
            .map(|layer| layer.title.clone())
            .or_else(|| {
                self.priority
                    .iter()
                    .find(|entry| entry.post_id == id)
                    .map(|entry| entry.title.clone())
            })
            .unwrap_or_default();
        LayerRef::new(id, title)
    }
}

/// Lets the host force a layer for a request before any rule is evaluated.
pub trait LayerOverride {
    fn active_layer(&self, request: &Request) -> Option<LayerRef>;
}

impl<F> LayerOverride for F
where
    F: Fn(&Request) -> Option<LayerRef>,
{
    fn active_layer(&self, request: &Request) -> Option<LayerRef> {
        self(request)
    }
}

/// Pick the active layer for a request.
pub fn resolve(
    set: &LayerSet,
    request: &Request,
    layer_override: Option<&dyn LayerOverride>,
) -> Option<LayerRef> {
    if let Some(layer) = layer_override.and_then(|o| o.active_layer(request)) {
        tracing::debug!(post_id = %layer.post_id, "ad layer forced by override");
        return Some(layer);
    }

    if set.priority.is_empty() {
        return None;
    }

    if let Request::Singular(Post {
        ad_layer: Some(id), ..
    }) = request
    {
        tracing::debug!(post_id = %id, "ad layer forced by post meta");
        return Some(set.forced(*id));
    }

    for entry in &set.priority {
        let Some(layer) = set.get(entry.post_id) else {
            tracing::warn!(post_id = %entry.post_id, "priority list refers to a missing ad layer");
            continue;
        };

        match matches(layer, request) {
            Match::No => continue,
            Match::Yes => {
                tracing::debug!(post_id = %entry.post_id, title = %entry.title, "ad layer matched");
                return Some(entry.clone());
            }
            Match::Forced(id) => {
                tracing::debug!(post_id = %id, "ad layer forced by term meta");
                return Some(set.forced(id));
            }
        }
    }

    tracing::debug!("no ad layer matched");
    None
}

enum Match {
    No,
    Yes,
    Forced(PostId),
}

impl From<bool> for Match {
    fn from(matched: bool) -> Self {
        if matched {
            Match::Yes
        } else {
            Match::No
        }
    }
}

fn contains(list: &[String], value: &str) -> bool {
    list.iter().any(|item| item == value)
}

fn matches(layer: &AdLayer, request: &Request) -> Match {
    let meta = &layer.meta;
    let restrictions = layer.taxonomy_restrictions();
    let unrestricted = restrictions.is_empty();

    match request {
        Request::Singular(post) => {
            let post_type_ok =
                meta.post_types.is_empty() || contains(&meta.post_types, &post.post_type);
            let page_type_ok =
                meta.page_types.is_empty() || contains(&meta.page_types, &post.post_type);
            let taxonomy_ok = unrestricted
                || restrictions
                    .iter()
                    .any(|(taxonomy, terms)| post.has_term(taxonomy, terms));
            (post_type_ok && page_type_ok && taxonomy_ok).into()
        }
        Request::Home => (meta.post_types.is_empty()
            && unrestricted
            && (meta.page_types.is_empty() || contains(&meta.page_types, "home")))
        .into(),
        Request::TermArchive { term, ad_layer } => {
            let matched = meta.post_types.is_empty()
                && unrestricted
                && (meta.page_types.is_empty() || contains(&meta.page_types, &term.taxonomy));
            match (matched, ad_layer) {
                (true, Some(id)) => Match::Forced(*id),
                (matched, _) => matched.into(),
            }
        }
        Request::PostTypeArchive { post_type } => (unrestricted
            && (meta.post_types.is_empty() || contains(&meta.post_types, post_type))
            && (meta.page_types.is_empty()
                || contains(
                    &meta.page_types,
                    &format!("{}{}", ARCHIVE_PREFIX, post_type),
                )))
        .into(),
        Request::Author { .. } => keyed(layer, unrestricted, "author"),
        Request::Date => keyed(layer, unrestricted, "date"),
        Request::NotFound => keyed(layer, unrestricted, "notfound"),
        Request::Search => keyed(layer, unrestricted, "search"),
        Request::Other => Match::No,
    }
}

/// Author, date, 404 and search views only match when explicitly listed.
fn keyed(layer: &AdLayer, unrestricted: bool, key: &str) -> Match {
    (unrestricted && layer.meta.post_types.is_empty() && contains(&layer.meta.page_types, key))
        .into()
}
