//! The site snapshot and the queried object of a page request.
//!
//! The host application owns its content; ad layers only needs enough of it to
//! match layers and fill path templates. A [`Site`] describes the registered
//! taxonomies, post types and terms, and a [`Request`] describes what is being
//! viewed.

use crate::model::{PostId, TermId, AD_LAYER_POST_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub hierarchical: bool,
}

impl Taxonomy {
    pub fn new(name: impl Into<String>, label: impl Into<String>, hierarchical: bool) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            hierarchical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostType {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub has_archive: bool,
}

impl PostType {
    pub fn new(name: impl Into<String>, label: impl Into<String>, has_archive: bool) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            has_archive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub taxonomy: String,
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<TermId>,
}

impl Term {
    pub fn new(id: TermId, taxonomy: impl Into<String>, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            id,
            taxonomy: taxonomy.into(),
            name: slug.clone(),
            slug,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: TermId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Registered public taxonomies, post types and the term table of a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default = "default_taxonomies")]
    pub taxonomies: Vec<Taxonomy>,
    #[serde(default = "default_post_types")]
    pub post_types: Vec<PostType>,
    #[serde(default)]
    pub terms: Vec<Term>,
}

fn default_site_url() -> String {
    "http://example.org".to_string()
}

fn default_taxonomies() -> Vec<Taxonomy> {
    vec![
        Taxonomy::new("category", "Categories", true),
        Taxonomy::new("post_tag", "Tags", false),
    ]
}

fn default_post_types() -> Vec<PostType> {
    vec![
        PostType::new("post", "Posts", false),
        PostType::new("page", "Pages", false),
    ]
}

impl Default for Site {
    fn default() -> Self {
        Self {
            name: String::new(),
            site_url: default_site_url(),
            taxonomies: default_taxonomies(),
            post_types: default_post_types(),
            terms: Vec::new(),
        }
    }
}

impl Site {
    /// The site url without its scheme.
    pub fn domain(&self) -> String {
        let url = self.site_url.trim();
        url.strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url)
            .to_string()
    }

    pub fn taxonomy_exists(&self, name: &str) -> bool {
        self.taxonomies.iter().any(|t| t.name == name)
    }

    pub fn post_type_exists(&self, name: &str) -> bool {
        name != AD_LAYER_POST_TYPE && self.post_types.iter().any(|p| p.name == name)
    }

    pub fn term(&self, id: TermId) -> Option<&Term> {
        self.terms.iter().find(|t| t.id == id)
    }

    /// Taxonomy name to label, in registration order.
    pub fn taxonomy_labels(&self) -> Vec<(&str, &str)> {
        self.taxonomies
            .iter()
            .map(|t| (t.name.as_str(), t.label.as_str()))
            .collect()
    }

    /// The slash separated slugs from the top ancestor down to `id`.
    ///
    /// Returns `None` when the term is unknown. A broken parent chain stops at
    /// the last known term.
    pub fn term_path(&self, id: TermId) -> Option<String> {
        let mut term = self.term(id)?;
        let mut slugs = vec![term.slug.as_str()];
        let mut seen = HashSet::from([term.id]);
        while let Some(parent) = term.parent.filter(|p| *p != 0) {
            if !seen.insert(parent) {
                break;
            }
            match self.term(parent) {
                Some(p) => {
                    slugs.push(p.slug.as_str());
                    term = p;
                }
                None => break,
            }
        }
        slugs.reverse();
        Some(slugs.join("/"))
    }
}

/// A singular post being viewed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub post_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Assigned terms, by taxonomy.
    #[serde(default)]
    pub terms: BTreeMap<String, Vec<TermId>>,
    /// The `ad_layer` post meta: a layer forced for this post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_layer: Option<PostId>,
}

impl Post {
    pub fn new(id: impl Into<PostId>, post_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            post_type: post_type.into(),
            ..Default::default()
        }
    }

    pub fn with_terms(mut self, taxonomy: impl Into<String>, terms: Vec<TermId>) -> Self {
        self.terms.insert(taxonomy.into(), terms);
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_ad_layer(mut self, layer: impl Into<PostId>) -> Self {
        self.ad_layer = Some(layer.into());
        self
    }

    pub fn terms_in(&self, taxonomy: &str) -> &[TermId] {
        self.terms.get(taxonomy).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the post has any term in `taxonomy`, or one of `terms` when given.
    pub fn has_term(&self, taxonomy: &str, terms: &[TermId]) -> bool {
        let assigned = self.terms_in(taxonomy);
        if terms.is_empty() {
            !assigned.is_empty()
        } else {
            assigned.iter().any(|t| terms.contains(t))
        }
    }
}

/// The queried object of the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Home,
    Singular(Post),
    TermArchive {
        term: Term,
        /// The `ad_layer` term meta.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ad_layer: Option<PostId>,
    },
    PostTypeArchive {
        post_type: String,
    },
    Author {
        display_name: String,
    },
    Date,
    NotFound,
    Search,
    Other,
}

impl Request {
    pub fn term_archive(term: Term) -> Self {
        Request::TermArchive {
            term,
            ad_layer: None,
        }
    }

    pub fn post(&self) -> Option<&Post> {
        match self {
            Request::Singular(post) => Some(post),
            _ => None,
        }
    }

    /// The post type of a singular view or of a post type archive.
    pub fn post_type(&self) -> Option<&str> {
        match self {
            Request::Singular(post) => Some(post.post_type.as_str()),
            Request::PostTypeArchive { post_type } => Some(post_type.as_str()),
            _ => None,
        }
    }

    pub fn archived_term(&self) -> Option<&Term> {
        match self {
            Request::TermArchive { term, .. } => Some(term),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn site() -> Site {
        Site {
            terms: vec![
                Term::new(1, "category", "news"),
                Term::new(2, "category", "world").with_parent(1),
                Term::new(3, "category", "europe").with_parent(2),
            ],
            ..Site::default()
        }
    }

    #[test]
    fn domain_strips_scheme() {
        let mut site = Site::default();
        assert_eq!(site.domain(), "example.org");
        site.site_url = " https://news.example.com ".into();
        assert_eq!(site.domain(), "news.example.com");
    }

    #[test]
    fn term_path_walks_ancestors() {
        let site = site();
        assert_eq!(site.term_path(3).as_deref(), Some("news/world/europe"));
        assert_eq!(site.term_path(1).as_deref(), Some("news"));
        assert_eq!(site.term_path(99), None);
    }

    #[test]
    fn term_path_survives_cycles() {
        let site = Site {
            terms: vec![
                Term::new(1, "category", "a").with_parent(2),
                Term::new(2, "category", "b").with_parent(1),
            ],
            ..Site::default()
        };
        assert_eq!(site.term_path(1).as_deref(), Some("b/a"));
    }

    #[test]
    fn post_has_term() {
        let post = Post::new(5, "post").with_terms("category", vec![2]);
        assert!(post.has_term("category", &[]));
        assert!(post.has_term("category", &[1, 2]));
        assert!(!post.has_term("category", &[3]));
        assert!(!post.has_term("post_tag", &[]));
    }

    #[test]
    fn request_parses_from_json() {
        let req: Request = serde_json::from_value(json!({
            "type": "singular",
            "id": "7",
            "post_type": "post",
            "terms": { "category": [1] }
        }))
        .unwrap();
        assert_eq!(req.post_type(), Some("post"));
        assert_eq!(req.post().unwrap().id, PostId(7));

        let req: Request = serde_json::from_value(json!({ "type": "not_found" })).unwrap();
        assert_eq!(req, Request::NotFound);
    }
}
