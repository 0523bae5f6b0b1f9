//! Formatting tags and path templates.
//!
//! A path template such as `/#account_id#/#category#/#ad_unit#` is parsed once
//! into literal and tag nodes. Rendering asks [`FormattingTags`] for the value
//! of each tag; tags without a value are dropped from the output.

use crate::request::{Request, Site};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#[a-zA-Z_]+#").expect("formatting tag pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Literal(String),
    /// Tag name without the surrounding `#`.
    Tag(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut nodes = Vec::new();
        let mut last = 0;
        for found in TAG_PATTERN.find_iter(source) {
            if found.start() > last {
                nodes.push(Node::Literal(source[last..found.start()].to_string()));
            }
            let tag = found.as_str();
            nodes.push(Node::Tag(tag[1..tag.len() - 1].to_string()));
            last = found.end();
        }
        if last < source.len() {
            nodes.push(Node::Literal(source[last..].to_string()));
        }
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Distinct tag names in order of first appearance.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = Vec::new();
        for node in &self.nodes {
            if let Node::Tag(name) = node {
                if !tags.contains(&name.as_str()) {
                    tags.push(name);
                }
            }
        }
        tags
    }

    /// Render with `resolve` supplying tag values. Unresolved tags are removed.
    pub fn render<F>(&self, mut resolve: F) -> String
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Literal(text) => out.push_str(text),
                Node::Tag(name) => {
                    if let Some(value) = resolve(name) {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            match node {
                Node::Literal(text) => f.write_str(text)?,
                Node::Tag(name) => write!(f, "#{}#", name)?,
            }
        }
        Ok(())
    }
}

/// Everything a tag value may depend on.
#[derive(Debug, Clone, Copy)]
pub struct TagContext<'a> {
    pub site: &'a Site,
    pub request: &'a Request,
    pub account_id: &'a str,
    pub domain: &'a str,
    pub ad_unit: &'a str,
    pub page_type: &'a str,
}

/// Supplies or rewrites the value of a formatting tag.
///
/// Resolvers run in registration order after the built-in value is computed
/// and receive the current value, so they can fill custom tags or override
/// built-ins. Returning `None` leaves the tag unresolved.
pub trait TagResolver {
    fn resolve(&self, tag: &str, value: Option<String>, ctx: &TagContext<'_>) -> Option<String>;
}

impl<F> TagResolver for F
where
    F: Fn(&str, Option<String>, &TagContext<'_>) -> Option<String>,
{
    fn resolve(&self, tag: &str, value: Option<String>, ctx: &TagContext<'_>) -> Option<String> {
        self(tag, value, ctx)
    }
}

/// The set of known formatting tags and their resolvers.
pub struct FormattingTags {
    descriptions: Vec<(String, String)>,
    resolvers: Vec<Box<dyn TagResolver>>,
}

impl FormattingTags {
    /// The built-in tags plus one tag per registered taxonomy.
    pub fn for_site(site: &Site) -> Self {
        let mut tags = Self {
            descriptions: Vec::new(),
            resolvers: Vec::new(),
        };
        tags.register("account_id", "Your DFP account ID");
        tags.register(
            "domain",
            "The domain of the current site, taken from the site url",
        );
        tags.register("ad_unit", "The ad unit name");
        tags.register(
            "post_type",
            "The post type of the current page, if applicable",
        );
        for (name, label) in site.taxonomy_labels() {
            tags.register(
                name,
                format!(
                    "The current term from the {} taxonomy, if applicable. If the taxonomy is \
                     hierarchical, each term in the hierarchy above the current term will be \
                     added to the path. If there is more than one term, only the first will be used.",
                    label
                ),
            );
        }
        tags
    }

    /// Add a tag (name without `#`). Registering an existing tag replaces its description.
    pub fn register(&mut self, name: impl Into<String>, description: impl Into<String>) {
        let name = name.into();
        let description = description.into();
        match self.descriptions.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = description,
            None => self.descriptions.push((name, description)),
        }
    }

    pub fn add_resolver(&mut self, resolver: Box<dyn TagResolver>) {
        self.resolvers.push(resolver);
    }

    pub fn resolve_with<F>(&mut self, resolver: F)
    where
        F: Fn(&str, Option<String>, &TagContext<'_>) -> Option<String> + 'static,
    {
        self.resolvers.push(Box::new(resolver));
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.descriptions.iter().any(|(n, _)| n == name)
    }

    /// `(#tag#, description)` pairs for help output.
    pub fn describe(&self) -> Vec<(String, String)> {
        self.descriptions
            .iter()
            .map(|(name, description)| (format!("#{}#", name), description.clone()))
            .collect()
    }

    /// The value of a tag for the current request. Unknown tags have no value.
    pub fn resolve(&self, name: &str, ctx: &TagContext<'_>) -> Option<String> {
        if !self.is_known(name) {
            return None;
        }
        let builtin = builtin_value(name, ctx);
        self.resolvers
            .iter()
            .fold(builtin, |value, resolver| resolver.resolve(name, value, ctx))
    }

    pub fn render(&self, template: &Template, ctx: &TagContext<'_>) -> String {
        template.render(|name| self.resolve(name, ctx))
    }

    /// Substitute tags in a free-form string (targeting values).
    pub fn render_str(&self, source: &str, ctx: &TagContext<'_>) -> String {
        if !TAG_PATTERN.is_match(source) {
            return source.to_string();
        }
        self.render(&Template::parse(source), ctx)
    }
}

fn builtin_value(name: &str, ctx: &TagContext<'_>) -> Option<String> {
    match name {
        "account_id" => Some(ctx.account_id.to_string()),
        "domain" => Some(ctx.domain.to_string()),
        "ad_unit" => Some(ctx.ad_unit.to_string()),
        "post_type" => ctx.request.post_type().map(str::to_string),
        taxonomy if ctx.site.taxonomy_exists(taxonomy) => {
            Some(taxonomy_path(ctx.site, ctx.request, taxonomy).unwrap_or_default())
        }
        _ => None,
    }
}

/// The archived term on a term archive of `taxonomy`, or the first term of a
/// singular post, as a slash joined ancestor path.
fn taxonomy_path(site: &Site, request: &Request, taxonomy: &str) -> Option<String> {
    match request {
        Request::TermArchive { term, .. } if term.taxonomy == taxonomy => site
            .term_path(term.id)
            .or_else(|| Some(term.slug.clone())),
        Request::Singular(post) => post
            .terms_in(taxonomy)
            .first()
            .and_then(|id| site.term_path(*id)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Post, Term};

    fn site() -> Site {
        Site {
            terms: vec![
                Term::new(1, "category", "news"),
                Term::new(2, "category", "world").with_parent(1),
                Term::new(9, "post_tag", "rust"),
            ],
            ..Site::default()
        }
    }

    fn ctx<'a>(site: &'a Site, request: &'a Request) -> TagContext<'a> {
        TagContext {
            site,
            request,
            account_id: "6355419",
            domain: "example.org",
            ad_unit: "sidebar",
            page_type: "default",
        }
    }

    #[test]
    fn parses_literals_and_tags() {
        let t = Template::parse("/#account_id#/x/#ad_unit#");
        assert_eq!(
            t.nodes(),
            &[
                Node::Literal("/".into()),
                Node::Tag("account_id".into()),
                Node::Literal("/x/".into()),
                Node::Tag("ad_unit".into()),
            ]
        );
        assert_eq!(t.to_string(), "/#account_id#/x/#ad_unit#");
    }

    #[test]
    fn hash_without_name_is_literal() {
        let t = Template::parse("/a#1#/##");
        assert!(t.tags().is_empty());
    }

    #[test]
    fn renders_builtins() {
        let site = site();
        let request = Request::Singular(Post::new(3, "post").with_terms("category", vec![2, 1]));
        let tags = FormattingTags::for_site(&site);
        let t = Template::parse("/#account_id#/#domain#/#category#/#post_type#/#ad_unit#");
        assert_eq!(
            tags.render(&t, &ctx(&site, &request)),
            "/6355419/example.org/news/world/post/sidebar"
        );
    }

    #[test]
    fn term_archive_uses_archived_term() {
        let site = site();
        let request = Request::term_archive(Term::new(2, "category", "world").with_parent(1));
        let tags = FormattingTags::for_site(&site);
        let t = Template::parse("/#category#/#post_tag#");
        assert_eq!(tags.render(&t, &ctx(&site, &request)), "/news/world/");
    }

    #[test]
    fn unknown_tags_are_removed() {
        let site = site();
        let request = Request::Home;
        let tags = FormattingTags::for_site(&site);
        let t = Template::parse("/#account_id#/#section#/#post_type#");
        assert_eq!(tags.render(&t, &ctx(&site, &request)), "/6355419//");
    }

    #[test]
    fn resolvers_fill_custom_tags_and_override_builtins() {
        let site = site();
        let request = Request::Home;
        let mut tags = FormattingTags::for_site(&site);
        tags.register("section", "Site section");
        tags.resolve_with(|tag, value, ctx| match tag {
            "section" => Some(format!("{}-front", ctx.page_type)),
            "domain" => Some("override.test".to_string()),
            _ => value,
        });
        let t = Template::parse("/#domain#/#section#/#ad_unit#");
        assert_eq!(
            tags.render(&t, &ctx(&site, &request)),
            "/override.test/default-front/sidebar"
        );
    }

    #[test]
    fn describes_taxonomy_tags() {
        let tags = FormattingTags::for_site(&site());
        let described: Vec<String> = tags.describe().into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            described,
            vec!["#account_id#", "#domain#", "#ad_unit#", "#post_type#", "#category#", "#post_tag#"]
        );
    }
}
