//! Request-scoped state.
//!
//! A [`Snapshot`] is read from the store once and can serve many requests. A
//! [`RequestContext`] pairs it with one [`Request`] and memoizes the active
//! layer and page type, so the resolver runs at most once per request.

use crate::config::AdLayersConfig;
use crate::error::Result;
use crate::model::{AdLayer, LayerRef, TargetingRule};
use crate::page_types;
use crate::paths;
use crate::request::{Request, Site};
use crate::resolver::{self, LayerOverride, LayerSet};
use crate::settings::{self, AdServerSettings, CompiledBreakpoint};
use crate::store::SiteStore;
use crate::targeting::{self, TargetingValue};
use crate::template::{FormattingTags, TagContext};
use once_cell::unsync::OnceCell;

/// Settings and layers as stored, read once.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub config: AdLayersConfig,
    pub settings: AdServerSettings,
    pub compiled: Vec<CompiledBreakpoint>,
    pub layers: LayerSet,
    pub custom_variables: Vec<String>,
}

impl Snapshot {
    /// Read everything needed for rendering.
    ///
    /// An empty breakpoint cache is rebuilt from the settings and written back.
    pub fn load<S: SiteStore>(store: &mut S, config: AdLayersConfig) -> Result<Self> {
        let settings = store.settings()?;
        let mut compiled = store.compiled_settings()?;
        if compiled.is_empty() {
            if let Some(rebuilt) = settings::compile(&settings) {
                tracing::info!(
                    breakpoints = rebuilt.len(),
                    "breakpoint cache was empty, regenerated"
                );
                store.set_compiled_settings(&rebuilt)?;
                compiled = rebuilt;
            }
        }

        Ok(Self {
            config,
            settings,
            compiled,
            layers: LayerSet::new(store.priority()?, store.list_layers()?),
            custom_variables: store.custom_variables()?,
        })
    }
}

/// One page request against a snapshot.
pub struct RequestContext<'a> {
    snapshot: &'a Snapshot,
    request: Request,
    tags: FormattingTags,
    layer_override: Option<Box<dyn LayerOverride + 'a>>,
    domain: String,
    active: OnceCell<Option<LayerRef>>,
    page_type: OnceCell<String>,
}

impl<'a> RequestContext<'a> {
    pub fn new(snapshot: &'a Snapshot, request: Request) -> Self {
        let site = &snapshot.config.site;
        Self {
            snapshot,
            request,
            tags: FormattingTags::for_site(site),
            layer_override: None,
            domain: site.domain(),
            active: OnceCell::new(),
            page_type: OnceCell::new(),
        }
    }

    pub fn with_override(mut self, layer_override: impl LayerOverride + 'a) -> Self {
        self.layer_override = Some(Box::new(layer_override));
        self
    }

    /// Register custom formatting tags or resolvers before rendering.
    pub fn tags_mut(&mut self) -> &mut FormattingTags {
        &mut self.tags
    }

    pub fn tags(&self) -> &FormattingTags {
        &self.tags
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.snapshot
    }

    pub fn config(&self) -> &AdLayersConfig {
        &self.snapshot.config
    }

    pub fn settings(&self) -> &AdServerSettings {
        &self.snapshot.settings
    }

    pub fn site(&self) -> &Site {
        &self.snapshot.config.site
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The active layer, resolved on first use.
    pub fn active_layer(&self) -> Option<&LayerRef> {
        self.active
            .get_or_init(|| {
                resolver::resolve(
                    &self.snapshot.layers,
                    &self.request,
                    self.layer_override
                        .as_ref()
                        .map(|o| o.as_ref() as &dyn LayerOverride),
                )
            })
            .as_ref()
    }

    /// The stored post of the active layer.
    pub fn active_ad_layer(&self) -> Option<&AdLayer> {
        self.active_layer()
            .and_then(|layer| self.snapshot.layers.get(layer.post_id))
    }

    pub fn page_type(&self) -> &str {
        self.page_type
            .get_or_init(|| page_types::current_page_type(self.site(), &self.request))
    }

    pub fn tag_context<'c>(&'c self, ad_unit: &'c str) -> TagContext<'c> {
        TagContext {
            site: self.site(),
            request: &self.request,
            account_id: &self.snapshot.settings.account_id,
            domain: &self.domain,
            ad_unit,
            page_type: self.page_type(),
        }
    }

    /// The rendered path for a unit on this request.
    pub fn path(&self, ad_unit: &str) -> String {
        let ctx = self.tag_context(ad_unit);
        paths::resolve_path(self.settings(), self.active_ad_layer(), &self.tags, &ctx)
    }

    pub fn targeting(&self, rules: &[TargetingRule], ad_unit: &str) -> Vec<(String, TargetingValue)> {
        let ctx = self.tag_context(ad_unit);
        targeting::collect(rules, &self.tags, &ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LayerAdUnit, PostId, PostStatus};
    use crate::settings::{Breakpoint, GlobalAdUnit, PathTemplate, Size};
    use crate::store::memory::InMemoryStore;
    use std::cell::Cell;

    fn store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store
            .set_settings(&AdServerSettings {
                ad_server: Some("Ad_Layers_DFP".into()),
                account_id: "6355419".into(),
                path_templates: vec![PathTemplate::new("default", "/#account_id#/#ad_unit#/front")],
                breakpoints: vec![Breakpoint::new("all", 0, 0)],
                ad_units: vec![GlobalAdUnit::new("sidebar").with_size(Size::new(300, 250))],
            })
            .unwrap();
        let mut layer = AdLayer::new(PostId(1), "Everywhere", PostStatus::Publish);
        layer.meta.ad_units = vec![LayerAdUnit::new("sidebar")];
        store.save_layer(&layer).unwrap();
        store.set_priority(&[layer.as_ref()]).unwrap();
        store
    }

    #[test]
    fn empty_cache_is_regenerated_and_stored() {
        let mut store = store();
        assert!(store.compiled_settings().unwrap().is_empty());

        let snapshot = Snapshot::load(&mut store, AdLayersConfig::default()).unwrap();
        assert_eq!(snapshot.compiled.len(), 1);
        assert_eq!(store.compiled_settings().unwrap(), snapshot.compiled);
    }

    #[test]
    fn resolves_layer_and_path() {
        let mut store = store();
        let snapshot = Snapshot::load(&mut store, AdLayersConfig::default()).unwrap();
        let home = RequestContext::new(&snapshot, Request::Home);
        assert_eq!(home.active_layer().map(|l| l.post_id), Some(PostId(1)));
        assert_eq!(home.page_type(), "home");

        let other = RequestContext::new(&snapshot, Request::Other);
        assert_eq!(other.active_layer(), None);
        assert_eq!(other.page_type(), "default");
        assert_eq!(other.path("sidebar"), "/6355419/sidebar/front");
    }

    #[test]
    fn resolver_runs_once_per_request() {
        let mut store = store();
        let snapshot = Snapshot::load(&mut store, AdLayersConfig::default()).unwrap();
        let calls = Cell::new(0);
        let ctx = RequestContext::new(&snapshot, Request::Home).with_override(|_: &Request| {
            calls.set(calls.get() + 1);
            None::<LayerRef>
        });
        ctx.active_layer();
        ctx.active_layer();
        assert_eq!(calls.get(), 1);
    }
}
