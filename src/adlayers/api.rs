//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer and the single
//! entry point for every ad layers operation, whatever the UI.
//!
//! The facade:
//! - **Dispatches** to the appropriate command function
//! - **Normalizes inputs** (request documents, optional export destinations)
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! It does no business logic, no terminal I/O and no formatting.
//!
//! ## Generic Over SiteStore
//!
//! `AdLayersApi<S: SiteStore>` is generic over the storage backend:
//! - Production: `AdLayersApi<FileStore>`
//! - Testing: `AdLayersApi<InMemoryStore>`
//!
//! Rendering operations read a fresh [`Snapshot`] per call, so a layer or
//! settings change is visible to the next render without any cache handling.

use crate::commands;
use crate::commands::layers::LayerUpdate;
use crate::config::AdLayersConfig;
use crate::context::Snapshot;
use crate::error::Result;
use crate::model::{LayerMeta, PostId, PostStatus, TermId};
use crate::request::Request;
use crate::server::AdServerRegistry;
use crate::store::SiteStore;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use crate::commands::{CmdMessage, CmdResult, ListedLayer, MessageLevel};

/// The main API facade for ad layers operations.
pub struct AdLayersApi<S: SiteStore> {
    store: S,
    config: AdLayersConfig,
    registry: AdServerRegistry,
}

impl<S: SiteStore> AdLayersApi<S> {
    pub fn new(store: S, config: AdLayersConfig) -> Self {
        Self::with_registry(store, config, AdServerRegistry::default())
    }

    /// Use a registry with extra or replaced ad servers.
    pub fn with_registry(store: S, config: AdLayersConfig, registry: AdServerRegistry) -> Self {
        Self {
            store,
            config,
            registry,
        }
    }

    pub fn config(&self) -> &AdLayersConfig {
        &self.config
    }

    pub fn registry(&self) -> &AdServerRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read settings and layers for rendering.
    pub fn snapshot(&mut self) -> Result<Snapshot> {
        Snapshot::load(&mut self.store, self.config.clone())
    }

    pub fn create_layer(
        &mut self,
        title: String,
        status: PostStatus,
        meta: LayerMeta,
        terms: BTreeMap<String, Vec<TermId>>,
    ) -> Result<CmdResult> {
        commands::layers::create(&mut self.store, title, status, meta, terms)
    }

    pub fn update_layer(&mut self, id: PostId, update: LayerUpdate) -> Result<CmdResult> {
        commands::layers::update(&mut self.store, id, update)
    }

    pub fn delete_layer(&mut self, id: PostId) -> Result<CmdResult> {
        commands::layers::delete(&mut self.store, id)
    }

    pub fn show_layer(&self, id: PostId) -> Result<CmdResult> {
        commands::layers::show(&self.store, id)
    }

    pub fn list_layers(&self) -> Result<CmdResult> {
        commands::layers::list(&self.store)
    }

    pub fn reorder_layers(&mut self, ids: &[PostId]) -> Result<CmdResult> {
        commands::layers::reorder(&mut self.store, ids)
    }

    pub fn set_settings(&mut self, value: Value) -> Result<CmdResult> {
        commands::settings::set(&mut self.store, value)
    }

    pub fn show_settings(&self) -> Result<CmdResult> {
        commands::settings::show(&self.store)
    }

    pub fn compile_settings(&mut self) -> Result<CmdResult> {
        commands::settings::compile(&mut self.store)
    }

    pub fn settings_fields(&mut self, server: Option<&str>) -> Result<CmdResult> {
        let snapshot = self.snapshot()?;
        commands::settings::fields(&self.registry, &snapshot, server)
    }

    pub fn set_custom_variables(&mut self, variables: Vec<String>) -> Result<CmdResult> {
        commands::variables::set(&mut self.store, variables)
    }

    pub fn custom_variables(&self) -> Result<CmdResult> {
        commands::variables::show(&self.store)
    }

    pub fn export(&self, destination: Option<PathBuf>) -> Result<CmdResult> {
        commands::export::run(&self.store, &self.config.site, destination)
    }

    pub fn import(&mut self, content: &str, override_existing: bool) -> Result<CmdResult> {
        commands::import::run(&mut self.store, content, override_existing)
    }

    pub fn resolve(&mut self, request: Request) -> Result<CmdResult> {
        let snapshot = self.snapshot()?;
        commands::render::resolve(&snapshot, request)
    }

    pub fn render_head(&mut self, request: Request) -> Result<CmdResult> {
        let snapshot = self.snapshot()?;
        commands::render::head(&self.registry, &snapshot, request)
    }

    pub fn render_unit(&mut self, request: Request, ad_unit: &str) -> Result<CmdResult> {
        let snapshot = self.snapshot()?;
        commands::render::unit(&self.registry, &snapshot, request, ad_unit)
    }

    pub fn render_content(&mut self, request: Request, content: &str) -> Result<CmdResult> {
        let snapshot = self.snapshot()?;
        commands::render::content(&self.registry, &snapshot, request, content)
    }

    pub fn render_widget(
        &mut self,
        request: Request,
        instance: Value,
        before_widget: &str,
        after_widget: &str,
    ) -> Result<CmdResult> {
        let snapshot = self.snapshot()?;
        commands::render::widget(
            &self.registry,
            &snapshot,
            request,
            instance,
            before_widget,
            after_widget,
        )
    }

    pub fn widget_slots(&mut self) -> Result<CmdResult> {
        let snapshot = self.snapshot()?;
        commands::render::widget_slots(&self.registry, &snapshot)
    }

    pub fn page_types(&self) -> Result<CmdResult> {
        commands::render::page_types(&self.config.site)
    }

    pub fn formatting_tags(&mut self) -> Result<CmdResult> {
        let snapshot = self.snapshot()?;
        commands::render::formatting_tags(&self.registry, &snapshot)
    }
}
