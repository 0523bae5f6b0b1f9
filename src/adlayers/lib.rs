//! # Ad Layers Architecture
//!
//! Ad layers manages **prioritized sets of ad units** ("layers") for a publishing
//! site and turns them into ad server tags for each page request. It is a library
//! that happens to have a CLI client: the same core can sit behind a site's
//! rendering hooks, an admin screen or the terminal.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Loads a settings/layers snapshot for rendering           │
//! │  - Returns structured Result types                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Layer posts and priority, settings, import/export        │
//! │  - Rendering for one request through the active ad server   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Rendering core                                             │
//! │  resolver → context → paths/targeting/template → server/    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - Abstract SiteStore trait: options and layer posts        │
//! │  - FileStore (production), InMemoryStore (testing)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rendering a Request
//!
//! A [`request::Request`] describes the queried object of a page view. The
//! [`resolver`] walks the priority list from the highest priority entry and
//! picks the first published layer whose page types and taxonomy
//! restrictions match; a per-post or per-term override wins over the list.
//! The ad server then builds its header block from the active layer's units,
//! with slot paths from [`paths`] and key/value targeting from [`targeting`].
//! Unit markup is rendered on demand, from the CLI, the [`shortcode`] filter
//! or the [`widget`].
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code takes regular Rust arguments, returns regular
//! Rust types, and never writes to stdout/stderr. Diagnostics go through
//! `tracing`; the binary decides where they end up.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for all operations
//! - [`commands`]: Business logic for each command
//! - [`store`]: Storage abstraction and implementations
//! - [`model`]: Layer posts, priority entries, targeting rules
//! - [`settings`]: Ad server settings and the compiled breakpoint cache
//! - [`request`]: The site description and the queried object
//! - [`page_types`]: Page type catalog and detection
//! - [`resolver`]: Active layer selection
//! - [`context`]: Per-request state over a settings snapshot
//! - [`template`]: Formatting tags (`#domain#`, `#category#`, ...)
//! - [`paths`]: Ad unit path templates and overrides
//! - [`targeting`]: Custom targeting values
//! - [`server`]: The ad server abstraction, DFP and debug servers
//! - [`shortcode`]: The `[ad-unit]` content shortcode
//! - [`widget`]: The ad unit widget
//! - [`config`]: Configuration management
//! - [`error`]: Error types
//! - `cli`: Argument parsing and printing for the binary (not part of the lib API)

pub mod api;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod lenient;
pub mod model;
pub mod page_types;
pub mod paths;
pub mod request;
pub mod resolver;
pub mod server;
pub mod settings;
pub mod shortcode;
pub mod store;
pub mod targeting;
pub mod template;
pub mod widget;
