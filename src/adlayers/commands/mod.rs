use crate::model::{AdLayer, LayerRef};
use crate::settings::{AdServerSettings, CompiledBreakpoint};
use std::path::PathBuf;

pub mod export;
pub mod import;
pub mod layers;
pub mod render;
pub mod settings;
pub mod variables;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// A layer as listed, with its 1-based priority when it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedLayer {
    pub priority: Option<usize>,
    pub layer: AdLayer,
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub affected_layers: Vec<AdLayer>,
    pub listed_layers: Vec<ListedLayer>,
    pub priority: Vec<LayerRef>,
    pub settings: Option<AdServerSettings>,
    pub compiled: Vec<CompiledBreakpoint>,
    pub custom_variables: Vec<String>,
    /// Rendered markup or a serialized document.
    pub output: Option<String>,
    pub written_paths: Vec<PathBuf>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_affected_layers(mut self, layers: Vec<AdLayer>) -> Self {
        self.affected_layers = layers;
        self
    }

    pub fn with_listed_layers(mut self, layers: Vec<ListedLayer>) -> Self {
        self.listed_layers = layers;
        self
    }

    pub fn with_priority(mut self, priority: Vec<LayerRef>) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_settings(mut self, settings: AdServerSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_compiled(mut self, compiled: Vec<CompiledBreakpoint>) -> Self {
        self.compiled = compiled;
        self
    }

    pub fn with_custom_variables(mut self, variables: Vec<String>) -> Self {
        self.custom_variables = variables;
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_written_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.written_paths = paths;
        self
    }

    /// Whether any message is an error.
    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|message| message.level == MessageLevel::Error)
    }
}
