use crate::model::PostId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdLayersError {
    #[error("Ad layer not found: {0}")]
    LayerNotFound(PostId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Api Error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, AdLayersError>;
