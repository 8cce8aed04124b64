use std::io;
use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors that stop a batch. Malformed cells, missing optional sources and
/// missing join keys never surface here; they degrade to defaults and are
/// recorded on the `ReconcileReport` instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("schema drift in '{source_name}': {details}")]
    SchemaDrift { source_name: String, details: String },
    #[error("unsupported source format for '{}'", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Workbook(#[from] calamine::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    pub fn schema_drift(source_name: &str, details: impl Into<String>) -> Self {
        EngineError::SchemaDrift {
            source_name: source_name.to_string(),
            details: details.into(),
        }
    }
}
