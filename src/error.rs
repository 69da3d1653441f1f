use thiserror::Error;

/// Failure taxonomy for the ingestion pipeline.
///
/// Every variant corresponds to one pipeline stage boundary; the pipeline
/// converts all of them into a queue item's terminal `Error` status with
/// the rendered message, so nothing propagates past the queue.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Storage upload failed: {0}")]
    Storage(String),

    #[error("Could not retrieve page content: {0}")]
    Retrieval(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("No recipe found in source")]
    NoRecipeFound,

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
