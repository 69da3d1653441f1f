//! # recipe-ingest
//!
//! Batch recipe ingestion queue: turn images and URLs into persisted,
//! structured recipes through an upload → extract → persist pipeline.
//!
//! ## Key Features
//!
//! - **Instant feedback** — every submitted source is registered in the
//!   queue synchronously, before any network work starts
//! - **Independent item pipelines** — each source runs in its own tokio
//!   task; items complete in any order and never block each other
//! - **Schema-markup short-circuit** — pages carrying schema.org Recipe
//!   JSON-LD skip the AI call entirely
//! - **Relay fallback** — cross-origin page fetches go through a primary
//!   relay with a fixed timeout and one fallback provider
//! - **Failure containment** — any stage failure becomes the item's
//!   terminal `Error` status with a readable message; nothing escapes
//!   the queue boundary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recipe_ingest::{ImageSource, IngestConfig, IngestPipeline, SubmitContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = IngestPipeline::new(IngestConfig::new("user-1"));
//!
//!     let bytes = std::fs::read("tomato_soup.jpg")?;
//!     let ids = pipeline.submit_images(
//!         vec![ImageSource::new("tomato_soup.jpg", bytes)],
//!         SubmitContext { collection_id: Some("weeknight".to_string()) },
//!     )?;
//!
//!     // Items are visible immediately; pipelines complete in the background.
//!     for item in pipeline.queue().list() {
//!         println!("{} [{:?}]", item.title, item.status);
//!     }
//!     let _ = ids;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod extract;
pub mod persist;
pub mod pipeline;
pub mod queue;
pub mod relay;
pub mod schema;
pub mod storage;
pub mod types;
pub mod uploader;

pub use error::{IngestError, Result};
pub use extract::{Extraction, ExtractorConfig};
pub use persist::PersistConfig;
pub use pipeline::{IngestConfig, IngestPipeline};
pub use queue::{DoneOutcome, IngestQueue};
pub use relay::RelayConfig;
pub use schema::SCHEMA_MARKUP_SOURCE;
pub use storage::{StorageConfig, StoredImage};
pub use types::{
    ItemStatus, ListEntry, PersistedRecipe, Provenance, QueueItem, RecipeDraft, RecipeRef,
    SourceKind, SubmitContext, UsageStats,
};
pub use uploader::ImageSource;
