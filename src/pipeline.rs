use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::Result;
use crate::extract::{self, Extraction, ExtractorConfig};
use crate::persist::{self, PersistConfig};
use crate::queue::{DoneOutcome, IngestQueue};
use crate::relay::{self, RelayConfig};
use crate::schema::{self, SCHEMA_MARKUP_SOURCE};
use crate::storage::{self, StorageConfig};
use crate::types::{Provenance, SourceKind, SubmitContext, UsageStats};
use crate::uploader::{self, ImageSource};

/// Top-level configuration for an ingestion pipeline.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Acting user, recorded on stored objects and persisted rows.
    pub user_id: String,
    pub storage: StorageConfig,
    pub extractor: ExtractorConfig,
    pub relay: RelayConfig,
    pub persist: PersistConfig,
}

impl IngestConfig {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            storage: StorageConfig::default(),
            extractor: ExtractorConfig::default(),
            relay: RelayConfig::default(),
            persist: PersistConfig::default(),
        }
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn extractor(mut self, extractor: ExtractorConfig) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn relay(mut self, relay: RelayConfig) -> Self {
        self.relay = relay;
        self
    }

    pub fn persist(mut self, persist: PersistConfig) -> Self {
        self.persist = persist;
        self
    }
}

/// Drives queue items through upload, extraction, and persistence.
///
/// Each submitted source gets its own tokio task; items progress and
/// complete independently, in any order. Every stage failure is caught
/// at the stage boundary and converted into the item's terminal `Error`
/// status with a human-readable message — nothing escapes the queue.
#[derive(Clone)]
pub struct IngestPipeline {
    client: reqwest::Client,
    config: Arc<IngestConfig>,
    queue: Arc<IngestQueue>,
}

impl IngestPipeline {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: Arc::new(config),
            queue: Arc::new(IngestQueue::new()),
        }
    }

    /// The shared queue state store backing this pipeline.
    pub fn queue(&self) -> Arc<IngestQueue> {
        Arc::clone(&self.queue)
    }

    /// Register a batch of image files and start one independent
    /// ingestion task per file. All items are visible in the queue, in
    /// submission order, before this returns.
    pub fn submit_images(
        &self,
        images: Vec<ImageSource>,
        context: SubmitContext,
    ) -> anyhow::Result<Vec<String>> {
        let ids = uploader::register_images(&self.queue, &images, &context)?;

        for (id, image) in ids.clone().into_iter().zip(images) {
            let pipeline = self.clone();
            let context = context.clone();
            tokio::spawn(async move {
                if let Err(err) = pipeline.ingest_image(&id, image, &context).await {
                    let _ = pipeline.queue.mark_error(&id, &err.to_string());
                }
            });
        }
        Ok(ids)
    }

    /// Register a URL source and start its ingestion task.
    pub fn submit_url(&self, url: &str, context: SubmitContext) -> anyhow::Result<String> {
        let url = url.trim().to_string();
        let id = uploader::register_url(&self.queue, &url, &context)?;

        let pipeline = self.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            if let Err(err) = pipeline.ingest_url(&task_id, &url, &context).await {
                let _ = pipeline.queue.mark_error(&task_id, &err.to_string());
            }
        });
        Ok(id)
    }

    async fn ingest_image(&self, id: &str, image: ImageSource, context: &SubmitContext) -> Result<()> {
        debug!(item = id, file = %image.file_name, "starting image ingestion");

        let stored = storage::upload_image(
            &self.client,
            &self.config.storage,
            &self.config.user_id,
            &image.file_name,
            image.bytes,
        )
        .await?;
        let _ = self.queue.set_preview(id, &stored.public_url);

        let extraction =
            extract::extract_from_image(&self.client, &self.config.extractor, &stored.signed_url)
                .await?;

        self.finish(
            id,
            extraction,
            SourceKind::Image,
            stored.public_url.clone(),
            Some(stored.public_url),
            context,
        )
        .await
    }

    async fn ingest_url(&self, id: &str, url: &str, context: &SubmitContext) -> Result<()> {
        debug!(item = id, url, "starting url ingestion");

        let html = relay::fetch_page_html(&self.client, &self.config.relay, url).await?;

        let started = Instant::now();
        let extraction = match schema::extract_recipe_markup(&html) {
            // Embedded markup wins over the AI call: no tokens spent.
            Some(draft) => Extraction {
                draft,
                usage: UsageStats {
                    source: SCHEMA_MARKUP_SOURCE.to_string(),
                    input_tokens: 0,
                    output_tokens: 0,
                    duration_ms: started.elapsed().as_millis() as u64,
                },
            },
            None => {
                let text = schema::page_text(&html);
                extract::extract_from_text(&self.client, &self.config.extractor, &text).await?
            }
        };

        let preview = extraction.draft.image_url.clone();
        self.finish(id, extraction, SourceKind::Url, url.to_string(), preview, context)
            .await
    }

    async fn finish(
        &self,
        id: &str,
        extraction: Extraction,
        source_kind: SourceKind,
        source_ref: String,
        preview_url: Option<String>,
        context: &SubmitContext,
    ) -> Result<()> {
        let provenance = Provenance {
            source_kind,
            source_ref,
            usage: extraction.usage,
        };

        let record = persist::create_recipe(
            &self.client,
            &self.config.persist,
            &self.config.user_id,
            &extraction.draft,
            &provenance,
        )
        .await?;

        let link_error = match &context.collection_id {
            Some(collection_id) => self.link_with_retry(&record.id, collection_id).await,
            None => None,
        };

        debug!(item = id, record = %record.id, "ingestion complete");
        let _ = self.queue.mark_done(
            id,
            DoneOutcome {
                record_id: record.id,
                title: extraction.draft.title.clone(),
                draft: extraction.draft,
                preview_url,
                link_error,
            },
        );
        Ok(())
    }

    /// Second phase of the two-step write. Retried once; a final failure
    /// does not fail the item — the record exists, the membership does
    /// not, and the inconsistency is surfaced on the completed item.
    async fn link_with_retry(&self, recipe_id: &str, collection_id: &str) -> Option<String> {
        let first = persist::create_collection_link(
            &self.client,
            &self.config.persist,
            recipe_id,
            collection_id,
        )
        .await;
        let err = match first {
            Ok(()) => return None,
            Err(err) => err,
        };

        debug!(recipe = recipe_id, error = %err, "collection link write failed, retrying");
        match persist::create_collection_link(
            &self.client,
            &self.config.persist,
            recipe_id,
            collection_id,
        )
        .await
        {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    recipe = recipe_id,
                    collection = collection_id,
                    error = %err,
                    "recipe persisted without collection membership"
                );
                Some(err.to_string())
            }
        }
    }
}
