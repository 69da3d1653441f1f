use std::collections::HashSet;
use std::sync::Mutex;

use crate::types::{ItemStatus, ListEntry, PersistedRecipe, QueueItem, RecipeDraft, RecipeRef};

/// Terminal success payload applied when an item finishes its pipeline.
#[derive(Debug, Clone)]
pub struct DoneOutcome {
    /// Canonical id assigned by the persistence layer. Replaces the
    /// item's temporary id in the `record` field.
    pub record_id: String,
    /// Extracted title, replacing the provisional one.
    pub title: String,
    pub draft: RecipeDraft,
    pub preview_url: Option<String>,
    /// Set when the collection-link second phase failed after its retry.
    pub link_error: Option<String>,
}

/// In-memory queue state store for ingestion items.
///
/// Holds the authoritative, UI-facing collection of [`QueueItem`]s.
/// Items are registered in submission order and progress independently;
/// each mutation is a discrete lock-scoped update, so concurrently
/// resolving pipelines never interleave partial writes. `Done` and
/// `Error` are terminal: updates against a terminal item are no-ops.
pub struct IngestQueue {
    items: Mutex<Vec<QueueItem>>,
}

impl Default for IngestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Register a freshly submitted item. Items appear in submission order.
    pub fn register(&self, item: QueueItem) -> anyhow::Result<()> {
        let mut items = self.items.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
        items.push(item);
        Ok(())
    }

    /// Record the progressively available preview image for an in-flight
    /// item. Ignored once the item is terminal.
    pub fn set_preview(&self, id: &str, preview_url: &str) -> anyhow::Result<()> {
        let mut items = self.items.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
        if let Some(item) = items.iter_mut().find(|i| i.id == id) {
            if item.status == ItemStatus::Processing {
                item.preview_url = Some(preview_url.to_string());
            }
        }
        Ok(())
    }

    /// Transition an item `Processing → Done`, rekeying it to the
    /// persisted record. No-op if the item is unknown or already terminal.
    pub fn mark_done(&self, id: &str, outcome: DoneOutcome) -> anyhow::Result<()> {
        let mut items = self.items.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
        if let Some(item) = items.iter_mut().find(|i| i.id == id) {
            if item.status != ItemStatus::Processing {
                return Ok(());
            }
            item.status = ItemStatus::Done;
            item.record = RecipeRef::Persisted {
                record_id: outcome.record_id,
            };
            item.title = outcome.title;
            item.draft = Some(outcome.draft);
            if outcome.preview_url.is_some() {
                item.preview_url = outcome.preview_url;
            }
            item.link_error = outcome.link_error;
            item.error = None;
        }
        Ok(())
    }

    /// Transition an item `Processing → Error` with a human-readable
    /// message. No-op if the item is unknown or already terminal.
    pub fn mark_error(&self, id: &str, message: &str) -> anyhow::Result<()> {
        let mut items = self.items.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
        if let Some(item) = items.iter_mut().find(|i| i.id == id) {
            if item.status != ItemStatus::Processing {
                return Ok(());
            }
            item.status = ItemStatus::Error;
            item.error = Some(message.to_string());
        }
        Ok(())
    }

    /// Remove an item by id (explicit user deletion). Returns whether an
    /// item was removed; removing an unknown id is a harmless no-op.
    ///
    /// Removing an in-flight item does not cancel its network work — the
    /// eventual outcome simply finds no item to update.
    pub fn remove(&self, id: &str) -> anyhow::Result<bool> {
        let mut items = self.items.lock().map_err(|e| anyhow::anyhow!("{}", e))?;
        let before = items.len();
        items.retain(|i| i.id != id);
        Ok(items.len() != before)
    }

    /// All items, cloned snapshot, in submission order.
    pub fn list(&self) -> Vec<QueueItem> {
        self.items.lock().map(|i| i.clone()).unwrap_or_default()
    }

    /// A specific item by id.
    pub fn get(&self, id: &str) -> Option<QueueItem> {
        self.items
            .lock()
            .ok()?
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    /// Number of items still in flight.
    pub fn processing_count(&self) -> usize {
        self.items
            .lock()
            .map(|items| {
                items
                    .iter()
                    .filter(|i| i.status == ItemStatus::Processing)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Unified list view: server-persisted records first, then live queue
    /// items. A `Done` item whose record already appears in the persisted
    /// list is skipped — it has been merged into the server copy.
    pub fn merge_with_persisted(&self, persisted: &[PersistedRecipe]) -> Vec<ListEntry> {
        let known: HashSet<&str> = persisted.iter().map(|r| r.id.as_str()).collect();

        let mut entries: Vec<ListEntry> = persisted
            .iter()
            .map(|r| ListEntry {
                recipe: RecipeRef::Persisted {
                    record_id: r.id.clone(),
                },
                title: r.title.clone(),
                status: ItemStatus::Done,
                preview_url: r.image_url.clone(),
                error: None,
            })
            .collect();

        for item in self.list() {
            if let RecipeRef::Persisted { record_id } = &item.record {
                if known.contains(record_id.as_str()) {
                    continue;
                }
            }
            entries.push(ListEntry {
                recipe: item.record.clone(),
                title: item.title.clone(),
                status: item.status.clone(),
                preview_url: item.preview_url.clone(),
                error: item.error.clone(),
            });
        }
        entries
    }
}
