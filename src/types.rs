use serde::{Deserialize, Serialize};

/// How a queue item was sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    Image,
    Url,
}

/// Lifecycle status of a queue item.
///
/// `Done` and `Error` are terminal — no transition leaves them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemStatus {
    Processing,
    Done,
    Error,
}

/// Identifier for a recipe record.
///
/// A freshly submitted item carries a locally generated id; once
/// persistence commits, the item is rekeyed to the canonical record id.
/// The two are an explicit tagged union so callers never have to sniff
/// id strings to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RecipeRef {
    #[serde(rename_all = "camelCase")]
    Pending { local_id: String },
    #[serde(rename_all = "camelCase")]
    Persisted { record_id: String },
}

impl RecipeRef {
    /// The underlying identifier, whichever side of the union holds it.
    pub fn id(&self) -> &str {
        match self {
            RecipeRef::Pending { local_id } => local_id,
            RecipeRef::Persisted { record_id } => record_id,
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self, RecipeRef::Persisted { .. })
    }
}

/// Structured recipe fields produced by extraction (schema markup or AI).
///
/// All fields default so a sparse model payload still deserializes; the
/// extraction adapter rejects drafts without a usable title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeDraft {
    pub title: String,
    pub description: Option<String>,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub prep_minutes: Option<u32>,
    pub cook_minutes: Option<u32>,
    pub servings: Option<u32>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
}

/// Usage/cost accounting for one extraction.
///
/// `source` names the model that produced the draft, or the schema-path
/// marker when embedded markup made the AI call unnecessary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub source: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
}

/// Association metadata captured at submission time.
///
/// The collection id, if any, is applied only after the item reaches
/// `Done` (the link is written as a second phase after the record commit).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitContext {
    pub collection_id: Option<String>,
}

/// Where a persisted recipe came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub source_kind: SourceKind,
    /// Stored public image URL for image sources, the original page URL
    /// for URL sources.
    pub source_ref: String,
    pub usage: UsageStats,
}

/// The canonical record returned by the persistence layer.
///
/// Field names match the hosted store's column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecipe {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One in-flight or completed ingestion attempt.
///
/// Owned exclusively by the queue state store; all mutations flow through
/// the store's operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// Locally generated id, the queue key for this item. Never reused as
    /// a persisted record id.
    pub id: String,
    pub source_kind: SourceKind,
    pub status: ItemStatus,
    /// Best-known display title: filename/URL-derived at submission,
    /// replaced by the extracted title on success.
    pub title: String,
    /// Populated progressively as upload/extraction proceed.
    pub preview_url: Option<String>,
    pub context: SubmitContext,
    /// Present only when `status` is `Error`.
    pub error: Option<String>,
    /// Populated if and only if the item completed a successful extraction.
    pub draft: Option<RecipeDraft>,
    /// Pending until persistence commits, then the canonical record id.
    pub record: RecipeRef,
    /// Set when the record committed but the collection-link write failed
    /// after its retry. The item is still `Done`; the record exists
    /// without the intended membership.
    pub link_error: Option<String>,
    /// RFC 3339 timestamp of submission.
    pub created_at: String,
}

impl QueueItem {
    /// Build a freshly submitted item in the `Processing` state.
    pub fn new(source_kind: SourceKind, title: impl Into<String>, context: SubmitContext) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        Self {
            record: RecipeRef::Pending {
                local_id: id.clone(),
            },
            id,
            source_kind,
            status: ItemStatus::Processing,
            title: title.into(),
            preview_url: None,
            context,
            error: None,
            draft: None,
            link_error: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One row of a unified recipe list: live queue items merged with records
/// already persisted on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    pub recipe: RecipeRef,
    pub title: String,
    pub status: ItemStatus,
    pub preview_url: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_starts_processing_with_pending_ref() {
        let item = QueueItem::new(SourceKind::Image, "soup", SubmitContext::default());
        assert_eq!(item.status, ItemStatus::Processing);
        assert!(!item.record.is_persisted());
        assert_eq!(item.record.id(), item.id);
        assert!(item.error.is_none());
        assert!(item.draft.is_none());
    }

    #[test]
    fn recipe_ref_serializes_tagged() {
        let pending = RecipeRef::Pending {
            local_id: "tmp-1".to_string(),
        };
        let json = serde_json::to_value(&pending).unwrap();
        assert_eq!(json["kind"], "pending");
        assert_eq!(json["localId"], "tmp-1");

        let persisted = RecipeRef::Persisted {
            record_id: "rec-9".to_string(),
        };
        let json = serde_json::to_value(&persisted).unwrap();
        assert_eq!(json["kind"], "persisted");
        assert_eq!(json["recordId"], "rec-9");
    }

    #[test]
    fn draft_deserializes_sparse_payload() {
        let draft: RecipeDraft = serde_json::from_str(r#"{"title": "Pasta"}"#).unwrap();
        assert_eq!(draft.title, "Pasta");
        assert!(draft.ingredients.is_empty());
        assert!(draft.servings.is_none());

        let empty: RecipeDraft = serde_json::from_str("{}").unwrap();
        assert!(empty.title.is_empty());
    }
}
