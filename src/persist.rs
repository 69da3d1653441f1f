use reqwest::Client;
use serde_json::{json, Value};

use crate::error::{IngestError, Result};
use crate::types::{PersistedRecipe, Provenance, RecipeDraft};

/// Configuration for the hosted record store (PostgREST-style API).
#[derive(Debug, Clone)]
pub struct PersistConfig {
    /// REST base (e.g. "https://project.example.co/rest/v1").
    pub endpoint: String,
    pub api_key: String,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:54321/rest/v1".to_string(),
            api_key: String::new(),
        }
    }
}

impl PersistConfig {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }
}

/// Write a finalized recipe and its child rows, returning the canonical
/// persisted record.
///
/// The recipe row is committed first (atomically, with the provenance
/// columns inline); ingredient and step rows follow as separate inserts
/// keyed by the new record id. Collection membership is not written
/// here — that is the pipeline's explicit second phase.
pub async fn create_recipe(
    client: &Client,
    config: &PersistConfig,
    user_id: &str,
    draft: &RecipeDraft,
    provenance: &Provenance,
) -> Result<PersistedRecipe> {
    let url = table_url(config, "recipes");
    let resp = authed(client.post(&url), config)
        .header("Prefer", "return=representation")
        .json(&recipe_row(user_id, draft, provenance))
        .send()
        .await
        .map_err(|e| IngestError::Persistence(format!("{}: {}", url, e)))?;
    let resp = ensure_success(resp, "recipe insert").await?;

    let rows: Vec<PersistedRecipe> = resp
        .json()
        .await
        .map_err(|e| IngestError::Persistence(format!("recipe insert returned unusable payload: {}", e)))?;
    let recipe = rows
        .into_iter()
        .next()
        .ok_or_else(|| IngestError::Persistence("recipe insert returned no rows".to_string()))?;

    insert_children(client, config, "ingredients", &recipe.id, &draft.ingredients).await?;
    insert_children(client, config, "steps", &recipe.id, &draft.steps).await?;

    Ok(recipe)
}

/// Associate a persisted recipe with a collection. Separate write from
/// the record commit; the caller owns retry and partial-failure policy.
pub async fn create_collection_link(
    client: &Client,
    config: &PersistConfig,
    recipe_id: &str,
    collection_id: &str,
) -> Result<()> {
    let url = table_url(config, "recipe_collections");
    let resp = authed(client.post(&url), config)
        .json(&json!({ "recipe_id": recipe_id, "collection_id": collection_id }))
        .send()
        .await
        .map_err(|e| IngestError::Persistence(format!("{}: {}", url, e)))?;
    ensure_success(resp, "collection link insert").await?;
    Ok(())
}

/// Patch columns on an existing recipe row.
pub async fn update_recipe(
    client: &Client,
    config: &PersistConfig,
    recipe_id: &str,
    fields: &Value,
) -> Result<()> {
    let url = format!("{}?id=eq.{}", table_url(config, "recipes"), recipe_id);
    let resp = authed(client.patch(&url), config)
        .json(fields)
        .send()
        .await
        .map_err(|e| IngestError::Persistence(format!("{}: {}", url, e)))?;
    ensure_success(resp, "recipe update").await?;
    Ok(())
}

/// Delete a recipe row by id. Child rows cascade on the server side.
pub async fn delete_recipe(client: &Client, config: &PersistConfig, recipe_id: &str) -> Result<()> {
    let url = format!("{}?id=eq.{}", table_url(config, "recipes"), recipe_id);
    let resp = authed(client.delete(&url), config)
        .send()
        .await
        .map_err(|e| IngestError::Persistence(format!("{}: {}", url, e)))?;
    ensure_success(resp, "recipe delete").await?;
    Ok(())
}

/// Build the recipe row, provenance columns included.
fn recipe_row(user_id: &str, draft: &RecipeDraft, provenance: &Provenance) -> Value {
    json!({
        "title": draft.title,
        "description": draft.description,
        "prep_minutes": draft.prep_minutes,
        "cook_minutes": draft.cook_minutes,
        "servings": draft.servings,
        "tags": draft.tags,
        "image_url": draft.image_url,
        "user_id": user_id,
        "source_kind": provenance.source_kind,
        "source_ref": provenance.source_ref,
        "extraction_source": provenance.usage.source,
        "extraction_input_tokens": provenance.usage.input_tokens,
        "extraction_output_tokens": provenance.usage.output_tokens,
        "extraction_ms": provenance.usage.duration_ms,
    })
}

async fn insert_children(
    client: &Client,
    config: &PersistConfig,
    table: &str,
    recipe_id: &str,
    rows: &[String],
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let body: Vec<Value> = rows
        .iter()
        .enumerate()
        .map(|(position, text)| {
            json!({ "recipe_id": recipe_id, "position": position as u32, "text": text })
        })
        .collect();

    let url = table_url(config, table);
    let resp = authed(client.post(&url), config)
        .json(&body)
        .send()
        .await
        .map_err(|e| IngestError::Persistence(format!("{}: {}", url, e)))?;
    ensure_success(resp, table).await?;
    Ok(())
}

fn table_url(config: &PersistConfig, table: &str) -> String {
    format!("{}/{}", config.endpoint.trim_end_matches('/'), table)
}

fn authed(builder: reqwest::RequestBuilder, config: &PersistConfig) -> reqwest::RequestBuilder {
    if config.api_key.is_empty() {
        builder
    } else {
        builder
            .header("apikey", &config.api_key)
            .bearer_auth(&config.api_key)
    }
}

async fn ensure_success(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    Err(IngestError::Persistence(format!(
        "{} returned HTTP {}: {}",
        what, status, text
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SourceKind, UsageStats};

    #[test]
    fn recipe_row_carries_provenance_columns() {
        let draft = RecipeDraft {
            title: "Tomato Soup".to_string(),
            servings: Some(4),
            ingredients: vec!["2 tomatoes".to_string()],
            ..Default::default()
        };
        let provenance = Provenance {
            source_kind: SourceKind::Url,
            source_ref: "https://example.com/recipe".to_string(),
            usage: UsageStats {
                source: "schema-markup".to_string(),
                input_tokens: 0,
                output_tokens: 0,
                duration_ms: 3,
            },
        };

        let row = recipe_row("user-1", &draft, &provenance);
        assert_eq!(row["title"], "Tomato Soup");
        assert_eq!(row["servings"], 4);
        assert_eq!(row["user_id"], "user-1");
        assert_eq!(row["source_kind"], "url");
        assert_eq!(row["source_ref"], "https://example.com/recipe");
        assert_eq!(row["extraction_source"], "schema-markup");
        assert_eq!(row["extraction_input_tokens"], 0);
        // Ingredients go to the child table, not the recipe row.
        assert!(row.get("ingredients").is_none());
    }
}
