use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::{json, Value};

use crate::error::{IngestError, Result};
use crate::types::{RecipeDraft, UsageStats};

/// Configuration for the AI extraction service.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Extraction function base (e.g. "https://project.example.co/functions/v1").
    pub endpoint: String,
    /// Model identifier, recorded as the usage source on AI-extracted drafts.
    pub model: String,
    pub api_key: String,
    /// Request timeout (default: 120s — vision extraction is slow).
    pub timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:54321/functions/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl ExtractorConfig {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Outcome of a successful extraction: the structured draft plus
/// usage/cost accounting.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub draft: RecipeDraft,
    pub usage: UsageStats,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireUsage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Extract structured recipe fields from a stored image.
///
/// The service expects a fetchable image reference, not raw bytes — the
/// caller must have stored the file first and hand over the signed URL.
pub async fn extract_from_image(
    client: &Client,
    config: &ExtractorConfig,
    image_url: &str,
) -> Result<Extraction> {
    call_extractor(
        client,
        config,
        json!({ "model": config.model, "imageUrl": image_url }),
    )
    .await
}

/// Extract structured recipe fields from flattened page text.
pub async fn extract_from_text(
    client: &Client,
    config: &ExtractorConfig,
    text: &str,
) -> Result<Extraction> {
    call_extractor(
        client,
        config,
        json!({ "model": config.model, "text": text }),
    )
    .await
}

async fn call_extractor(client: &Client, config: &ExtractorConfig, body: Value) -> Result<Extraction> {
    let url = format!("{}/extract", config.endpoint.trim_end_matches('/'));
    let started = Instant::now();

    let mut request = client.post(&url).timeout(config.timeout).json(&body);
    if !config.api_key.is_empty() {
        request = request.bearer_auth(&config.api_key);
    }

    let resp = request
        .send()
        .await
        .map_err(|e| IngestError::Extraction(format!("cannot reach extractor at {}: {}", url, e)))?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        return Err(IngestError::Extraction(format!(
            "extractor returned HTTP {}: {}",
            status, text
        )));
    }

    let payload: Value = resp
        .json()
        .await
        .map_err(|e| IngestError::Extraction(format!("extractor returned unusable payload: {}", e)))?;
    let draft = draft_from_payload(&payload)?;
    if draft.title.trim().is_empty() {
        return Err(IngestError::NoRecipeFound);
    }

    let usage = payload
        .get("usage")
        .and_then(|v| serde_json::from_value::<WireUsage>(v.clone()).ok())
        .unwrap_or_default();

    Ok(Extraction {
        draft,
        usage: UsageStats {
            source: config.model.clone(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            duration_ms: started.elapsed().as_millis() as u64,
        },
    })
}

/// The service returns `recipe` either as a structured object or as the
/// raw model text, depending on how well the model followed the format.
fn draft_from_payload(payload: &Value) -> Result<RecipeDraft> {
    match payload.get("recipe") {
        Some(value @ Value::Object(_)) => Ok(serde_json::from_value(value.clone())?),
        Some(Value::String(raw)) => parse_draft(raw),
        _ => Err(IngestError::Extraction(
            "extractor response carried no recipe payload".to_string(),
        )),
    }
}

/// Parse raw model output as a [`RecipeDraft`], with defensive JSON
/// extraction: direct parse, then markdown code block, then first-brace
/// scan.
fn parse_draft(text: &str) -> Result<RecipeDraft> {
    let trimmed = text.trim();

    if let Ok(draft) = serde_json::from_str::<RecipeDraft>(trimmed) {
        return Ok(draft);
    }

    if let Some(block) = extract_json_block(trimmed) {
        if let Ok(draft) = serde_json::from_str::<RecipeDraft>(&block) {
            return Ok(draft);
        }
    }

    if let Some(idx) = trimmed.find('{') {
        let candidate = &trimmed[idx..];
        if let Ok(draft) = serde_json::from_str::<RecipeDraft>(candidate) {
            return Ok(draft);
        }
        if let Some(end) = candidate.rfind('}') {
            if let Ok(draft) = serde_json::from_str::<RecipeDraft>(&candidate[..=end]) {
                return Ok(draft);
            }
        }
    }

    Err(IngestError::Extraction(format!(
        "unparseable model output: {}",
        trimmed.chars().take(200).collect::<String>()
    )))
}

/// Extract JSON from ```json ... ``` code blocks.
fn extract_json_block(text: &str) -> Option<String> {
    let markers = ["```json", "```JSON", "```"];
    for marker in markers {
        if let Some(start) = text.find(marker) {
            let content_start = start + marker.len();
            if let Some(end) = text[content_start..].find("```") {
                return Some(text[content_start..content_start + end].trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_draft_direct_json() {
        let draft = parse_draft(r#"{"title": "Tomato Soup", "servings": 4}"#).unwrap();
        assert_eq!(draft.title, "Tomato Soup");
        assert_eq!(draft.servings, Some(4));
    }

    #[test]
    fn parse_draft_markdown_block() {
        let text = "Here is the recipe:\n```json\n{\"title\": \"Stew\"}\n```\nEnjoy!";
        let draft = parse_draft(text).unwrap();
        assert_eq!(draft.title, "Stew");
    }

    #[test]
    fn parse_draft_embedded_object() {
        let text = r#"Sure! {"title": "Pie", "ingredients": ["apples"]} hope that helps."#;
        let draft = parse_draft(text).unwrap();
        assert_eq!(draft.title, "Pie");
        assert_eq!(draft.ingredients, vec!["apples"]);
    }

    #[test]
    fn parse_draft_prose_fails() {
        assert!(parse_draft("I could not find a recipe in this image.").is_err());
    }

    #[test]
    fn payload_object_form() {
        let payload = serde_json::json!({"recipe": {"title": "Soup"}});
        let draft = draft_from_payload(&payload).unwrap();
        assert_eq!(draft.title, "Soup");
    }

    #[test]
    fn payload_string_form() {
        let payload = serde_json::json!({"recipe": "{\"title\": \"Soup\"}"});
        let draft = draft_from_payload(&payload).unwrap();
        assert_eq!(draft.title, "Soup");
    }

    #[test]
    fn payload_missing_recipe_fails() {
        let payload = serde_json::json!({"usage": {}});
        assert!(draft_from_payload(&payload).is_err());
    }

    #[test]
    fn wire_usage_tolerates_missing_fields() {
        let usage: WireUsage = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(usage.input_tokens, 0);
        let usage: WireUsage =
            serde_json::from_value(serde_json::json!({"inputTokens": 12, "outputTokens": 3}))
                .unwrap();
        assert_eq!(usage.input_tokens, 12);
        assert_eq!(usage.output_tokens, 3);
    }
}
