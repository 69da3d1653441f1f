use reqwest::Client;
use serde_json::{json, Value};

use crate::error::{IngestError, Result};

/// Configuration for the durable object storage service.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage API base (e.g. "https://project.example.co/storage/v1").
    pub endpoint: String,
    pub bucket: String,
    pub api_key: String,
    /// Lifetime of the signed URL handed to the extraction service,
    /// which cannot authenticate against the storage layer itself.
    pub signed_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:54321/storage/v1".to_string(),
            bucket: "recipe-images".to_string(),
            api_key: String::new(),
            signed_ttl_secs: 600,
        }
    }
}

impl StorageConfig {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn signed_ttl_secs(mut self, secs: u64) -> Self {
        self.signed_ttl_secs = secs;
        self
    }
}

/// Addressable forms of one stored image: the long-lived public URL for
/// display, and the short-lived signed URL for the extraction service.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub object_path: String,
    pub public_url: String,
    pub signed_url: String,
}

/// Durably store an image file, returning its public/signed URL pair.
///
/// Two calls: upload the bytes, then request a signed URL for the same
/// object. Either failing is an acquisition failure — the item errors
/// before extraction is attempted.
pub async fn upload_image(
    client: &Client,
    config: &StorageConfig,
    user_id: &str,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<StoredImage> {
    let endpoint = config.endpoint.trim_end_matches('/');
    let object_path = format!(
        "{}/{}/{}-{}",
        config.bucket,
        user_id,
        uuid::Uuid::new_v4(),
        sanitize_file_name(file_name)
    );

    let upload_url = format!("{}/object/{}", endpoint, object_path);
    let resp = authed(client.post(&upload_url), config)
        .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
        .body(bytes)
        .send()
        .await
        .map_err(|e| IngestError::Storage(format!("{}: {}", upload_url, e)))?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        return Err(IngestError::Storage(format!(
            "upload returned HTTP {}: {}",
            status, text
        )));
    }

    let sign_url = format!("{}/object/sign/{}", endpoint, object_path);
    let resp = authed(client.post(&sign_url), config)
        .json(&json!({ "expiresIn": config.signed_ttl_secs }))
        .send()
        .await
        .map_err(|e| IngestError::Storage(format!("{}: {}", sign_url, e)))?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        return Err(IngestError::Storage(format!(
            "sign returned HTTP {}: {}",
            status, text
        )));
    }

    let payload: Value = resp
        .json()
        .await
        .map_err(|e| IngestError::Storage(format!("sign returned unusable payload: {}", e)))?;
    let signed_path = payload
        .get("signedURL")
        .and_then(Value::as_str)
        .ok_or_else(|| IngestError::Storage("sign response missing signedURL".to_string()))?;

    let signed_url = if signed_path.starts_with("http") {
        signed_path.to_string()
    } else {
        format!("{}{}", endpoint, signed_path)
    };

    Ok(StoredImage {
        public_url: format!("{}/object/public/{}", endpoint, object_path),
        signed_url,
        object_path,
    })
}

fn authed(builder: reqwest::RequestBuilder, config: &StorageConfig) -> reqwest::RequestBuilder {
    if config.api_key.is_empty() {
        builder
    } else {
        builder
            .header("apikey", &config.api_key)
            .bearer_auth(&config.api_key)
    }
}

/// Object keys must be URL-safe; anything else becomes a dash.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_chars() {
        assert_eq!(sanitize_file_name("tomato_soup.jpg"), "tomato_soup.jpg");
        assert_eq!(sanitize_file_name("my soup (2).png"), "my-soup--2-.png");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}
