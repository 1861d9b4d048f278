//! Background removal client
//!
//! The orchestrator talks to the remote removal capability through the
//! [`BackgroundRemover`] trait. [`HttpBackgroundRemover`] is the production
//! implementation: it uploads the picked image to an HTTP endpoint and returns
//! the cutout as a base64 payload.
//!
//! Wire format:
//!
//! ```text
//! POST <endpoint>
//! Accept: application/json
//! X-Api-Key: <key>            (optional, header name configurable)
//!
//! {"image_file_b64": "...", "size": "auto", "format": "png"}
//! ```
//!
//! Remote references (`http(s)://`) are forwarded as `image_url` instead of
//! being uploaded. The service may answer with JSON
//! (`{"data": {"result_b64": "..."}}`, or a top-level `result_b64`/`image`)
//! or with a raw `image/*` body.
//!
//! No timeout or retry is applied here; that policy belongs to the caller.

use crate::{
    config::RemovalClientConfig,
    error::{CutoutError, Result},
    tracing_config::spans,
    types::{CutoutPayload, ImageReference, RemovalOutcome},
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

/// Longest error body kept in `CutoutError::Remote`
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Remote background removal capability
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Remove the background from `image`
    ///
    /// # Returns
    /// `RemovalOutcome::Empty` when the service answered without an image.
    ///
    /// # Errors
    /// - The image cannot be read
    /// - Transport failure or non-success response
    async fn remove_background(&self, image: &ImageReference) -> Result<RemovalOutcome>;
}

#[derive(Debug, Serialize)]
struct RemovalRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_file_b64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    size: &'a str,
    format: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct RemovalResponse {
    #[serde(default)]
    data: Option<RemovalData>,
    #[serde(default)]
    result_b64: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RemovalData {
    #[serde(default)]
    result_b64: Option<String>,
}

impl RemovalResponse {
    fn into_payload(self) -> Option<CutoutPayload> {
        self.data
            .and_then(|d| d.result_b64)
            .or(self.result_b64)
            .or(self.image)
            .map(CutoutPayload::new)
    }
}

/// HTTP client for a remote removal service
#[derive(Debug, Clone)]
pub struct HttpBackgroundRemover {
    client: Client,
    config: RemovalClientConfig,
}

impl HttpBackgroundRemover {
    /// Create a new removal client
    ///
    /// # Errors
    /// - Invalid endpoint configuration
    /// - Failed to create HTTP client
    pub fn new(config: RemovalClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CutoutError::network_error("Failed to create HTTP client", e))?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    async fn build_request<'a>(&self, image: &'a ImageReference) -> Result<RemovalRequest<'a>> {
        if image.is_remote() {
            return Ok(RemovalRequest {
                image_file_b64: None,
                image_url: Some(image.as_str()),
                size: "auto",
                format: "png",
            });
        }

        let path = image.to_local_path().ok_or_else(|| {
            CutoutError::invalid_config(format!("Cannot read image reference: {}", image))
        })?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CutoutError::file_io_error("read image for upload", &path, &e))?;

        Ok(RemovalRequest {
            image_file_b64: Some(general_purpose::STANDARD.encode(&bytes)),
            image_url: None,
            size: "auto",
            format: "png",
        })
    }
}

#[async_trait]
impl BackgroundRemover for HttpBackgroundRemover {
    async fn remove_background(&self, image: &ImageReference) -> Result<RemovalOutcome> {
        let span = spans::removal_request(&self.config.endpoint, image.as_str());
        self.request_cutout(image).instrument(span).await
    }
}

impl HttpBackgroundRemover {
    async fn request_cutout(&self, image: &ImageReference) -> Result<RemovalOutcome> {
        let body = self.build_request(image).await?;

        tracing::debug!("Requesting background removal");

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header(header::ACCEPT, "application/json")
            .json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.header(self.config.api_key_header.as_str(), key);
        }

        let response = request.send().await.map_err(|e| {
            CutoutError::network_error(format!("Failed to reach {}", self.config.endpoint), e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(remote_error(status, &text));
        }

        let is_image_body = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("image/"));

        let payload = if is_image_body {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| CutoutError::network_error("Failed to read cutout body", e))?;
            Some(CutoutPayload::from_bytes(&bytes))
        } else {
            let text = response
                .text()
                .await
                .map_err(|e| CutoutError::network_error("Failed to read cutout body", e))?;
            parse_json_payload(&text)?
        };

        let outcome = payload.map_or(RemovalOutcome::Empty, RemovalOutcome::from_payload);
        match &outcome {
            RemovalOutcome::Cutout(p) => {
                tracing::debug!(base64_len = p.as_base64().len(), "Removal service returned a cutout");
            },
            RemovalOutcome::Empty => tracing::warn!("Removal service returned no image"),
        }
        Ok(outcome)
    }
}

fn parse_json_payload(text: &str) -> Result<Option<CutoutPayload>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let parsed: RemovalResponse = serde_json::from_str(text)
        .map_err(|e| CutoutError::decode(format!("Unexpected removal response: {}", e)))?;
    Ok(parsed.into_payload())
}

fn remote_error(status: StatusCode, body: &str) -> CutoutError {
    let mut message: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
    if message.is_empty() {
        message = status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }
    CutoutError::Remote {
        status: status.as_u16(),
        message,
    }
}
