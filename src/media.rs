//! Resolve image references into the inline base64 form the upstream requires.
//!
//! Two inputs are accepted: `data:<media-type>;base64,<payload>` URIs, which are split
//! without touching the network, and anything else, which is fetched over HTTP. The
//! fetched URL is not vetted; callers decide what they point us at.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};

use crate::error::{GatewayError, Result};

const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub media_type: String,
    /// Base64 payload, standard alphabet with padding.
    pub data: String,
}

/// Fetches or decodes image references. Cheap to clone; shares the HTTP client.
#[derive(Debug, Clone)]
pub struct MediaResolver {
    client: reqwest::Client,
    timeout: Duration,
    user_agent: String,
}

impl MediaResolver {
    pub fn new(client: reqwest::Client, timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            timeout,
            user_agent: user_agent.into(),
        }
    }

    pub async fn resolve(&self, url: &str) -> Result<ResolvedImage> {
        if is_data_url(url) {
            return parse_data_url(url);
        }
        self.fetch(url).await
    }

    async fn fetch(&self, url: &str) -> Result<ResolvedImage> {
        tracing::debug!(url, "Fetching image");

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "image/*")
            .send()
            .await
            .map_err(|e| GatewayError::media_fetch(format!("Failed to fetch image: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::media_fetch(format!(
                "Failed to fetch image: {}",
                status.as_u16()
            )));
        }

        let header_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::media_fetch(format!("Failed to read image body: {e}")))?;

        Ok(ResolvedImage {
            media_type: header_type.unwrap_or_else(|| guess_media_type(url).to_string()),
            data: STANDARD.encode(&body),
        })
    }
}

fn is_data_url(url: &str) -> bool {
    url.get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Split a `data:<media-type>;base64,<payload>` URI. Any other shape, including
/// non-base64 encodings and extra parameters, is rejected.
pub fn parse_data_url(url: &str) -> Result<ResolvedImage> {
    let malformed = || GatewayError::malformed_data_url("Unsupported data URL format");

    if !is_data_url(url) {
        return Err(malformed());
    }
    let (meta, payload) = url[5..].split_once(',').ok_or_else(malformed)?;
    let (media_type, encoding) = meta.split_once(';').ok_or_else(malformed)?;

    if media_type.is_empty() || !encoding.eq_ignore_ascii_case("base64") {
        return Err(malformed());
    }

    Ok(ResolvedImage {
        media_type: media_type.to_string(),
        data: payload.to_string(),
    })
}

/// Media type implied by the URL's file extension; query and fragment are ignored.
#[must_use]
pub fn guess_media_type(url: &str) -> &'static str {
    let path = reqwest::Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());

    if path.ends_with(".png") {
        "image/png"
    } else if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        "image/jpeg"
    } else if path.ends_with(".webp") {
        "image/webp"
    } else if path.ends_with(".gif") {
        "image/gif"
    } else {
        DEFAULT_MEDIA_TYPE
    }
}
