//! The single upstream call behind every chat completion.
//!
//! One attempt, fully buffered: the upstream is never asked to stream and failures are
//! surfaced to the caller as-is, never retried.

use crate::config::UpstreamSettings;
use crate::error::{GatewayError, Result};
use crate::media::MediaResolver;
use crate::translate::anthropic_types::{MessagesRequest, MessagesResponse};
use crate::translate::openai_types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::translate::request::openai_to_anthropic;
use crate::translate::response::anthropic_to_openai;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Which upstream path family a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Normal,
    Code,
}

impl RouteKind {
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            RouteKind::Normal => "/v1",
            RouteKind::Code => "/code/v1",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RouteKind::Normal => "normal",
            RouteKind::Code => "code",
        }
    }
}

impl UpstreamSettings {
    /// `{base}{/v1|/code/v1}{suffix}`
    #[must_use]
    pub fn url(&self, route: RouteKind, suffix: &str) -> String {
        format!("{}{}{}", self.base_url, route.prefix(), suffix)
    }

    /// The upstream credential, or the error callers see when it was never configured.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| GatewayError::other(format!("{} not set on server", self.api_key_env)))
    }
}

/// Translate, send, translate back.
pub async fn proxy_chat(
    req: &ChatCompletionRequest,
    route: RouteKind,
    upstream: &UpstreamSettings,
    client: &reqwest::Client,
    media: &MediaResolver,
) -> Result<ChatCompletionResponse> {
    upstream.require_api_key()?;

    let messages_req = openai_to_anthropic(req, media).await?;
    let messages_resp = send_messages(&messages_req, route, upstream, client).await?;

    Ok(anthropic_to_openai(&messages_resp, &req.model))
}

/// POST a Messages API request upstream and parse the reply.
///
/// A non-success status becomes [`GatewayError::Upstream`] carrying the raw body.
pub async fn send_messages(
    req: &MessagesRequest,
    route: RouteKind,
    upstream: &UpstreamSettings,
    client: &reqwest::Client,
) -> Result<MessagesResponse> {
    let api_key = upstream.require_api_key()?;
    let url = upstream.url(route, "/messages");

    tracing::info!(
        url = %url,
        model = %req.model,
        messages = req.messages.len(),
        "POST upstream"
    );

    let response = client
        .post(&url)
        .header(CONTENT_TYPE, "application/json")
        .header("anthropic-version", &upstream.anthropic_version)
        .header(AUTHORIZATION, format!("Bearer {api_key}"))
        .json(req)
        .send()
        .await
        .map_err(|e| GatewayError::other(format!("Upstream request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::other(format!("Failed to read upstream response: {e}")))?;

    tracing::debug!(status = status.as_u16(), body_len = body.len(), "Upstream responded");

    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), body = %truncate(&body, 300), "Upstream error");
        return Err(GatewayError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        GatewayError::other(format!(
            "Failed to parse upstream response: {}. Body: {}",
            e,
            truncate(&body, 300)
        ))
    })
}

/// Whether the upstream base URL answers at all (anything below 500 counts).
pub async fn probe_upstream(upstream: &UpstreamSettings, client: &reqwest::Client) -> bool {
    match client
        .get(&upstream.base_url)
        .timeout(HEALTH_PROBE_TIMEOUT)
        .send()
        .await
    {
        Ok(resp) => {
            let status = resp.status().as_u16();
            (200..500).contains(&status)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Upstream probe failed");
            false
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
