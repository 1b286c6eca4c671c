//! Model listing, relayed from the upstream untouched.

use crate::config::UpstreamSettings;
use crate::error::{GatewayError, Result};
use crate::proxy::RouteKind;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

/// An upstream answer passed back as-is.
#[derive(Debug, Clone)]
pub struct RelayedResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,
}

/// Fetch `{base}{prefix}/models` with the gateway's upstream credential.
///
/// # Errors
/// Fails only if the credential is missing or the upstream cannot be reached; an
/// upstream error status is relayed like any other answer.
pub async fn relay_models(
    route: RouteKind,
    upstream: &UpstreamSettings,
    client: &reqwest::Client,
) -> Result<RelayedResponse> {
    let api_key = upstream.require_api_key()?;
    let url = upstream.url(route, "/models");

    tracing::info!(url = %url, "GET upstream models");

    let response = client
        .get(&url)
        .header(AUTHORIZATION, format!("Bearer {api_key}"))
        .send()
        .await
        .map_err(|e| GatewayError::other(format!("Failed to fetch models: {e}")))?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string();
    let body = response
        .bytes()
        .await
        .map_err(|e| GatewayError::other(format!("Failed to read models response: {e}")))?;

    Ok(RelayedResponse {
        status,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_relay_models_passes_body_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/code/v1/models"))
            .and(header("authorization", "Bearer sk-up"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(br#"{"data":[{"id":"claude"}]}"#.to_vec(), "application/json"),
            )
            .mount(&server)
            .await;

        let upstream = UpstreamSettings {
            base_url: server.uri(),
            api_key: Some("sk-up".to_string()),
            api_key_env: "CLEWDR_API_KEY".to_string(),
            anthropic_version: "2023-06-01".to_string(),
        };

        let relayed = relay_models(RouteKind::Code, &upstream, &reqwest::Client::new())
            .await
            .unwrap();
        assert_eq!(relayed.status, 200);
        assert_eq!(relayed.content_type, "application/json");
        assert_eq!(&relayed.body[..], br#"{"data":[{"id":"claude"}]}"#);
    }
}
