//! HTTP plumbing shared by the cart and wishlist endpoints.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

use shopsync_core::Uid;

use super::ApiError;
use crate::config::ApiConfig;

/// Maximum number of response body characters kept in errors and logs.
const BODY_SNIPPET_CHARS: usize = 200;

/// REST client for the cart/wishlist backend.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| ApiError::Validation(format!("Invalid API token format: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Build `{base_url}/{segments...}`, optionally with `?user_id=`.
    ///
    /// Segments are percent-encoded individually.
    pub(super) fn url(&self, segments: &[&str], user_id: Option<&Uid>) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Validation("base URL cannot have path segments".to_string()))?
            .pop_if_empty()
            .extend(segments);
        if let Some(user_id) = user_id {
            url.query_pairs_mut().append_pair("user_id", user_id.as_str());
        }
        Ok(url)
    }

    pub(super) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.inner.client.request(method, url)
    }

    /// Send a request and decode a JSON body.
    pub(super) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %snippet(&body),
                "Failed to parse backend response"
            );
            ApiError::Parse(e.to_string())
        })
    }

    /// Send a request, discarding any body.
    pub(super) async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).await.map(drop)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let body = response.text().await?;

        debug!(%status, %url, "Backend responded");

        if status.is_success() {
            return Ok(body);
        }

        let message = snippet(&body);
        match status {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(url.path().to_string())),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(ApiError::Validation(message))
            }
            _ => {
                error!(
                    status = %status,
                    body = %message,
                    "Backend returned non-success status"
                );
                Err(ApiError::HttpStatus {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}
