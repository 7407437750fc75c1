use super::{GatewayError, NotificationGateway};
use crate::model::{NotificationId, RecentNotifications, UnreadCount};
use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Upper bound on any response body. A page of notifications is a few KB.
const MAX_RESPONSE_SIZE: usize = 1024 * 1024; // 1MB

/// Responses may come bare or wrapped in the `{ success, data }` envelope
/// used by the platform's Express handlers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

/// [`NotificationGateway`] over the platform's REST API.
///
/// Endpoints are resolved relative to `base_url`:
/// - `GET  notifications/unread-count`
/// - `GET  notifications?limit=N`
/// - `PUT  notifications/{id}/read`
/// - `PUT  notifications/read-all`
///
/// The gateway never retries; the scheduler's next tick is the retry.
pub struct HttpGateway {
    client: reqwest::Client,
    base: Url,
    token: Option<SecretString>,
}

impl HttpGateway {
    /// Build a gateway for `base_url`.
    ///
    /// Rejects non-HTTPS base URLs unless they point at localhost, so the
    /// bearer token is never sent in clear text to a remote host.
    pub fn new(
        base_url: &str,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let base = Url::parse(base_url).map_err(|e| GatewayError::Parse(e.to_string()))?;

        match base.scheme() {
            "https" => {}
            "http" => {
                let is_localhost = matches!(base.host_str(), Some("localhost" | "127.0.0.1"));
                if !is_localhost {
                    tracing::error!(base_url = %base, "Rejecting non-HTTPS base URL (HTTPS required except for localhost)");
                    return Err(GatewayError::InsecureBaseUrl);
                }
                tracing::warn!(base_url = %base, "Using non-HTTPS notification API (localhost only)");
            }
            _ => return Err(GatewayError::InsecureBaseUrl),
        }
        if base.cannot_be_a_base() {
            return Err(GatewayError::Parse(format!("not a base URL: {}", base)));
        }

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base,
            token,
        })
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in new(), so this always succeeds
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => {
                tracing::trace!("Notification API authentication configured");
                request.bearer_auth(token.expose_secret())
            }
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(status.as_u16()));
        }

        read_limited_bytes(response, MAX_RESPONSE_SIZE).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, GatewayError> {
        tracing::debug!(url = %url, "GET");
        let body = self.send(self.client.get(url)).await?;
        decode(&body)
    }
}

#[async_trait]
impl NotificationGateway for HttpGateway {
    async fn fetch_unread_count(&self) -> Result<u64, GatewayError> {
        let url = self.endpoint(&["notifications", "unread-count"]);
        let UnreadCount { count } = self.get_json(url).await?;
        Ok(count)
    }

    async fn fetch_recent(&self, limit: usize) -> Result<RecentNotifications, GatewayError> {
        let mut url = self.endpoint(&["notifications"]);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.get_json(url).await
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<(), GatewayError> {
        let url = self.endpoint(&["notifications", id.as_str(), "read"]);
        tracing::debug!(url = %url, "PUT");
        self.send(self.client.put(url)).await.map(|_| ())
    }

    async fn mark_all_read(&self) -> Result<(), GatewayError> {
        let url = self.endpoint(&["notifications", "read-all"]);
        tracing::debug!(url = %url, "PUT");
        self.send(self.client.put(url)).await.map(|_| ())
    }
}

fn map_transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Network(err.to_string())
    }
}

fn map_status(status: u16) -> GatewayError {
    match status {
        401 | 403 => GatewayError::Auth,
        404 => GatewayError::NotFound,
        other => GatewayError::Server(other),
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice::<Envelope<T>>(body)
        .map(Envelope::into_inner)
        .map_err(|e| GatewayError::Parse(e.to_string()))
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, GatewayError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(GatewayError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_transport_error)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(GatewayError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
