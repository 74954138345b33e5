use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use taskdeck_session::SessionContext;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};
use url::Url;

use crate::error::{ApiError, ApiResult, ClientBuildError, Operation, extract_detail};
use crate::events::ClientEvent;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

const EVENT_CAPACITY: usize = 16;

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: String,
    timeout: Option<Duration>,
}

impl Default for ApiClientBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ApiClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
        }
    }

    /// Per-request timeout. Without one the transport default applies.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self, session: Arc<SessionContext>) -> Result<ApiClient, ClientBuildError> {
        let base_url = Url::parse(self.base_url.trim())?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ClientBuildError::UnsupportedUrl(self.base_url));
        }

        let mut client_builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        let http = client_builder.build()?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(ApiClient {
            http,
            base_url,
            session,
            events,
        })
    }
}

/// The single configured HTTP client used for every backend call.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionContext>,
    events: broadcast::Sender<ClientEvent>,
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Receive [`ClientEvent`]s raised from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        segments: &[&str],
    ) -> ApiResult<T> {
        let response = self
            .execute::<()>(operation, Method::GET, segments, None)
            .await?;
        decode(operation, response).await
    }

    pub(crate) async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: Operation,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> ApiResult<T> {
        let response = self.execute(operation, method, segments, Some(body)).await?;
        decode(operation, response).await
    }

    pub(crate) async fn send_empty(
        &self,
        operation: Operation,
        method: Method,
        segments: &[&str],
    ) -> ApiResult<()> {
        self.execute::<()>(operation, method, segments, None).await?;
        Ok(())
    }

    /// Send one request through both interceptors. Non-success statuses come
    /// back as errors after the inbound interceptor has run.
    async fn execute<B: Serialize + ?Sized>(
        &self,
        operation: Operation,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> ApiResult<Response> {
        let url = self.endpoint(segments);
        let mut request = self.http.request(method.clone(), url.clone());

        if is_credential_endpoint(segments) {
            debug!(%method, %url, "Sending request without credentials");
        } else if let Some(token) = self.session.token().await {
            request = request.bearer_auth(token);
            debug!(%method, %url, "Sending authenticated request");
        } else {
            debug!(%method, %url, "Sending request without a session");
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(operation, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = extract_detail(&body);
        self.intercept_failure(status, detail.as_deref()).await;

        Err(ApiError::from_status(operation, status.as_u16(), detail))
    }

    async fn intercept_failure(&self, status: StatusCode, detail: Option<&str>) {
        match status {
            StatusCode::UNAUTHORIZED => {
                warn!("Received 401, clearing session");
                if let Err(e) = self.session.logout().await {
                    error!("Failed to clear session after 401: {}", e);
                }
                // Nobody listening is not an error.
                let _ = self.events.send(ClientEvent::SessionExpired);
            }
            StatusCode::FORBIDDEN => {
                warn!("Access forbidden: {}", detail.unwrap_or("no detail"));
                let _ = self.events.send(ClientEvent::AccessForbidden {
                    detail: detail.map(str::to_string),
                });
            }
            _ => {}
        }
    }
}

async fn decode<T: DeserializeOwned>(operation: Operation, response: Response) -> ApiResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::decode(operation, e))
}

/// Register and login exchange credentials for a token and never carry one.
/// `auth/me` is the profile lookup and needs the bearer token like any
/// other resource.
pub(crate) fn is_credential_endpoint(segments: &[&str]) -> bool {
    match segments {
        ["auth", "me"] => false,
        ["auth", ..] => true,
        _ => false,
    }
}
