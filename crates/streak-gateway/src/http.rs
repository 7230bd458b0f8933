//! HTTP gateway backed by reqwest

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;
use tracing::Instrument;
use uuid::Uuid;

use streak_session::TimerSession;

use crate::error::GatewayError;
use crate::gateway::SessionGateway;
use crate::Result;

const HISTORY_PATH: &str = "api/timer/history";
const ACTIVE_PATH: &str = "api/timer/active";
const START_PATH: &str = "api/timer/start";
const END_PATH: &str = "api/timer/end";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Origin (and optional path prefix) of the timer service
    pub base_url: Url,
    /// Cookie header value sent with every request, e.g. `connect.sid=...`
    pub session_cookie: Option<String>,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            session_cookie: None,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    is_abstinence: bool,
}

#[derive(Clone)]
pub struct HttpGateway {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(cookie) = &config.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| GatewayError::Config(format!("session cookie: {e}")))?;
            headers.insert(COOKIE, value);
        }

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self::with_client(config.base_url.clone(), client))
    }

    /// Use a preconfigured client. The caller is responsible for credentials.
    pub fn with_client(base_url: Url, client: reqwest::Client) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            client,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::Config(format!("{path}: {e}")))
    }

    /// Send with a fresh request id. `401` never reaches the caller as a response.
    async fn send(&self, request: RequestBuilder, operation: &'static str) -> Result<Response> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::debug_span!("gateway_request", request_id = %request_id, operation);

        dispatch(request, &request_id).instrument(span).await
    }
}

async fn dispatch(request: RequestBuilder, request_id: &str) -> Result<Response> {
    let response = request
        .header("x-request-id", request_id)
        .send()
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "Request failed");
            GatewayError::Network(e.to_string())
        })?;

    let status = response.status();
    tracing::debug!(status = status.as_u16(), "Gateway response");

    if status == StatusCode::UNAUTHORIZED {
        return Err(GatewayError::AuthExpired);
    }

    Ok(response)
}

#[async_trait]
impl SessionGateway for HttpGateway {
    async fn fetch_history(&self) -> Result<Vec<TimerSession>> {
        let url = self.endpoint(HISTORY_PATH)?;
        let response = self.send(self.client.get(url), "fetch_history").await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(Vec::new()),
            status if status.is_success() => Ok(decode::<Option<Vec<TimerSession>>>(response)
                .await?
                .unwrap_or_default()),
            _ => Err(GatewayError::Network(failure_message(response).await)),
        }
    }

    async fn fetch_active(&self) -> Result<Option<TimerSession>> {
        let url = self.endpoint(ACTIVE_PATH)?;
        let response = self.send(self.client.get(url), "fetch_active").await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => decode::<Option<TimerSession>>(response).await,
            _ => Err(GatewayError::Network(failure_message(response).await)),
        }
    }

    async fn start(&self, is_abstinence: bool) -> Result<TimerSession> {
        let url = self.endpoint(START_PATH)?;
        let request = self.client.post(url).json(&StartRequest { is_abstinence });
        let response = self.send(request, "start").await?;

        mutation_result(response).await
    }

    async fn end(&self) -> Result<TimerSession> {
        let url = self.endpoint(END_PATH)?;
        let response = self.send(self.client.post(url), "end").await?;

        mutation_result(response).await
    }
}

async fn mutation_result(response: Response) -> Result<TimerSession> {
    let status = response.status();
    if status.is_success() {
        return decode(response).await;
    }

    let detail = failure_detail(response).await;
    match status {
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            Err(GatewayError::Validation(detail))
        }
        _ => Err(GatewayError::Network(format!("{}: {}", status.as_u16(), detail))),
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::Network(format!("invalid response body: {e}")))
}

async fn failure_message(response: Response) -> String {
    let status = response.status();
    let detail = failure_detail(response).await;
    format!("{}: {}", status.as_u16(), detail)
}

/// Human-readable reason: the JSON `message`/`error` field, else the body text,
/// else the status reason phrase.
async fn failure_detail(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            ["message", "error"].iter().find_map(|key| {
                value
                    .get(*key)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
        })
        .or_else(|| Some(body.trim().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
