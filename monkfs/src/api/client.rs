//! HTTP client for the File API.
//!
//! All operations are `POST /api/file/<op>[?pick=<hint>]` with a JSON body.
//! One `reqwest::Client` is shared by every caller; it pools keep-alive
//! connections and is safe for concurrent use.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::api::FileApi;
use crate::api::error::{ApiError, ClientError};
use crate::api::types::{
    Envelope, FieldHint, ListOptions, ListRequest, ListResponse, RetrieveOptions,
    RetrieveRequest, RetrieveResponse, StatRequest, StatResponse, StoreOptions, StoreRequest,
    StoreResponse,
};
use crate::constants::{
    DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT, POOL_IDLE_TIMEOUT, POOL_MAX_IDLE_PER_HOST,
};

const LIST_ENDPOINT: &str = "/api/file/list";
const STAT_ENDPOINT: &str = "/api/file/stat";
const RETRIEVE_ENDPOINT: &str = "/api/file/retrieve";
const STORE_ENDPOINT: &str = "/api/file/store";

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Bearer token; anonymous access when absent
    pub token: Option<String>,
    /// Deadline for a whole round trip
    pub timeout: Duration,
    /// Idle pooled connections are closed after this long
    pub pool_idle_timeout: Duration,
    /// Upper bound of idle pooled connections per host
    pub pool_max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            pool_idle_timeout: POOL_IDLE_TIMEOUT,
            pool_max_idle_per_host: POOL_MAX_IDLE_PER_HOST,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct FileApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl FileApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()?;

        Ok(Self {
            http,
            base_url,
            token: config.token.filter(|t| !t.is_empty()),
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one call and return the unwrapped `data` payload.
    async fn call<B: Serialize + ?Sized>(
        &self,
        endpoint: &'static str,
        hint: Option<FieldHint>,
        body: &B,
    ) -> Result<Value, ClientError> {
        let mut request = self
            .http
            .post(format!("{}{endpoint}", self.base_url))
            .json(body);
        if let Some(hint) = hint {
            request = request.query(&[("pick", hint.as_str())]);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let round_trip = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };
        let (status, body) = tokio::time::timeout(self.timeout, round_trip)
            .await
            .map_err(|_| ClientError::Timeout {
                endpoint,
                timeout: self.timeout,
            })??;

        debug!(endpoint, status = status.as_u16(), len = body.len(), "file api response");
        unwrap_envelope(status, &body)
    }

    /// Write content to a path. Not used by the read-only filesystem.
    #[instrument(level = "debug", skip(self, content))]
    pub async fn store(
        &self,
        path: &str,
        content: &Value,
        options: StoreOptions,
        hint: Option<FieldHint>,
    ) -> Result<StoreResponse, ClientError> {
        let body = StoreRequest {
            path,
            content,
            file_options: options,
        };
        let data = self.call(STORE_ENDPOINT, hint, &body).await?;
        Ok(StoreResponse::from_data(data)?)
    }
}

#[async_trait]
impl FileApi for FileApiClient {
    #[instrument(level = "debug", skip(self, options))]
    async fn list(
        &self,
        path: &str,
        options: &ListOptions,
        hint: Option<FieldHint>,
    ) -> Result<ListResponse, ClientError> {
        let body = ListRequest {
            path,
            file_options: options,
        };
        let data = self.call(LIST_ENDPOINT, hint, &body).await?;
        Ok(ListResponse::from_data(data)?)
    }

    #[instrument(level = "debug", skip(self))]
    async fn stat(&self, path: &str, hint: Option<FieldHint>) -> Result<StatResponse, ClientError> {
        let data = self.call(STAT_ENDPOINT, hint, &StatRequest { path }).await?;
        Ok(StatResponse::from_data(data)?)
    }

    #[instrument(level = "debug", skip(self))]
    async fn retrieve(
        &self,
        path: &str,
        options: RetrieveOptions,
        hint: Option<FieldHint>,
    ) -> Result<RetrieveResponse, ClientError> {
        let body = RetrieveRequest {
            path,
            file_options: options,
        };
        let data = self.call(RETRIEVE_ENDPOINT, hint, &body).await?;
        Ok(RetrieveResponse::from_data(data, hint)?)
    }
}

/// Classify a raw response: any non-2xx status or `success:false` becomes an
/// [`ApiError`]; a 2xx body that is not an envelope is a decode failure.
pub(crate) fn unwrap_envelope(status: StatusCode, body: &[u8]) -> Result<Value, ClientError> {
    if !status.is_success() {
        let (code, message) = match serde_json::from_slice::<Envelope>(body) {
            Ok(envelope) => (
                envelope.error_code.filter(|c| !c.is_empty()),
                envelope.error.unwrap_or_default(),
            ),
            Err(_) => (None, String::from_utf8_lossy(body).into_owned()),
        };
        return Err(ApiError {
            status,
            code,
            message,
        }
        .into());
    }

    let envelope: Envelope = serde_json::from_slice(body)?;
    if !envelope.success {
        return Err(ApiError {
            status,
            code: envelope.error_code.filter(|c| !c.is_empty()),
            message: envelope
                .error
                .unwrap_or_else(|| "request reported failure".to_string()),
        }
        .into());
    }
    Ok(envelope.data)
}
