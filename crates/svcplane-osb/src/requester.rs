//! Single-request execution against a resolved broker.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use svcplane_core::context::RequestContext;
use svcplane_core::error::{PlaneError, PlaneResult};
use tracing::debug;
use url::Url;

use crate::config::OsbConfig;
use crate::error::RequestError;
use crate::resolver::BrokerCredentials;

/// `X-Broker-API-Version`, lower-cased as header names are stored.
pub const API_VERSION_HEADER: HeaderName = HeaderName::from_static("x-broker-api-version");

/// One broker call: a path relative to the broker URL plus options.
#[derive(Debug, Clone)]
pub struct BrokerRequest {
    pub method: Method,
    /// Path segments appended to the broker base URL, e.g.
    /// `["v2", "service_instances", id]`.
    pub segments: Vec<String>,
    /// JSON body. `None` or an empty object sends no payload.
    pub body: Option<serde_json::Value>,
    /// Append `accepts_incomplete=true`.
    pub accepts_incomplete: bool,
    /// Treat 404 as a successful response.
    pub allow_not_found: bool,
}

impl BrokerRequest {
    pub fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.to_string()).collect(),
            body: None,
            accepts_incomplete: false,
            allow_not_found: false,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Mark as a long-running operation the broker may complete later.
    pub fn asynchronous(mut self) -> Self {
        self.accepts_incomplete = true;
        self
    }

    pub fn allow_not_found(mut self) -> Self {
        self.allow_not_found = true;
        self
    }

    fn payload(&self) -> Option<&serde_json::Value> {
        match &self.body {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Object(map)) if map.is_empty() => None,
            Some(body) => Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl BrokerResponse {
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND.as_u16()
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Join `segments` onto `base` and add the async flag when requested.
pub fn build_url(base: &str, segments: &[String], accepts_incomplete: bool) -> Result<Url, RequestError> {
    let url_error = |reason: String| RequestError::Url {
        base: base.to_string(),
        reason,
    };

    let mut url = Url::parse(base).map_err(|e| url_error(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| url_error("URL cannot be a base".into()))?
        .pop_if_empty()
        .extend(segments);

    if accepts_incomplete {
        url.query_pairs_mut().append_pair("accepts_incomplete", "true");
    }
    Ok(url)
}

/// `Basic base64(user:pass)`.
pub fn basic_auth_value(credentials: &BrokerCredentials) -> String {
    let plain = format!("{}:{}", credentials.username, credentials.password);
    format!("Basic {}", STANDARD.encode(plain))
}

/// Sends broker requests over a shared HTTP connection pool.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
    api_version: HeaderValue,
}

impl RequestExecutor {
    pub fn new(config: &OsbConfig) -> PlaneResult<Self> {
        let api_version = HeaderValue::from_str(&config.api_version).map_err(|e| {
            PlaneError::Validation {
                message: format!("invalid broker API version header: {e}"),
            }
        })?;

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PlaneError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, api_version })
    }

    /// Execute `request` against the broker at `base_url`.
    ///
    /// Status `<= 299` succeeds; 404 succeeds when the request allows it;
    /// anything else is [`PlaneError::BrokerRequestFailed`] with the raw
    /// body. Cancelling `ctx` aborts the in-flight call.
    pub async fn send(
        &self,
        ctx: &RequestContext,
        base_url: &str,
        credentials: &BrokerCredentials,
        request: BrokerRequest,
    ) -> PlaneResult<BrokerResponse> {
        let url = build_url(base_url, &request.segments, request.accepts_incomplete)?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&basic_auth_value(credentials)).map_err(|e| {
            PlaneError::Validation {
                message: format!("credentials are not a valid header value: {e}"),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(API_VERSION_HEADER, self.api_version.clone());

        let mut builder = self.http.request(request.method.clone(), url.clone());
        if let Some(body) = request.payload() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            builder = builder.body(body.to_string());
        }
        let builder = builder.headers(headers);

        let response = ctx
            .run(async move {
                let response = builder.send().await.map_err(RequestError::from)?;
                let status = response.status().as_u16();
                let body = response.bytes().await.map_err(RequestError::from)?;
                Ok::<_, PlaneError>(BrokerResponse {
                    status,
                    body: body.to_vec(),
                })
            })
            .await?;

        debug!(
            method = %request.method,
            path = %url.path(),
            accepts_incomplete = request.accepts_incomplete,
            status = response.status,
            "Broker request completed"
        );

        if request.allow_not_found && response.is_not_found() {
            return Ok(response);
        }
        if response.status > 299 {
            return Err(RequestError::Status {
                status: response.status,
                body: response.body_text(),
            }
            .into());
        }
        Ok(response)
    }
}
