//! Single HTTP calls against the Pushbullet API.
//!
//! The [`Transport`] trait is the seam between the operation chains and the
//! network. [`HttpTransport`] is the `reqwest` implementation; tests swap in
//! their own.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::PushError;

/// Default REST base.
pub const DEFAULT_API_URL: &str = "https://api.pushbullet.com/v2";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the access token.
pub const TOKEN_HEADER: &str = "Access-Token";

/// REST resources used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Pushes,
    Devices,
    Me,
    Texts,
    Ephemerals,
    UploadRequest,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Pushes => "pushes",
            Endpoint::Devices => "devices",
            Endpoint::Me => "users/me",
            Endpoint::Texts => "texts",
            Endpoint::Ephemerals => "ephemerals",
            Endpoint::UploadRequest => "upload-request",
        }
    }
}

/// Builds full URLs from a REST base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrls {
    base: String,
}

impl ApiUrls {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base, endpoint.path())
    }
}

impl Default for ApiUrls {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

/// Raw body of a completed call.
///
/// The status code is not part of the contract: error bodies are delivered
/// the same way as successful ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self { body: body.into() }
    }

    /// Decodes the body into `T`.
    ///
    /// An empty body decodes as `{}` so types with defaulted fields come out
    /// empty instead of failing.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PushError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_str("{}")?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as untyped JSON, or `Value::Null` if it is not JSON.
    pub fn value(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The server's `error.message`, if the body is an error envelope.
    pub fn error_message(&self) -> Option<String> {
        self.value()
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Issues one call and resolves with the raw response body.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET url` with the token header.
    async fn get(&self, url: &str, token: &str) -> Result<ApiResponse, PushError>;

    /// `POST url` with the token header and a JSON body.
    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &Value,
    ) -> Result<ApiResponse, PushError>;

    /// Multipart `POST` of one file to a pre-signed URL.
    async fn upload(
        &self,
        upload_url: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ApiResponse, PushError>;
}

/// `reqwest` backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport whose calls give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, PushError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pushbullet-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PushError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn read(
        &self,
        method: &str,
        url: &str,
        response: reqwest::Response,
    ) -> Result<ApiResponse, PushError> {
        let status = response.status();
        if status.is_success() {
            tracing::debug!("{} {} -> {}", method, url, status);
        } else {
            tracing::warn!("{} {} -> {}", method, url, status);
        }

        let body = response.bytes().await?;
        Ok(ApiResponse::new(body.to_vec()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, token: &str) -> Result<ApiResponse, PushError> {
        let response = self
            .client
            .get(url)
            .header(TOKEN_HEADER, token)
            .send()
            .await?;

        self.read("GET", url, response).await
    }

    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &Value,
    ) -> Result<ApiResponse, PushError> {
        let response = self
            .client
            .post(url)
            .header(TOKEN_HEADER, token)
            .json(body)
            .send()
            .await?;

        self.read("POST", url, response).await
    }

    async fn upload(
        &self,
        upload_url: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ApiResponse, PushError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.client.post(upload_url).multipart(form).send().await?;

        self.read("POST", upload_url, response).await
    }
}
