//! The public operations.
//!
//! Every operation starts at the token gate: if the session holds no token the
//! injected [`AcquireToken`] is asked for one, and the operation is abandoned
//! without any network call if none comes back. After the gate each operation
//! runs its request chain, awaiting every step before issuing the next.
//!
//! ```no_run
//! use pushbullet_core::{PushbulletClient, TokenStore};
//!
//! # async fn demo() -> Result<(), pushbullet_core::PushError> {
//! let client = PushbulletClient::builder("client-id", "client-secret")
//!     .token_store(TokenStore::beside_executable())
//!     .build()?;
//!
//! client.push_note("Hello", "from Rust").await?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::Value;

use crate::auth::{authorize_url, AcquireToken, AuthorizedHook, NoPrompt};
use crate::devices::DeviceDirectory;
use crate::error::PushError;
use crate::models::{Account, Device, DeviceList, Push, PushRequest, SmsRequest};
use crate::session::Session;
use crate::stream::{
    StreamConnector, StreamHandle, StreamOpener, WebSocketOpener, DEFAULT_STREAM_URL,
};
use crate::token_store::TokenStore;
use crate::transport::{
    ApiResponse, ApiUrls, Endpoint, HttpTransport, Transport, DEFAULT_API_URL, DEFAULT_TIMEOUT,
};
use crate::upload::{prepare_upload, UploadOrchestrator};

/// Configures and creates a [`PushbulletClient`].
pub struct ClientBuilder {
    session: Session,
    api_url: String,
    stream_url: String,
    timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
    acquirer: Arc<dyn AcquireToken>,
    opener: Arc<dyn StreamOpener>,
    token_store: Option<TokenStore>,
    hooks: Vec<Arc<dyn AuthorizedHook>>,
}

impl ClientBuilder {
    fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            session: Session::new(client_id, client_secret),
            api_url: DEFAULT_API_URL.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            transport: None,
            acquirer: Arc::new(NoPrompt),
            opener: Arc::new(WebSocketOpener),
            token_store: None,
            hooks: Vec::new(),
        }
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = url.into();
        self
    }

    /// Timeout applied to every HTTP call of the default transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// How to ask the user for a token. Without one, operations fail when the
    /// session is unauthenticated.
    pub fn acquirer(mut self, acquirer: Arc<dyn AcquireToken>) -> Self {
        self.acquirer = acquirer;
        self
    }

    pub fn stream_opener(mut self, opener: Arc<dyn StreamOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Restores the session from `store` and saves it back on every
    /// authorization.
    pub fn token_store(mut self, store: TokenStore) -> Self {
        self.token_store = Some(store);
        self
    }

    pub fn on_authorized(mut self, hook: Arc<dyn AuthorizedHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn build(self) -> Result<PushbulletClient, PushError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.timeout)?),
        };

        let mut session = self.session;
        let mut hooks = self.hooks;

        if let Some(store) = &self.token_store {
            if let Some(credential) = store.load() {
                tracing::debug!("Restored credential from {}", store.path().display());
                session.restore(credential);
            }
            hooks.insert(0, Arc::new(store.clone()));
        }

        Ok(PushbulletClient {
            session: RwLock::new(session),
            urls: ApiUrls::new(self.api_url),
            transport,
            acquirer: self.acquirer,
            hooks: RwLock::new(hooks),
            stream: StreamConnector::new(self.stream_url, self.opener),
            token_store: self.token_store,
        })
    }
}

/// A Pushbullet account session and the operations available on it.
pub struct PushbulletClient {
    session: RwLock<Session>,
    urls: ApiUrls,
    transport: Arc<dyn Transport>,
    acquirer: Arc<dyn AcquireToken>,
    hooks: RwLock<Vec<Arc<dyn AuthorizedHook>>>,
    stream: StreamConnector,
    token_store: Option<TokenStore>,
}

impl PushbulletClient {
    pub fn builder(client_id: &str, client_secret: &str) -> ClientBuilder {
        ClientBuilder::new(client_id, client_secret)
    }

    /// Copy of the current session.
    pub fn session(&self) -> Session {
        self.read_session().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_session().is_authenticated()
    }

    /// Registers another observer of the "authorized" event.
    pub fn on_authorized(&self, hook: Arc<dyn AuthorizedHook>) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    // ==================== Single-step operations ====================

    pub async fn push_note(&self, title: &str, body: &str) -> Result<ApiResponse, PushError> {
        self.push(PushRequest::new(Push::Note {
            title: title.to_string(),
            body: body.to_string(),
        }))
        .await
    }

    pub async fn push_link(
        &self,
        title: &str,
        body: &str,
        url: &str,
    ) -> Result<ApiResponse, PushError> {
        self.push(PushRequest::new(Push::Link {
            title: title.to_string(),
            body: body.to_string(),
            url: url.to_string(),
        }))
        .await
    }

    /// Sends a data-only push that the service delivers but does not store.
    pub async fn send_ephemeral(&self, payload: Value) -> Result<ApiResponse, PushError> {
        self.push(PushRequest::new(Push::Ephemeral { payload })).await
    }

    /// Sends any push. Ephemerals go to their own endpoint.
    pub async fn push(&self, request: PushRequest) -> Result<ApiResponse, PushError> {
        let token = self.ensure_token()?;

        let endpoint = if request.push.is_ephemeral() {
            Endpoint::Ephemerals
        } else {
            Endpoint::Pushes
        };
        let body = serde_json::to_value(&request)?;

        self.transport
            .post_json(&self.urls.url(endpoint), &token, &body)
            .await
    }

    /// Asks the phone `target_device_iden` to send an SMS.
    pub async fn send_sms(
        &self,
        target_device_iden: &str,
        addresses: &[String],
        message: &str,
    ) -> Result<ApiResponse, PushError> {
        let token = self.ensure_token()?;
        let body = serde_json::to_value(SmsRequest::new(target_device_iden, addresses, message))?;

        self.transport
            .post_json(&self.urls.url(Endpoint::Texts), &token, &body)
            .await
    }

    /// Fetches the account identity and then the device list.
    ///
    /// Fires "authorized" once both are cached.
    pub async fn me(&self) -> Result<Account, PushError> {
        let token = self.ensure_token()?;

        let response = self.transport.get(&self.urls.url(Endpoint::Me), &token).await?;
        let account: Account = response.json()?;
        self.write_session()
            .set_identity(account.iden.clone(), account.name.clone());

        self.fetch_devices(&token).await?;
        self.fire_authorized();

        Ok(account)
    }

    /// Fetches the device list, replacing the cached one.
    pub async fn list_devices(&self) -> Result<Vec<Device>, PushError> {
        let token = self.ensure_token()?;
        let devices = self.fetch_devices(&token).await?;
        self.fire_authorized();
        Ok(devices)
    }

    // ==================== Multi-step operations ====================

    /// Uploads `path` and pushes it to all devices.
    pub async fn push_file(&self, path: &Path, body: &str) -> Result<ApiResponse, PushError> {
        self.push_file_to(path, body, None).await
    }

    /// Uploads `path` and pushes it, optionally to a single device.
    pub async fn push_file_to(
        &self,
        path: &Path,
        body: &str,
        device_iden: Option<&str>,
    ) -> Result<ApiResponse, PushError> {
        // Checked before the token gate
        let pending = prepare_upload(path, body)?;
        let token = self.ensure_token()?;

        UploadOrchestrator::from_pending(self.transport.as_ref(), &self.urls, token, pending)
            .to_device(device_iden.map(str::to_string))
            .run()
            .await
    }

    // ==================== Devices ====================

    /// Cached devices, as of the last fetch.
    pub fn devices(&self) -> Vec<Device> {
        self.read_session().devices().to_vec()
    }

    /// Cached SMS-capable devices keyed by nickname.
    pub fn sms_capable_devices(&self) -> BTreeMap<String, String> {
        let session = self.read_session();
        DeviceDirectory::new(session.devices()).sms_capable_devices()
    }

    // ==================== Realtime stream ====================

    /// Opens the realtime stream, or returns the already open one.
    pub async fn start_realtime_stream(&self) -> Result<StreamHandle, PushError> {
        let token = self.ensure_token()?;
        self.stream.connect(&token).await
    }

    pub async fn stop_realtime_stream(&self) {
        self.stream.disconnect().await;
    }

    /// Forgets the token, closes the stream and deletes the stored credential.
    pub async fn logout(&self) {
        self.write_session().clear();
        self.stream.disconnect().await;
        if let Some(store) = &self.token_store {
            if let Err(e) = store.clear() {
                tracing::warn!("Failed to remove {}: {}", store.path().display(), e);
            }
        }
    }

    // ==================== Internals ====================

    /// Returns the current token, asking the user for one if there is none.
    fn ensure_token(&self) -> Result<String, PushError> {
        let (token, client_id) = {
            let session = self.read_session();
            (
                session.auth_token().to_string(),
                session.client_id().to_string(),
            )
        };
        if !token.is_empty() {
            return Ok(token);
        }

        tracing::info!("No access token, asking the user for one");
        let token = self
            .acquirer
            .acquire(&authorize_url(&client_id))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                PushError::PreconditionFailed("No access token was provided".to_string())
            })?;

        self.write_session().authorize(token.clone());
        self.fire_authorized();

        Ok(token)
    }

    async fn fetch_devices(&self, token: &str) -> Result<Vec<Device>, PushError> {
        let response = self
            .transport
            .get(&self.urls.url(Endpoint::Devices), token)
            .await?;
        let list: DeviceList = response.json()?;

        tracing::debug!("Fetched {} device(s)", list.devices.len());
        self.write_session().set_devices(list.devices.clone());

        Ok(list.devices)
    }

    fn fire_authorized(&self) {
        let credential = self.read_session().to_credential();
        let hooks = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        tracing::info!(
            "Authorized as '{}' with {} device(s)",
            credential.name,
            credential.devices.len()
        );
        for hook in hooks {
            hook.on_authorized(&credential);
        }
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}
