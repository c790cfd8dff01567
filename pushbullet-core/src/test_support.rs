//! Stub collaborators for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::{AcquireToken, AuthorizedHook};
use crate::error::PushError;
use crate::session::PersistedCredential;
use crate::transport::{ApiResponse, Transport};

/// One call seen by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get {
        url: String,
        token: String,
    },
    Post {
        url: String,
        token: String,
        body: Value,
    },
    Upload {
        url: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

impl Call {
    pub fn url(&self) -> &str {
        match self {
            Call::Get { url, .. } | Call::Post { url, .. } | Call::Upload { url, .. } => url,
        }
    }
}

/// Transport that answers from a table of canned bodies and records calls.
#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every call to `url` with `body`.
    pub fn respond(self, url: &str, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn answer(&self, call: Call) -> Result<ApiResponse, PushError> {
        let body = self
            .responses
            .lock()
            .unwrap()
            .get(call.url())
            .cloned()
            .unwrap_or_else(|| "{}".to_string());
        self.calls.lock().unwrap().push(call);
        Ok(ApiResponse::new(body))
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn get(&self, url: &str, token: &str) -> Result<ApiResponse, PushError> {
        self.answer(Call::Get {
            url: url.to_string(),
            token: token.to_string(),
        })
    }

    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: &Value,
    ) -> Result<ApiResponse, PushError> {
        self.answer(Call::Post {
            url: url.to_string(),
            token: token.to_string(),
            body: body.clone(),
        })
    }

    async fn upload(
        &self,
        upload_url: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ApiResponse, PushError> {
        self.answer(Call::Upload {
            url: upload_url.to_string(),
            file_name: file_name.to_string(),
            bytes,
        })
    }
}

/// Acquirer returning a fixed answer and counting prompts.
pub struct CountingAcquirer {
    token: Option<String>,
    prompts: AtomicUsize,
}

impl CountingAcquirer {
    pub fn granting(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn cancelling() -> Self {
        Self {
            token: None,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl AcquireToken for CountingAcquirer {
    fn acquire(&self, _authorize_url: &str) -> Option<String> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.token.clone()
    }
}

/// Hook that remembers every credential it was handed.
#[derive(Default)]
pub struct RecordingHook {
    seen: Mutex<Vec<PersistedCredential>>,
}

impl RecordingHook {
    pub fn seen(&self) -> Vec<PersistedCredential> {
        self.seen.lock().unwrap().clone()
    }
}

impl AuthorizedHook for RecordingHook {
    fn on_authorized(&self, credential: &PersistedCredential) {
        self.seen.lock().unwrap().push(credential.clone());
    }
}
