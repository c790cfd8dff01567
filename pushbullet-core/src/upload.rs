//! File pushes.
//!
//! Pushing a file takes three calls, each needing something from the one
//! before it:
//!
//! 1. **RequestingSlot** - ask `upload-request` for a pre-signed upload URL
//! 2. **Uploading** - send the bytes to that URL as multipart form data
//! 3. **Publishing** - create a `file` push pointing at the served file URL
//!
//! [`UploadOrchestrator`] walks these states one [`step`](UploadOrchestrator::step)
//! at a time, carrying a [`PendingUpload`] between them.

use std::path::Path;

use serde_json::Value;

use crate::error::PushError;
use crate::models::{PendingUpload, PushRequest, UploadRequest, UploadSlot};
use crate::transport::{ApiResponse, ApiUrls, Endpoint, Transport};

/// Where a file push currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
    RequestingSlot(PendingUpload),
    Uploading(PendingUpload),
    Publishing(PendingUpload),
    /// Holds the response of the final push.
    Done(ApiResponse),
}

impl UploadState {
    pub fn name(&self) -> &'static str {
        match self {
            UploadState::RequestingSlot(_) => "requesting-slot",
            UploadState::Uploading(_) => "uploading",
            UploadState::Publishing(_) => "publishing",
            UploadState::Done(_) => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, UploadState::Done(_))
    }

    /// The in-flight upload, if the chain has not finished.
    pub fn pending(&self) -> Option<&PendingUpload> {
        match self {
            UploadState::RequestingSlot(p)
            | UploadState::Uploading(p)
            | UploadState::Publishing(p) => Some(p),
            UploadState::Done(_) => None,
        }
    }
}

/// Drives one file push from slot request to published push.
pub struct UploadOrchestrator<'a> {
    transport: &'a dyn Transport,
    urls: &'a ApiUrls,
    token: String,
    device_iden: Option<String>,
    state: UploadState,
}

impl<'a> UploadOrchestrator<'a> {
    /// Prepares a push of `local_file` with message `body`.
    ///
    /// Fails without any network call if the file does not exist.
    pub fn new(
        transport: &'a dyn Transport,
        urls: &'a ApiUrls,
        token: impl Into<String>,
        local_file: &Path,
        body: &str,
    ) -> Result<Self, PushError> {
        let pending = prepare_upload(local_file, body)?;
        Ok(Self::from_pending(transport, urls, token, pending))
    }

    /// Starts from an upload already checked by [`prepare_upload`].
    pub fn from_pending(
        transport: &'a dyn Transport,
        urls: &'a ApiUrls,
        token: impl Into<String>,
        pending: PendingUpload,
    ) -> Self {
        Self {
            transport,
            urls,
            token: token.into(),
            device_iden: None,
            state: UploadState::RequestingSlot(pending),
        }
    }

    /// Sends the final push to one device only.
    pub fn to_device(mut self, device_iden: Option<String>) -> Self {
        self.device_iden = device_iden;
        self
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// Performs the call for the current state and moves to the next one.
    ///
    /// Does nothing once the push is done. On error the state is left where
    /// it was.
    pub async fn step(&mut self) -> Result<&UploadState, PushError> {
        let next = match &self.state {
            UploadState::RequestingSlot(pending) => {
                let slot = self.request_slot(pending).await?;
                UploadState::Uploading(pending.clone().with_slot(slot))
            }
            UploadState::Uploading(pending) => {
                self.upload(pending).await?;
                UploadState::Publishing(pending.clone())
            }
            UploadState::Publishing(pending) => {
                let response = self.publish(pending).await?;
                UploadState::Done(response)
            }
            UploadState::Done(_) => return Ok(&self.state),
        };

        tracing::debug!("File push {} -> {}", self.state.name(), next.name());
        self.state = next;
        Ok(&self.state)
    }

    /// Runs the remaining steps and returns the final push response.
    pub async fn run(mut self) -> Result<ApiResponse, PushError> {
        loop {
            if let UploadState::Done(response) = self.step().await? {
                return Ok(response.clone());
            }
        }
    }

    async fn request_slot(&self, pending: &PendingUpload) -> Result<UploadSlot, PushError> {
        let request = UploadRequest {
            file_name: base_name(&pending.local_file_name),
            file_type: pending.file_type.clone(),
        };
        let body = serde_json::to_value(&request)?;

        let response = self
            .transport
            .post_json(&self.urls.url(Endpoint::UploadRequest), &self.token, &body)
            .await?;

        let slot: UploadSlot = response.json()?;
        if slot.upload_url.is_empty() {
            return Err(PushError::Decode(match response.error_message() {
                Some(message) => format!("No upload slot granted: {}", message),
                None => "No upload slot granted".to_string(),
            }));
        }

        Ok(slot)
    }

    async fn upload(&self, pending: &PendingUpload) -> Result<ApiResponse, PushError> {
        let bytes = tokio::fs::read(&pending.local_file_name)
            .await
            .map_err(|e| {
                PushError::PreconditionFailed(format!(
                    "Cannot read {}: {}",
                    pending.local_file_name, e
                ))
            })?;

        tracing::debug!(
            "Uploading {} bytes of {}",
            bytes.len(),
            pending.local_file_name
        );

        self.transport
            .upload(
                &pending.upload_url,
                &base_name(&pending.local_file_name),
                bytes,
            )
            .await
    }

    async fn publish(&self, pending: &PendingUpload) -> Result<ApiResponse, PushError> {
        let request = PushRequest {
            push: pending.to_push(),
            device_iden: self.device_iden.clone(),
        };
        let body: Value = serde_json::to_value(&request)?;

        self.transport
            .post_json(&self.urls.url(Endpoint::Pushes), &self.token, &body)
            .await
    }
}

/// Checks that `local_file` exists and describes the upload of it.
pub fn prepare_upload(local_file: &Path, body: &str) -> Result<PendingUpload, PushError> {
    if !local_file.is_file() {
        return Err(PushError::PreconditionFailed(format!(
            "File not found: {}",
            local_file.display()
        )));
    }

    Ok(PendingUpload {
        local_file_name: local_file.to_string_lossy().into_owned(),
        file_type: file_type_for(local_file),
        body: body.to_string(),
        ..Default::default()
    })
}

/// MIME type guessed from the file extension.
pub fn file_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
