//! Pushbullet Core Library
//!
//! Client for the Pushbullet push and messaging service: session handling
//! with a persisted credential, request chains for pushes, SMS and ephemerals,
//! and the realtime event stream.

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod models;
pub mod session;
pub mod stream;
pub mod token_store;
pub mod transport;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use auth::{authorize_url, AcquireToken, AuthorizedHook, NoPrompt};
pub use client::{ClientBuilder, PushbulletClient};
pub use devices::DeviceDirectory;
pub use error::PushError;
pub use models::{Account, Device, PendingUpload, Push, PushRequest, UploadSlot};
pub use session::{PersistedCredential, Session};
pub use stream::{StreamEvent, StreamHandle, DEFAULT_STREAM_URL};
pub use token_store::TokenStore;
pub use transport::{ApiResponse, HttpTransport, Transport, DEFAULT_API_URL};
pub use upload::{UploadOrchestrator, UploadState};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
