mod account;
mod auth;
mod config_cmd;
mod push;
mod sms;
mod stream_cmd;

pub use account::{DevicesCommand, MeCommand};
pub use auth::AuthCommand;
pub use config_cmd::ConfigCommand;
pub use push::{EphemeralCommand, FileCommand, LinkCommand, NoteCommand};
pub use sms::SmsCommand;
pub use stream_cmd::StreamCommand;

use pushbullet_core::{ApiResponse, DeviceDirectory, PushError, PushbulletClient};

/// Errors from push, device and stream commands
#[derive(Debug)]
pub enum CommandError {
    /// The operation could not be carried out
    Push(PushError),
    /// The server answered with an error envelope
    Server(String),
    /// `--device` matched nothing
    UnknownDevice(String),
    /// No SMS device could be chosen automatically
    NoSmsDevice(String),
    /// Invalid command line input
    InvalidInput(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Push(e) => write!(f, "{}", e),
            CommandError::Server(message) => write!(f, "Server error: {}", message),
            CommandError::UnknownDevice(name) => {
                write!(f, "No device named '{}'. Run 'pb devices' to list them.", name)
            }
            CommandError::NoSmsDevice(reason) => write!(f, "{}", reason),
            CommandError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<PushError> for CommandError {
    fn from(e: PushError) -> Self {
        CommandError::Push(e)
    }
}

/// Turns an error envelope into an error, passing other responses through.
fn check_response(response: ApiResponse) -> Result<ApiResponse, CommandError> {
    match response.error_message() {
        Some(message) => Err(CommandError::Server(message)),
        None => Ok(response),
    }
}

/// Resolves a `--device` argument (iden or nickname) to a device iden.
///
/// Fetches the device list first if none is cached yet.
async fn resolve_device(client: &PushbulletClient, name: &str) -> Result<String, CommandError> {
    if client.devices().is_empty() {
        client.list_devices().await?;
    }

    let devices = client.devices();
    DeviceDirectory::new(&devices)
        .find(name)
        .map(|d| d.iden.clone())
        .ok_or_else(|| CommandError::UnknownDevice(name.to_string()))
}
