//! Commands that create pushes.

use std::path::PathBuf;

use clap::Args;
use pushbullet_core::{Push, PushRequest, PushbulletClient};

use super::{check_response, resolve_device, CommandError};

/// Push a note
#[derive(Args)]
pub struct NoteCommand {
    /// Note title
    title: String,

    /// Note body
    #[arg(default_value = "")]
    body: String,

    /// Target device (iden or nickname); all devices if omitted
    #[arg(long, short)]
    device: Option<String>,
}

impl NoteCommand {
    pub async fn run(&self, client: &PushbulletClient) -> Result<(), CommandError> {
        let push = Push::Note {
            title: self.title.clone(),
            body: self.body.clone(),
        };
        send(client, push, self.device.as_deref()).await?;
        println!("Pushed note: {}", self.title);
        Ok(())
    }
}

/// Push a link
#[derive(Args)]
pub struct LinkCommand {
    /// URL to push
    url: String,

    /// Link title
    #[arg(long, short, default_value = "")]
    title: String,

    /// Message sent with the link
    #[arg(long, short, default_value = "")]
    body: String,

    /// Target device (iden or nickname); all devices if omitted
    #[arg(long, short)]
    device: Option<String>,
}

impl LinkCommand {
    pub async fn run(&self, client: &PushbulletClient) -> Result<(), CommandError> {
        let push = Push::Link {
            title: self.title.clone(),
            body: self.body.clone(),
            url: self.url.clone(),
        };
        send(client, push, self.device.as_deref()).await?;
        println!("Pushed link: {}", self.url);
        Ok(())
    }
}

/// Upload and push a file
#[derive(Args)]
pub struct FileCommand {
    /// File to upload
    path: PathBuf,

    /// Message sent with the file
    #[arg(long, short, default_value = "")]
    body: String,

    /// Target device (iden or nickname); all devices if omitted
    #[arg(long, short)]
    device: Option<String>,
}

impl FileCommand {
    pub async fn run(&self, client: &PushbulletClient) -> Result<(), CommandError> {
        let device_iden = match &self.device {
            Some(name) => Some(resolve_device(client, name).await?),
            None => None,
        };

        let response = client
            .push_file_to(&self.path, &self.body, device_iden.as_deref())
            .await?;
        check_response(response)?;

        println!("Pushed file: {}", self.path.display());
        Ok(())
    }
}

/// Send an ephemeral (not stored by the service)
#[derive(Args)]
pub struct EphemeralCommand {
    /// JSON payload, e.g. '{"type":"clip","body":"hello"}'
    payload: String,
}

impl EphemeralCommand {
    pub async fn run(&self, client: &PushbulletClient) -> Result<(), CommandError> {
        let payload: serde_json::Value = serde_json::from_str(&self.payload)
            .map_err(|e| CommandError::InvalidInput(format!("payload is not JSON: {}", e)))?;

        let response = client.send_ephemeral(payload).await?;
        check_response(response)?;

        println!("Ephemeral sent.");
        Ok(())
    }
}

async fn send(
    client: &PushbulletClient,
    push: Push,
    device: Option<&str>,
) -> Result<(), CommandError> {
    let mut request = PushRequest::new(push);
    if let Some(name) = device {
        request = request.to_device(resolve_device(client, name).await?);
    }

    let response = client.push(request).await?;
    check_response(response)?;
    Ok(())
}
