//! Account and device listing.

use clap::Args;
use pushbullet_core::{Device, PushbulletClient};

use super::CommandError;

/// Show the account and refresh the device list
#[derive(Args)]
pub struct MeCommand {}

impl MeCommand {
    pub async fn run(&self, client: &PushbulletClient) -> Result<(), CommandError> {
        let account = client.me().await?;

        println!("Account");
        println!("=======");
        println!();
        println!("Name:  {}", account.name);
        println!("Email: {}", account.email);
        println!("Iden:  {}", account.iden);
        if let Some(created) = account.created_at() {
            println!("Since: {}", created.format("%Y-%m-%d"));
        }
        println!();
        println!("Devices: {}", client.devices().len());

        Ok(())
    }
}

/// List devices
#[derive(Args)]
pub struct DevicesCommand {
    /// Only show devices that can send SMS
    #[arg(long)]
    sms: bool,

    /// Use the cached list instead of fetching it
    #[arg(long)]
    cached: bool,
}

impl DevicesCommand {
    pub async fn run(&self, client: &PushbulletClient) -> Result<(), CommandError> {
        if !self.cached {
            client.list_devices().await?;
        }

        if self.sms {
            let phones = client.sms_capable_devices();
            if phones.is_empty() {
                println!("No SMS-capable devices.");
            }
            for (nickname, iden) in &phones {
                println!("{:<24} {}", nickname, iden);
            }
            return Ok(());
        }

        let devices = client.devices();
        if devices.is_empty() {
            println!("No devices.");
        }
        for device in &devices {
            println!("{}", format_device(device));
        }

        Ok(())
    }
}

fn format_device(device: &Device) -> String {
    let mut flags = Vec::new();
    if !device.active {
        flags.push("inactive");
    }
    if device.pushable {
        flags.push("pushable");
    }
    if device.has_sms {
        flags.push("sms");
    }

    format!(
        "{:<24} {:<24} {}",
        device.display_name(),
        device.iden,
        flags.join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_device_flags() {
        let device = Device {
            iden: "ujx".to_string(),
            nickname: "Pixel".to_string(),
            active: true,
            has_sms: true,
            pushable: true,
            ..Default::default()
        };
        let line = format_device(&device);
        assert!(line.starts_with("Pixel"));
        assert!(line.ends_with("pushable,sms"));

        let retired = Device {
            iden: "old".to_string(),
            ..Default::default()
        };
        assert!(format_device(&retired).ends_with("inactive"));
    }
}
