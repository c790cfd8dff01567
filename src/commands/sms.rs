//! SMS relay through a paired phone.

use std::collections::BTreeMap;

use clap::Args;
use pushbullet_core::{DeviceDirectory, PushbulletClient};

use super::{check_response, CommandError};

/// Send an SMS through a phone
#[derive(Args)]
pub struct SmsCommand {
    /// Phone number(s) to send to
    #[arg(required = true)]
    addresses: Vec<String>,

    /// Message text
    #[arg(long, short)]
    message: String,

    /// Sending phone (nickname or iden); required if several phones can send SMS
    #[arg(long, short)]
    device: Option<String>,
}

impl SmsCommand {
    pub async fn run(&self, client: &PushbulletClient) -> Result<(), CommandError> {
        if client.devices().is_empty() {
            client.list_devices().await?;
        }

        let phones = client.sms_capable_devices();
        let devices = client.devices();
        let directory = DeviceDirectory::new(&devices);
        let target = choose_phone(&phones, self.device.as_deref(), &directory)?;

        let response = client
            .send_sms(&target, &self.addresses, &self.message)
            .await?;
        check_response(response)?;

        println!("SMS queued to {}", self.addresses.join(", "));
        Ok(())
    }
}

/// Picks the sending phone from the SMS-capable devices.
fn choose_phone(
    phones: &BTreeMap<String, String>,
    requested: Option<&str>,
    directory: &DeviceDirectory<'_>,
) -> Result<String, CommandError> {
    match requested {
        Some(name) => {
            if let Some(iden) = phones.get(name) {
                return Ok(iden.clone());
            }
            match directory.find(name) {
                Some(device) if device.can_relay_sms() => Ok(device.iden.clone()),
                Some(device) => Err(CommandError::NoSmsDevice(format!(
                    "Device '{}' cannot send SMS",
                    device.display_name()
                ))),
                None => Err(CommandError::UnknownDevice(name.to_string())),
            }
        }
        None => {
            let mut idens = phones.values();
            match (idens.next(), idens.next()) {
                (Some(iden), None) => Ok(iden.clone()),
                (None, _) => Err(CommandError::NoSmsDevice(
                    "No SMS-capable device on this account".to_string(),
                )),
                (Some(_), Some(_)) => Err(CommandError::NoSmsDevice(format!(
                    "Several phones can send SMS, pick one with --device: {}",
                    phones.keys().cloned().collect::<Vec<_>>().join(", ")
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushbullet_core::Device;

    fn phone(iden: &str, nickname: &str, has_sms: bool) -> Device {
        Device {
            iden: iden.to_string(),
            nickname: nickname.to_string(),
            active: true,
            has_sms,
            pushable: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_phone_is_chosen_automatically() {
        let devices = vec![phone("p1", "Pixel", true), phone("l1", "Laptop", false)];
        let directory = DeviceDirectory::new(&devices);
        let phones = directory.sms_capable_devices();

        assert_eq!(choose_phone(&phones, None, &directory).unwrap(), "p1");
    }

    #[test]
    fn test_several_phones_need_a_choice() {
        let devices = vec![phone("p1", "Pixel", true), phone("p2", "Galaxy", true)];
        let directory = DeviceDirectory::new(&devices);
        let phones = directory.sms_capable_devices();

        let err = choose_phone(&phones, None, &directory).unwrap_err();
        assert!(err.to_string().contains("Galaxy, Pixel"));
        assert_eq!(choose_phone(&phones, Some("Galaxy"), &directory).unwrap(), "p2");
        assert_eq!(choose_phone(&phones, Some("p1"), &directory).unwrap(), "p1");
    }

    #[test]
    fn test_requested_device_without_sms() {
        let devices = vec![phone("p1", "Pixel", true), phone("l1", "Laptop", false)];
        let directory = DeviceDirectory::new(&devices);
        let phones = directory.sms_capable_devices();

        let err = choose_phone(&phones, Some("Laptop"), &directory).unwrap_err();
        assert!(matches!(err, CommandError::NoSmsDevice(_)));

        let err = choose_phone(&phones, Some("Toaster"), &directory).unwrap_err();
        assert!(matches!(err, CommandError::UnknownDevice(_)));
    }

    #[test]
    fn test_no_phones() {
        let directory = DeviceDirectory::new(&[]);
        let err = choose_phone(&BTreeMap::new(), None, &directory).unwrap_err();
        assert!(err.to_string().contains("No SMS-capable device"));
    }
}
