//! Queries over the cached device list.
//!
//! Nothing here touches the network. The device list must already have been
//! fetched with `list_devices()` or `me()`.

use std::collections::BTreeMap;

use crate::models::Device;

/// Read-only view over a device list.
#[derive(Debug, Clone, Copy)]
pub struct DeviceDirectory<'a> {
    devices: &'a [Device],
}

impl<'a> DeviceDirectory<'a> {
    pub fn new(devices: &'a [Device]) -> Self {
        Self { devices }
    }

    pub fn all(&self) -> &'a [Device] {
        self.devices
    }

    /// Devices able to relay SMS, keyed by nickname.
    ///
    /// When two devices share a nickname the later one in the list wins.
    pub fn sms_capable_devices(&self) -> BTreeMap<String, String> {
        let mut devices = BTreeMap::new();
        for device in self.devices.iter().filter(|d| d.can_relay_sms()) {
            devices.insert(device.nickname.clone(), device.iden.clone());
        }
        devices
    }

    /// Active devices that accept pushes.
    pub fn pushable_devices(&self) -> Vec<&'a Device> {
        self.devices
            .iter()
            .filter(|d| d.active && d.pushable)
            .collect()
    }

    /// Finds a device by iden, or failing that by nickname (case-insensitive).
    pub fn find(&self, iden_or_nickname: &str) -> Option<&'a Device> {
        self.devices
            .iter()
            .find(|d| d.iden == iden_or_nickname)
            .or_else(|| {
                self.devices
                    .iter()
                    .rev()
                    .find(|d| d.nickname.eq_ignore_ascii_case(iden_or_nickname))
            })
    }
}
