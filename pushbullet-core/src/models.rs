//! Wire types exchanged with the Pushbullet API.
//!
//! Every response type decodes leniently: fields the server leaves out become
//! empty strings or `false` instead of failing the whole operation.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A registered endpoint that can receive pushes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub iden: String,
    pub nickname: String,
    pub active: bool,
    pub has_sms: bool,
    pub pushable: bool,
    pub manufacturer: String,
    pub model: String,
    /// Remaining server fields, kept so the persisted device list matches what
    /// the server sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    /// True if the device can relay SMS right now.
    pub fn can_relay_sms(&self) -> bool {
        self.active && self.has_sms && self.pushable
    }

    /// Human readable label, falling back to manufacturer/model when the
    /// device has no nickname.
    pub fn display_name(&self) -> String {
        if !self.nickname.is_empty() {
            self.nickname.clone()
        } else if !self.model.is_empty() {
            format!("{} {}", self.manufacturer, self.model)
                .trim()
                .to_string()
        } else {
            self.iden.clone()
        }
    }
}

/// Response of `GET /v2/devices`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeviceList {
    pub devices: Vec<Device>,
}

/// Response of `GET /v2/users/me`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub iden: String,
    pub name: String,
    pub email: String,
    /// Account creation time as a unix timestamp with fractional seconds.
    pub created: f64,
}

impl Account {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        timestamp_to_datetime(self.created)
    }
}

/// A single outbound message.
///
/// Serializes with a `type` tag, so `Push::Note` becomes
/// `{"type":"note","title":..,"body":..}`. An ephemeral is posted to its own
/// endpoint as `{"type":"push","push":<payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Push {
    Note {
        title: String,
        body: String,
    },
    Link {
        title: String,
        body: String,
        url: String,
    },
    File {
        file_name: String,
        file_type: String,
        file_url: String,
        body: String,
    },
    #[serde(rename = "push")]
    Ephemeral {
        #[serde(rename = "push")]
        payload: Value,
    },
}

impl Push {
    /// True for pushes the server does not store.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Push::Ephemeral { .. })
    }
}

/// A push plus optional targeting, as sent to `POST /v2/pushes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushRequest {
    #[serde(flatten)]
    pub push: Push,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_iden: Option<String>,
}

impl PushRequest {
    pub fn new(push: Push) -> Self {
        Self {
            push,
            device_iden: None,
        }
    }

    /// Sends the push to a single device instead of all of them.
    pub fn to_device(mut self, device_iden: impl Into<String>) -> Self {
        self.device_iden = Some(device_iden.into());
        self
    }
}

/// Body of `POST /v2/upload-request`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadRequest {
    pub file_name: String,
    pub file_type: String,
}

/// Response of `POST /v2/upload-request`: where to put the bytes and where
/// they will be served from afterwards.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UploadSlot {
    pub file_name: String,
    pub file_type: String,
    pub file_url: String,
    pub upload_url: String,
}

/// State carried through one file push.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingUpload {
    pub local_file_name: String,
    pub remote_file_name: String,
    pub file_type: String,
    pub file_url: String,
    pub upload_url: String,
    pub body: String,
}

impl PendingUpload {
    /// Fills in the fields the server decided on.
    pub fn with_slot(mut self, slot: UploadSlot) -> Self {
        self.remote_file_name = slot.file_name;
        self.file_type = slot.file_type;
        self.file_url = slot.file_url;
        self.upload_url = slot.upload_url;
        self
    }

    /// The final push announcing the uploaded file.
    pub fn to_push(&self) -> Push {
        Push::File {
            file_name: self.remote_file_name.clone(),
            file_type: self.file_type.clone(),
            file_url: self.file_url.clone(),
            body: self.body.clone(),
        }
    }
}

/// Body of `POST /v2/texts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmsRequest {
    pub data: SmsData,
    pub skip_delete_file: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmsData {
    pub addresses: Vec<String>,
    pub message: String,
    pub target_device_iden: String,
}

impl SmsRequest {
    pub fn new(target_device_iden: &str, addresses: &[String], message: &str) -> Self {
        Self {
            data: SmsData {
                addresses: addresses.to_vec(),
                message: message.to_string(),
                target_device_iden: target_device_iden.to_string(),
            },
            skip_delete_file: false,
        }
    }
}

/// Converts the API's fractional unix timestamps.
pub fn timestamp_to_datetime(ts: f64) -> Option<DateTime<Utc>> {
    if ts <= 0.0 || !ts.is_finite() {
        return None;
    }
    let secs = ts.trunc() as i64;
    let nanos = ((ts.fract()) * 1_000_000_000.0) as u32;
    Utc.timestamp_opt(secs, nanos).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_missing_fields_default() {
        let device: Device = serde_json::from_value(json!({"iden": "abc"})).unwrap();
        assert_eq!(device.iden, "abc");
        assert_eq!(device.nickname, "");
        assert!(!device.active);
        assert!(!device.can_relay_sms());
    }

    #[test]
    fn test_device_keeps_unknown_fields() {
        let raw = json!({
            "iden": "abc",
            "nickname": "Phone",
            "active": true,
            "icon": "phone",
            "app_version": 8623
        });
        let device: Device = serde_json::from_value(raw).unwrap();
        assert_eq!(device.extra.get("icon"), Some(&json!("phone")));

        let back = serde_json::to_value(&device).unwrap();
        assert_eq!(back["app_version"], json!(8623));
        assert_eq!(back["nickname"], json!("Phone"));
    }

    #[test]
    fn test_device_display_name() {
        let mut device = Device {
            iden: "d1".to_string(),
            ..Default::default()
        };
        assert_eq!(device.display_name(), "d1");

        device.manufacturer = "Google".to_string();
        device.model = "Pixel 8".to_string();
        assert_eq!(device.display_name(), "Google Pixel 8");

        device.nickname = "Work phone".to_string();
        assert_eq!(device.display_name(), "Work phone");
    }

    #[test]
    fn test_note_serializes_with_type_tag() {
        let push = Push::Note {
            title: "Hi".to_string(),
            body: "there".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&push).unwrap(),
            json!({"type": "note", "title": "Hi", "body": "there"})
        );
    }

    #[test]
    fn test_ephemeral_serializes_as_push_envelope() {
        let push = Push::Ephemeral {
            payload: json!({"type": "clip", "body": "copied"}),
        };
        assert!(push.is_ephemeral());
        assert_eq!(
            serde_json::to_value(&push).unwrap(),
            json!({"type": "push", "push": {"type": "clip", "body": "copied"}})
        );
    }

    #[test]
    fn test_push_request_device_targeting() {
        let push = Push::Link {
            title: "t".to_string(),
            body: "b".to_string(),
            url: "https://example.com".to_string(),
        };

        let untargeted = serde_json::to_value(PushRequest::new(push.clone())).unwrap();
        assert!(untargeted.get("device_iden").is_none());
        assert_eq!(untargeted["type"], "link");

        let targeted = serde_json::to_value(PushRequest::new(push).to_device("dev1")).unwrap();
        assert_eq!(targeted["device_iden"], "dev1");
        assert_eq!(targeted["url"], "https://example.com");
    }

    #[test]
    fn test_sms_request_shape() {
        let req = SmsRequest::new("phone1", &["+15551234".to_string()], "hello");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "data": {
                    "addresses": ["+15551234"],
                    "message": "hello",
                    "target_device_iden": "phone1"
                },
                "skip_delete_file": false
            })
        );
    }

    #[test]
    fn test_pending_upload_with_slot() {
        let pending = PendingUpload {
            local_file_name: "/tmp/a.png".to_string(),
            body: "look".to_string(),
            ..Default::default()
        };
        let slot = UploadSlot {
            file_name: "a.png".to_string(),
            file_type: "image/png".to_string(),
            file_url: "U1".to_string(),
            upload_url: "U2".to_string(),
        };

        let pending = pending.with_slot(slot);
        assert_eq!(pending.upload_url, "U2");
        assert_eq!(
            pending.to_push(),
            Push::File {
                file_name: "a.png".to_string(),
                file_type: "image/png".to_string(),
                file_url: "U1".to_string(),
                body: "look".to_string(),
            }
        );
    }

    #[test]
    fn test_timestamp_to_datetime() {
        let dt = timestamp_to_datetime(1_700_000_000.5).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert!(timestamp_to_datetime(0.0).is_none());

        let account = Account::default();
        assert!(account.created_at().is_none());
    }
}
