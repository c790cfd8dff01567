//! Authentication state shared by every operation.
//!
//! A `Session` holds the access token together with the account identity and
//! device list fetched with it. Every mutation goes through one of the
//! methods here so the client can tell when the session became authorized.

use serde::{Deserialize, Serialize};

use crate::models::Device;

/// The on-disk form of a session.
///
/// Field names match the credential file written by earlier releases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedCredential {
    pub access_token: String,
    pub iden: String,
    pub name: String,
    pub devices: Vec<Device>,
}

/// Current authentication state for one client.
#[derive(Debug, Clone, Default)]
pub struct Session {
    client_id: String,
    client_secret: String,
    auth_token: String,
    account_iden: String,
    account_name: String,
    devices: Vec<Device>,
}

impl Session {
    /// Creates an unauthenticated session for an OAuth client.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Default::default()
        }
    }

    /// Restores token, identity and devices from a stored credential.
    pub fn restore(&mut self, credential: PersistedCredential) {
        self.auth_token = credential.access_token;
        self.account_iden = credential.iden;
        self.account_name = credential.name;
        self.devices = credential.devices;
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn account_iden(&self) -> &str {
        &self.account_iden
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Returns true if a token is held.
    pub fn is_authenticated(&self) -> bool {
        !self.auth_token.is_empty()
    }

    /// Stores a freshly acquired token.
    ///
    /// Cached identity and devices belong to the previous token, so they are
    /// dropped.
    pub fn authorize(&mut self, token: impl Into<String>) {
        self.auth_token = token.into();
        self.account_iden.clear();
        self.account_name.clear();
        self.devices.clear();
    }

    pub fn set_identity(&mut self, iden: impl Into<String>, name: impl Into<String>) {
        self.account_iden = iden.into();
        self.account_name = name.into();
    }

    /// Replaces the whole device list.
    pub fn set_devices(&mut self, devices: Vec<Device>) {
        self.devices = devices;
    }

    /// Forgets the token and everything fetched with it.
    pub fn clear(&mut self) {
        self.authorize(String::new());
    }

    /// Snapshot in the persisted format.
    pub fn to_credential(&self) -> PersistedCredential {
        PersistedCredential {
            access_token: self.auth_token.clone(),
            iden: self.account_iden.clone(),
            name: self.account_name.clone(),
            devices: self.devices.clone(),
        }
    }

    /// Token shortened for log output.
    pub fn masked_token(&self) -> String {
        mask_token(&self.auth_token)
    }
}

/// Masks all but the first and last four characters of a token.
pub fn mask_token(token: &str) -> String {
    if token.chars().count() > 8 {
        let head: String = token.chars().take(4).collect();
        let tail: String = token
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(iden: &str) -> Device {
        Device {
            iden: iden.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_session_is_unauthenticated() {
        let session = Session::new("client", "secret");
        assert!(!session.is_authenticated());
        assert_eq!(session.client_id(), "client");
        assert_eq!(session.client_secret(), "secret");
        assert!(session.devices().is_empty());
    }

    #[test]
    fn test_authorize_resets_cached_identity() {
        let mut session = Session::new("c", "s");
        session.authorize("old-token");
        session.set_identity("u1", "Ada");
        session.set_devices(vec![device("d1")]);

        session.authorize("new-token");
        assert_eq!(session.auth_token(), "new-token");
        assert_eq!(session.account_iden(), "");
        assert!(session.devices().is_empty());
    }

    #[test]
    fn test_restore_and_snapshot() {
        let credential = PersistedCredential {
            access_token: "o.token".to_string(),
            iden: "u1".to_string(),
            name: "Ada".to_string(),
            devices: vec![device("d1"), device("d2")],
        };

        let mut session = Session::new("c", "s");
        session.restore(credential.clone());

        assert!(session.is_authenticated());
        assert_eq!(session.account_name(), "Ada");
        assert_eq!(session.to_credential(), credential);
    }

    #[test]
    fn test_clear() {
        let mut session = Session::new("c", "s");
        session.authorize("tok");
        session.clear();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("o.0AGv7V5h1yrVo8p5"), "o.0A...o8p5");
        assert_eq!(mask_token("short"), "****");
        assert_eq!(mask_token(""), "****");
    }
}
