//! Token acquisition and the "authorized" notification.

use crate::session::PersistedCredential;

/// Page the user visits to grant the client an access token.
pub const AUTHORIZE_URL: &str = "https://www.pushbullet.com/authorize";

/// Where the service redirects after granting access. The token is in the
/// fragment of this URL.
pub const REDIRECT_URI: &str = "https://www.pushbullet.com/login-success";

/// Builds the authorization page URL for a client.
pub fn authorize_url(client_id: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=token",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(REDIRECT_URI)
    )
}

/// Obtains an access token from the user.
///
/// Called with the authorization page URL whenever an operation needs a token
/// and none is held. Returning `None`, or an empty string, cancels the
/// operation that asked.
pub trait AcquireToken: Send + Sync {
    fn acquire(&self, authorize_url: &str) -> Option<String>;
}

impl<F> AcquireToken for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn acquire(&self, authorize_url: &str) -> Option<String> {
        self(authorize_url)
    }
}

/// Acquirer for non-interactive hosts: never produces a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl AcquireToken for NoPrompt {
    fn acquire(&self, _authorize_url: &str) -> Option<String> {
        None
    }
}

/// Receives the session snapshot each time the client becomes authorized.
pub trait AuthorizedHook: Send + Sync {
    fn on_authorized(&self, credential: &PersistedCredential);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url() {
        assert_eq!(
            authorize_url("abc123"),
            "https://www.pushbullet.com/authorize?client_id=abc123\
             &redirect_uri=https%3A%2F%2Fwww.pushbullet.com%2Flogin-success\
             &response_type=token"
        );
    }

    #[test]
    fn test_authorize_url_encodes_client_id() {
        assert!(authorize_url("a b&c").contains("client_id=a%20b%26c&"));
    }

    #[test]
    fn test_closure_acquirer() {
        let acquirer = |url: &str| {
            assert!(url.starts_with(AUTHORIZE_URL));
            Some("o.token".to_string())
        };
        assert_eq!(
            acquirer.acquire(&authorize_url("id")),
            Some("o.token".to_string())
        );
        assert_eq!(NoPrompt.acquire("ignored"), None);
    }
}
