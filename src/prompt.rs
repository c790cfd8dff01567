//! Interactive token acquisition on the terminal.

use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;

use pushbullet_core::AcquireToken;

/// Opens a URL outside the program.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Hands the URL to the platform's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        let mut command = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            // `start` would split the URL at '&'
            let mut command = Command::new("rundll32");
            command.arg("url.dll,FileProtocolHandler");
            command
        } else {
            Command::new("xdg-open")
        };

        command
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
    }
}

/// Asks for an access token on stdin.
///
/// The authorization page is opened in the browser and its URL printed to
/// stderr as well, in case no browser could be started. After approving
/// access the browser lands on a URL ending in `#access_token=...`. Either
/// that URL or the bare token can be pasted back.
#[derive(Clone)]
pub struct TerminalPrompt {
    browser: Arc<dyn BrowserLauncher>,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self::with_browser(Arc::new(SystemBrowser))
    }

    pub fn with_browser(browser: Arc<dyn BrowserLauncher>) -> Self {
        Self { browser }
    }

    /// Opens the page, then reads one line of `input`.
    fn acquire_from(&self, authorize_url: &str, input: &mut dyn BufRead) -> Option<String> {
        match self.browser.open(authorize_url) {
            Ok(()) => {
                eprintln!("No access token stored. Approve access in the browser window.");
                eprintln!("If nothing opened, visit:");
            }
            Err(e) => {
                tracing::debug!("Could not launch browser: {}", e);
                eprintln!("No access token stored. Open this page and approve access:");
            }
        }
        eprintln!();
        eprintln!("  {}", authorize_url);
        eprintln!();
        eprint!("Access token: ");
        io::stderr().flush().ok()?;

        let mut line = String::new();
        let read = input.read_line(&mut line).ok()?;
        if read == 0 {
            return None;
        }

        let token = extract_token(&line);
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl AcquireToken for TerminalPrompt {
    fn acquire(&self, authorize_url: &str) -> Option<String> {
        self.acquire_from(authorize_url, &mut io::stdin().lock())
    }
}

/// Pulls the token out of pasted input, which may be the full redirect URL.
pub fn extract_token(input: &str) -> String {
    let input = input.trim();
    match input.split_once("access_token=") {
        Some((_, rest)) => rest.split('&').next().unwrap_or_default().to_string(),
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushbullet_core::authorize_url;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBrowser {
        opened: Mutex<Vec<String>>,
        fail: bool,
    }

    impl BrowserLauncher for RecordingBrowser {
        fn open(&self, url: &str) -> io::Result<()> {
            self.opened.lock().unwrap().push(url.to_string());
            if self.fail {
                Err(io::Error::new(io::ErrorKind::NotFound, "no browser"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_acquire_opens_authorize_page() {
        let browser = Arc::new(RecordingBrowser::default());
        let prompt = TerminalPrompt::with_browser(browser.clone());
        let url = authorize_url("my-client");

        let token = prompt.acquire_from(&url, &mut "o.fresh\n".as_bytes());

        assert_eq!(token, Some("o.fresh".to_string()));
        assert_eq!(*browser.opened.lock().unwrap(), vec![url]);
    }

    #[test]
    fn test_acquire_still_reads_token_when_browser_fails() {
        let browser = Arc::new(RecordingBrowser {
            fail: true,
            ..Default::default()
        });
        let prompt = TerminalPrompt::with_browser(browser.clone());

        let token = prompt.acquire_from(
            &authorize_url("my-client"),
            &mut "https://www.pushbullet.com/login-success#access_token=o.pasted\n".as_bytes(),
        );

        assert_eq!(token, Some("o.pasted".to_string()));
        assert_eq!(browser.opened.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_acquire_eof_or_blank_is_cancelled() {
        let prompt = TerminalPrompt::with_browser(Arc::new(RecordingBrowser::default()));

        assert_eq!(prompt.acquire_from("https://x", &mut "".as_bytes()), None);
        assert_eq!(prompt.acquire_from("https://x", &mut "  \n".as_bytes()), None);
    }

    #[test]
    fn test_extract_bare_token() {
        assert_eq!(extract_token("  o.0AGv7V5h1yrVo8p5\n"), "o.0AGv7V5h1yrVo8p5");
    }

    #[test]
    fn test_extract_from_redirect_url() {
        assert_eq!(
            extract_token(
                "https://www.pushbullet.com/login-success#access_token=o.0AGv7V5h1yrVo8p5yC3GdkBeOfY"
            ),
            "o.0AGv7V5h1yrVo8p5yC3GdkBeOfY"
        );
        assert_eq!(
            extract_token("https://x/login-success#access_token=o.abc&state=1"),
            "o.abc"
        );
    }

    #[test]
    fn test_extract_empty() {
        assert_eq!(extract_token("   \n"), "");
    }
}
