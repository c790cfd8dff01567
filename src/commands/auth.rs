//! Authentication commands.

use clap::{Args, Subcommand};
use pushbullet_core::session::mask_token;
use pushbullet_core::PushbulletClient;

use super::CommandError;
use crate::config::Config;

/// Authentication commands
#[derive(Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    command: AuthSubcommand,
}

#[derive(Subcommand)]
enum AuthSubcommand {
    /// Log in (asks for an access token) and fetch account details
    Login,
    /// Log out (remove the stored credential)
    Logout,
    /// Show authentication status
    Status,
}

impl AuthCommand {
    pub async fn run(
        &self,
        client: &PushbulletClient,
        config: &Config,
    ) -> Result<(), CommandError> {
        match &self.command {
            AuthSubcommand::Login => {
                let account = client.me().await?;
                println!("Authenticated as {}", account.name);
                Ok(())
            }
            AuthSubcommand::Logout => {
                client.logout().await;
                println!("Logged out.");
                Ok(())
            }
            AuthSubcommand::Status => {
                status(client, config);
                Ok(())
            }
        }
    }
}

fn status(client: &PushbulletClient, config: &Config) {
    let session = client.session();
    let store = config.token_store();

    if session.is_authenticated() {
        println!("Logged in (access token: {})", mask_token(session.auth_token()));
        if !session.account_name().is_empty() {
            println!("Account: {} ({})", session.account_name(), session.account_iden());
        }
        println!("Devices cached: {}", session.devices().len());
    } else {
        println!("Not logged in. Run 'pb auth login' to authenticate.");
    }

    if store.exists() {
        println!("Credential file: {}", store.path().display());
    } else {
        println!("Credential file: {} (not found)", store.path().display());
    }
}
