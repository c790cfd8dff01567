use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod prompt;

use commands::{
    AuthCommand, ConfigCommand, DevicesCommand, EphemeralCommand, FileCommand, LinkCommand,
    MeCommand, NoteCommand, SmsCommand, StreamCommand,
};
use config::Config;
use prompt::TerminalPrompt;
use pushbullet_core::{PushError, PushbulletClient};

#[derive(Parser)]
#[command(name = "pb")]
#[command(version)]
#[command(about = "Send pushes, files and SMS through Pushbullet", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Push a note
    Note(NoteCommand),

    /// Push a link
    Link(LinkCommand),

    /// Upload and push a file
    File(FileCommand),

    /// Send a raw ephemeral push
    Ephemeral(EphemeralCommand),

    /// Send an SMS through a phone
    Sms(SmsCommand),

    /// Show the current account
    Me(MeCommand),

    /// List devices
    Devices(DevicesCommand),

    /// Print realtime events
    Stream(StreamCommand),

    /// Manage authentication
    Auth(AuthCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pb=info,pushbullet_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    let client = || build_client(&config);

    match cli.command {
        Some(Commands::Note(cmd)) => cmd.run(&client()?).await?,
        Some(Commands::Link(cmd)) => cmd.run(&client()?).await?,
        Some(Commands::File(cmd)) => cmd.run(&client()?).await?,
        Some(Commands::Ephemeral(cmd)) => cmd.run(&client()?).await?,
        Some(Commands::Sms(cmd)) => cmd.run(&client()?).await?,
        Some(Commands::Me(cmd)) => cmd.run(&client()?).await?,
        Some(Commands::Devices(cmd)) => cmd.run(&client()?).await?,
        Some(Commands::Stream(cmd)) => cmd.run(&client()?).await?,
        Some(Commands::Auth(cmd)) => cmd.run(&client()?, &config).await?,
        Some(Commands::Config(cmd)) => cmd.run(&config)?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

fn build_client(config: &Config) -> Result<PushbulletClient, PushError> {
    PushbulletClient::builder(&config.client_id.value, &config.client_secret.value)
        .api_url(config.api_url.value.clone())
        .stream_url(config.stream_url.value.clone())
        .timeout(config.request_timeout())
        .token_store(config.token_store())
        .acquirer(Arc::new(TerminalPrompt::new()))
        .build()
}
