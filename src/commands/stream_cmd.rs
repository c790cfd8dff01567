//! Realtime stream watcher.

use chrono::Local;
use clap::Args;
use pushbullet_core::{PushbulletClient, StreamEvent};

use super::CommandError;

/// Watch the realtime event stream
#[derive(Args)]
pub struct StreamCommand {
    /// Stop after this many events (keep-alives not counted)
    #[arg(long, short = 'n')]
    count: Option<usize>,
}

impl StreamCommand {
    pub async fn run(&self, client: &PushbulletClient) -> Result<(), CommandError> {
        let stream = client.start_realtime_stream().await?;
        eprintln!("Listening for events (Ctrl-C to stop)...");

        let mut seen = 0;
        while let Some(event) = stream.next_event().await {
            let Some(line) = describe(&event) else {
                tracing::debug!("keep-alive");
                continue;
            };

            println!("[{}] {}", Local::now().format("%H:%M:%S"), line);

            // Device changes invalidate the cached list
            if matches!(&event, StreamEvent::Tickle { subtype } if subtype == "device") {
                if let Err(e) = client.list_devices().await {
                    tracing::warn!("Failed to refresh devices: {}", e);
                }
            }

            seen += 1;
            if self.count.is_some_and(|count| seen >= count) {
                break;
            }
        }

        client.stop_realtime_stream().await;
        Ok(())
    }
}

/// One-line description of an event; `None` for keep-alives.
fn describe(event: &StreamEvent) -> Option<String> {
    match event {
        StreamEvent::Nop => None,
        StreamEvent::Tickle { subtype } => Some(format!("tickle: {}", subtype)),
        StreamEvent::Push { payload } => {
            let kind = payload
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("unknown");
            let text = ["title", "body", "message"]
                .iter()
                .filter_map(|key| payload.get(*key).and_then(|v| v.as_str()))
                .find(|s| !s.is_empty())
                .unwrap_or_default();
            Some(format!("push ({}): {}", kind, text))
        }
        StreamEvent::Other(value) => Some(format!("event: {}", value)),
    }
}
