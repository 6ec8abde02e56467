use chrono::Utc;
use tracing::warn;

use crate::directory::ChannelDirectory;
use crate::dispatch::{Footer, Notification, NotificationSink};
use crate::ids::{ChannelId, GuildId};

const REPORT_COLOR: u32 = 0xCC_33_22;

/// Best-effort internal-error report: the originating channel first, then the
/// guild's system channel, then every guild channel in listing order. The
/// first channel that accepts wins; if all refuse, the report is dropped.
/// This function never fails.
pub async fn report_failure(
    sink: &dyn NotificationSink,
    directory: &dyn ChannelDirectory,
    guild: GuildId,
    origin: Option<ChannelId>,
    text: &str,
) -> Option<ChannelId> {
    let mut tried: Vec<ChannelId> = Vec::new();
    let mut candidates: Vec<ChannelId> = Vec::new();
    if let Some(ch) = origin {
        candidates.push(ch);
    }
    if let Some(ch) = directory.system_channel(guild) {
        candidates.push(ch);
    }
    candidates.extend(directory.guild_channels(guild));

    for channel in candidates {
        if tried.contains(&channel) {
            continue;
        }
        tried.push(channel);
        let note = Notification {
            mentions: Vec::new(),
            body: text.to_string(),
            footer: Footer {
                color: REPORT_COLOR,
                text: "internal error".to_string(),
                timestamp: Utc::now(),
            },
        };
        match sink.send(channel, note).await {
            Ok(()) => return Some(channel),
            Err(refused) => {
                warn!(%channel, %refused, "error report refused, trying next channel");
            }
        }
    }

    warn!(%guild, "error report dropped: no channel accepted it");
    None
}
