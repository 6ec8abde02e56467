use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use vw_core::{
    ChannelDirectory, ChannelId, ChannelKind, DeliveryRefused, GuildId, Notification,
    NotificationSink,
};

/// Per-destination push registry. One writer per destination channel owns the
/// platform send; we enqueue to it via mpsc and drop on backpressure.
#[derive(Default)]
pub struct PushHub {
    inner: DashMap<ChannelId, mpsc::Sender<Notification>>,
}

impl PushHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, channel: ChannelId, tx: mpsc::Sender<Notification>) {
        self.inner.insert(channel, tx);
    }

    pub fn unregister(&self, channel: ChannelId) {
        self.inner.remove(&channel);
    }
}

#[async_trait]
impl NotificationSink for PushHub {
    async fn send(
        &self,
        destination: ChannelId,
        note: Notification,
    ) -> Result<(), DeliveryRefused> {
        let Some(tx) = self.inner.get(&destination).map(|e| e.value().clone()) else {
            return Err(DeliveryRefused("destination not reachable"));
        };
        if tx.try_send(note).is_err() {
            // Backpressured writer: drop, best effort only.
            debug!(%destination, "push queue full, notification dropped");
        }
        Ok(())
    }
}

/// Cached channel layout per guild, fed by the platform connection.
#[derive(Default)]
pub struct DirectoryCache {
    kinds: DashMap<ChannelId, ChannelKind>,
    order: DashMap<GuildId, Vec<ChannelId>>,
    system: DashMap<GuildId, ChannelId>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_channel(&self, guild: GuildId, channel: ChannelId, kind: ChannelKind) {
        self.kinds.insert(channel, kind);
        let mut order = self.order.entry(guild).or_default();
        if !order.contains(&channel) {
            order.push(channel);
        }
    }

    pub fn remove_channel(&self, guild: GuildId, channel: ChannelId) {
        self.kinds.remove(&channel);
        if let Some(mut order) = self.order.get_mut(&guild) {
            order.retain(|c| *c != channel);
        }
    }

    pub fn set_system_channel(&self, guild: GuildId, channel: ChannelId) {
        self.system.insert(guild, channel);
    }
}

impl ChannelDirectory for DirectoryCache {
    fn kind(&self, channel: ChannelId) -> Option<ChannelKind> {
        self.kinds.get(&channel).map(|e| *e.value())
    }

    fn guild_channels(&self, guild: GuildId) -> Vec<ChannelId> {
        self.order.get(&guild).map(|e| e.value().clone()).unwrap_or_default()
    }

    fn system_channel(&self, guild: GuildId) -> Option<ChannelId> {
        self.system.get(&guild).map(|e| *e.value())
    }
}
