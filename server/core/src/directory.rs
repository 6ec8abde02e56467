use crate::ids::{ChannelId, GuildId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    Voice,
    Text,
}

/// Read-only view of a guild's channel layout. The gateway backs this with
/// its platform cache; tests use a plain map.
pub trait ChannelDirectory: Send + Sync {
    fn kind(&self, channel: ChannelId) -> Option<ChannelKind>;

    /// All channels of the guild, in the platform's listing order. Used by
    /// the error escalation chain.
    fn guild_channels(&self, guild: GuildId) -> Vec<ChannelId>;

    /// The guild's designated system channel, if any.
    fn system_channel(&self, guild: GuildId) -> Option<ChannelId>;

    fn is_voice(&self, channel: ChannelId) -> bool {
        self.kind(channel) == Some(ChannelKind::Voice)
    }

    fn is_text(&self, channel: ChannelId) -> bool {
        self.kind(channel) == Some(ChannelKind::Text)
    }
}
