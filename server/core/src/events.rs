use serde::{Deserialize, Serialize};

use crate::actor::ActorIdentity;
use crate::ids::ChannelId;

/// One voice-state snapshot as delivered by the platform feed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoiceSnapshot {
    pub channel: Option<ChannelId>,
    pub server_mute: bool,
    pub self_mute: bool,
    pub server_deaf: bool,
    pub self_deaf: bool,
    pub streaming: bool,
    pub video: bool,
}

impl VoiceSnapshot {
    pub fn in_channel(channel: ChannelId) -> Self {
        Self { channel: Some(channel), ..Self::default() }
    }

    fn deaf_count(&self) -> u8 {
        self.server_deaf as u8 + self.self_deaf as u8
    }

    fn mute_count(&self) -> u8 {
        self.server_mute as u8 + self.self_mute as u8
    }

    fn stream_count(&self) -> u8 {
        self.streaming as u8 + self.video as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Joined,
    Left,
    Muted,
    Unmuted,
    Deafened,
    Undeafened,
    StartedStreaming,
    StoppedStreaming,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Joined => "joined",
            Action::Left => "left",
            Action::Muted => "muted",
            Action::Unmuted => "unmuted",
            Action::Deafened => "deafened",
            Action::Undeafened => "undeafened",
            Action::StartedStreaming => "started_streaming",
            Action::StoppedStreaming => "stopped_streaming",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "joined" => Action::Joined,
            "left" => Action::Left,
            "muted" => Action::Muted,
            "unmuted" => Action::Unmuted,
            "deafened" => Action::Deafened,
            "undeafened" => Action::Undeafened,
            "started_streaming" => Action::StartedStreaming,
            "stopped_streaming" => Action::StoppedStreaming,
            _ => return None,
        })
    }

    /// Canonical body template, filled with the actor's display name.
    pub fn message(&self, who: &str) -> String {
        match self {
            Action::Joined => format!("{who} joined the voice channel"),
            Action::Left => format!("{who} left the voice channel"),
            Action::Muted => format!("{who} was muted"),
            Action::Unmuted => format!("{who} was unmuted"),
            Action::Deafened => format!("{who} was deafened"),
            Action::Undeafened => format!("{who} was undeafened"),
            Action::StartedStreaming => format!("{who} started streaming"),
            Action::StoppedStreaming => format!("{who} stopped streaming"),
        }
    }
}

/// Derive a single action from a before/after snapshot pair.
///
/// Precedence is load-bearing: one platform update can flip several flags at
/// once, and exactly one representative action must win. Location beats
/// deafen beats mute beats streaming; deafen is checked before mute because
/// clients set both flags atomically when deafening.
pub fn classify(before: &VoiceSnapshot, after: &VoiceSnapshot) -> Option<Action> {
    match (before.channel, after.channel) {
        (None, Some(_)) => return Some(Action::Joined),
        (Some(_), None) => return Some(Action::Left),
        _ => {}
    }

    if after.deaf_count() > before.deaf_count() {
        return Some(Action::Deafened);
    }
    if after.deaf_count() < before.deaf_count() {
        return Some(Action::Undeafened);
    }

    if after.mute_count() > before.mute_count() {
        return Some(Action::Muted);
    }
    if after.mute_count() < before.mute_count() {
        return Some(Action::Unmuted);
    }

    if after.stream_count() > before.stream_count() {
        return Some(Action::StartedStreaming);
    }
    if after.stream_count() < before.stream_count() {
        return Some(Action::StoppedStreaming);
    }

    None
}

/// One classified transition, alive for a single dispatch cycle.
#[derive(Clone, Debug)]
pub struct Event {
    pub actor: ActorIdentity,
    pub action: Action,
    pub channel: ChannelId,
}

impl Event {
    /// `None` here means "no tracked change"; it is frequent and never an
    /// error.
    pub fn from_transition(
        actor: ActorIdentity,
        before: &VoiceSnapshot,
        after: &VoiceSnapshot,
    ) -> Option<Self> {
        let action = classify(before, after)?;
        let channel = before.channel.or(after.channel)?;
        Some(Self { actor, action, channel })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{GuildId, UserId};

    fn identity() -> ActorIdentity {
        ActorIdentity {
            user_id: UserId::new(),
            guild_id: GuildId::new(),
            display_name: "riley".into(),
            roles: vec![],
        }
    }

    #[test]
    fn join_and_leave() {
        let ch = ChannelId::new();
        let out = VoiceSnapshot::default();
        let inside = VoiceSnapshot::in_channel(ch);
        assert_eq!(classify(&out, &inside), Some(Action::Joined));
        assert_eq!(classify(&inside, &out), Some(Action::Left));
    }

    #[test]
    fn join_dominates_simultaneous_flag_flips() {
        let ch = ChannelId::new();
        let before = VoiceSnapshot::default();
        let after = VoiceSnapshot {
            channel: Some(ch),
            self_mute: true,
            self_deaf: true,
            streaming: true,
            ..VoiceSnapshot::default()
        };
        assert_eq!(classify(&before, &after), Some(Action::Joined));
    }

    #[test]
    fn deafen_wins_over_simultaneous_mute() {
        let ch = ChannelId::new();
        let before = VoiceSnapshot::in_channel(ch);
        let after = VoiceSnapshot {
            self_mute: true,
            self_deaf: true,
            ..VoiceSnapshot::in_channel(ch)
        };
        assert_eq!(classify(&before, &after), Some(Action::Deafened));
    }

    #[test]
    fn undeafen_wins_over_simultaneous_unmute() {
        let ch = ChannelId::new();
        let before = VoiceSnapshot {
            self_mute: true,
            self_deaf: true,
            ..VoiceSnapshot::in_channel(ch)
        };
        let after = VoiceSnapshot::in_channel(ch);
        assert_eq!(classify(&before, &after), Some(Action::Undeafened));
    }

    #[test]
    fn server_and_self_flags_count_separately() {
        let ch = ChannelId::new();
        // Already self-muted; a server mute on top is still a mute.
        let before = VoiceSnapshot { self_mute: true, ..VoiceSnapshot::in_channel(ch) };
        let after = VoiceSnapshot {
            self_mute: true,
            server_mute: true,
            ..VoiceSnapshot::in_channel(ch)
        };
        assert_eq!(classify(&before, &after), Some(Action::Muted));
    }

    #[test]
    fn stream_transitions() {
        let ch = ChannelId::new();
        let plain = VoiceSnapshot::in_channel(ch);
        let live = VoiceSnapshot { streaming: true, ..VoiceSnapshot::in_channel(ch) };
        assert_eq!(classify(&plain, &live), Some(Action::StartedStreaming));
        assert_eq!(classify(&live, &plain), Some(Action::StoppedStreaming));
    }

    #[test]
    fn identical_snapshots_are_no_change() {
        let ch = ChannelId::new();
        let s = VoiceSnapshot { self_mute: true, ..VoiceSnapshot::in_channel(ch) };
        assert_eq!(classify(&s, &s), None);
        assert!(Event::from_transition(identity(), &s, &s).is_none());
    }

    #[test]
    fn channel_move_without_flag_change_is_no_change() {
        let a = VoiceSnapshot::in_channel(ChannelId::new());
        let b = VoiceSnapshot::in_channel(ChannelId::new());
        assert_eq!(classify(&a, &b), None);
    }

    #[test]
    fn event_channel_prefers_before() {
        let ch = ChannelId::new();
        let inside = VoiceSnapshot::in_channel(ch);
        let ev = Event::from_transition(identity(), &inside, &VoiceSnapshot::default()).unwrap();
        assert_eq!(ev.action, Action::Left);
        assert_eq!(ev.channel, ch);
    }

    #[test]
    fn action_string_forms_round_trip() {
        for a in [
            Action::Joined,
            Action::Left,
            Action::Muted,
            Action::Unmuted,
            Action::Deafened,
            Action::Undeafened,
            Action::StartedStreaming,
            Action::StoppedStreaming,
        ] {
            assert_eq!(Action::from_str(a.as_str()), Some(a));
        }
        assert_eq!(Action::from_str("screamed"), None);
    }
}
