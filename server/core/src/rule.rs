use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::ActorRef;
use crate::events::Action;
use crate::ids::{ChannelId, GuildId};
use crate::names::RuleName;

/// The condition part of a rule: who, what, where. `None` actor means any
/// actor; `None` channel means any voice channel in the guild.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub actor: Option<ActorRef>,
    pub action: Action,
    pub channel: Option<ChannelId>,
}

/// A persisted notification rule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rule {
    pub guild_id: GuildId,
    pub name: RuleName,
    pub trigger: Trigger,
    pub destination: ChannelId,
    /// Who to mention; order is preserved for rendering. May be empty.
    pub notify: Vec<ActorRef>,
    pub created_at: DateTime<Utc>,
}

impl Rule {
    /// Structural identity for idempotent authoring: same scope, trigger,
    /// destination, and notify set (order-insensitive). The name is
    /// deliberately ignored.
    pub fn same_shape(&self, other: &Rule) -> bool {
        self.guild_id == other.guild_id
            && self.trigger == other.trigger
            && self.destination == other.destination
            && notify_set(&self.notify) == notify_set(&other.notify)
    }
}

fn notify_set(notify: &[ActorRef]) -> HashSet<ActorRef> {
    notify.iter().copied().collect()
}
