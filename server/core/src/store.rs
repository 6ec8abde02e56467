use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::actor::ActorRef;
use crate::errors::CoreResult;
use crate::events::{Action, Event};
use crate::ids::{ChannelId, GuildId, RoleId, UserId};
use crate::names::RuleName;
use crate::rule::Rule;

/// Predicate over persisted rules. The store executes it; the in-memory
/// store evaluates [`RuleQuery::matches`] directly, the Postgres store
/// compiles it to a WHERE clause.
#[derive(Clone, Debug)]
pub enum RuleQuery {
    /// The dispatch predicate: all rules a classified event fires.
    Matching {
        guild: GuildId,
        action: Action,
        channel: ChannelId,
        user: UserId,
        roles: Vec<RoleId>,
    },
    /// Exact lookup by canonical name within a guild.
    ByName { guild: GuildId, name: RuleName },
    /// Structural-identity lookup for idempotent authoring; the probe's name
    /// is ignored.
    Shape(Box<Rule>),
}

impl RuleQuery {
    pub fn matching(event: &Event) -> Self {
        RuleQuery::Matching {
            guild: event.actor.guild_id,
            action: event.action,
            channel: event.channel,
            user: event.actor.user_id,
            roles: event.actor.roles.clone(),
        }
    }

    pub fn by_name(guild: GuildId, name: RuleName) -> Self {
        RuleQuery::ByName { guild, name }
    }

    pub fn shape(probe: &Rule) -> Self {
        RuleQuery::Shape(Box::new(probe.clone()))
    }

    pub fn matches(&self, rule: &Rule) -> bool {
        match self {
            RuleQuery::Matching { guild, action, channel, user, roles } => {
                if rule.guild_id != *guild || rule.trigger.action != *action {
                    return false;
                }
                if let Some(scope) = rule.trigger.channel {
                    if scope != *channel {
                        return false;
                    }
                }
                match rule.trigger.actor {
                    None => true,
                    Some(ActorRef::Member(u)) => u == *user,
                    Some(ActorRef::Role(r)) => roles.contains(&r),
                }
            }
            RuleQuery::ByName { guild, name } => {
                rule.guild_id == *guild && rule.name == *name
            }
            RuleQuery::Shape(probe) => probe.same_shape(rule),
        }
    }
}

/// Document-store boundary for rules. Best effort and read-mostly; no
/// cross-call transaction guarantees.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn find_one(&self, query: &RuleQuery) -> CoreResult<Option<Rule>>;
    async fn find_many(&self, query: &RuleQuery) -> CoreResult<Vec<Rule>>;
    async fn insert_one(&self, rule: &Rule) -> CoreResult<()>;
    /// Deletes the first match and returns it, if any.
    async fn delete_one(&self, query: &RuleQuery) -> CoreResult<Option<Rule>>;
    /// All rules of a guild, in insertion order (for listing commands).
    async fn list_guild(&self, guild: GuildId) -> CoreResult<Vec<Rule>>;
}

/// In-process store used by tests and single-node dev runs.
#[derive(Clone, Default)]
pub struct MemoryRuleStore {
    inner: Arc<RwLock<Vec<Rule>>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn find_one(&self, query: &RuleQuery) -> CoreResult<Option<Rule>> {
        Ok(self.inner.read().iter().find(|r| query.matches(r)).cloned())
    }

    async fn find_many(&self, query: &RuleQuery) -> CoreResult<Vec<Rule>> {
        Ok(self
            .inner
            .read()
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }

    async fn insert_one(&self, rule: &Rule) -> CoreResult<()> {
        self.inner.write().push(rule.clone());
        Ok(())
    }

    async fn delete_one(&self, query: &RuleQuery) -> CoreResult<Option<Rule>> {
        let mut rules = self.inner.write();
        if let Some(pos) = rules.iter().position(|r| query.matches(r)) {
            return Ok(Some(rules.remove(pos)));
        }
        Ok(None)
    }

    async fn list_guild(&self, guild: GuildId) -> CoreResult<Vec<Rule>> {
        Ok(self
            .inner
            .read()
            .iter()
            .filter(|r| r.guild_id == guild)
            .cloned()
            .collect())
    }
}
