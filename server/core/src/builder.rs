use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;

use crate::actor::ActorRef;
use crate::directory::ChannelDirectory;
use crate::errors::{CoreError, CoreResult};
use crate::ids::{ChannelId, GuildId, UserId};
use crate::names::{self, IndexSampler, RuleName};
use crate::rule::{Rule, Trigger};
use crate::store::{RuleQuery, RuleStore};

/// Who is asking, and with what standing.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub guild_id: GuildId,
    pub user_id: UserId,
    /// Elevated management rights on the guild.
    pub is_manager: bool,
}

/// User-supplied rule input, already parsed by the command surface.
#[derive(Clone, Debug)]
pub struct RuleDraft {
    pub trigger: Trigger,
    pub destination: ChannelId,
    pub notify: Vec<ActorRef>,
}

#[derive(Clone, Debug)]
pub enum BuildOutcome {
    /// A structurally identical rule already exists; reuse it.
    Existing(Rule),
    /// Fresh rule with an allocated name, awaiting confirmation before
    /// [`RuleBuilder::persist`].
    Proposed(Rule),
}

/// Validates, authorizes, deduplicates and names new rules.
pub struct RuleBuilder<S> {
    store: S,
    directory: Arc<dyn ChannelDirectory>,
    sampler: Mutex<Box<dyn IndexSampler>>,
}

impl<S: RuleStore> RuleBuilder<S> {
    pub fn new(
        store: S,
        directory: Arc<dyn ChannelDirectory>,
        sampler: Box<dyn IndexSampler>,
    ) -> Self {
        Self { store, directory, sampler: Mutex::new(sampler) }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn build(&self, ctx: &RequestContext, draft: RuleDraft) -> CoreResult<BuildOutcome> {
        if let Some(scope) = draft.trigger.channel {
            if !self.directory.is_voice(scope) {
                return Err(CoreError::Validation {
                    field: "trigger channel",
                    reason: "not a voice channel",
                });
            }
        }
        if !self.directory.is_text(draft.destination) {
            return Err(CoreError::Validation {
                field: "destination",
                reason: "not a text channel",
            });
        }

        check_notify_allowed(ctx, &draft.notify)?;

        // Idempotent authoring: an identical rule shape is reused, not
        // duplicated. The probe's name is ignored by the shape query.
        let probe = Rule {
            guild_id: ctx.guild_id,
            name: RuleName { left: 0, center: 0, right: 0 },
            trigger: draft.trigger.clone(),
            destination: draft.destination,
            notify: draft.notify.clone(),
            created_at: Utc::now(),
        };
        if let Some(existing) = self.store.find_one(&RuleQuery::shape(&probe)).await? {
            info!(guild = %ctx.guild_id, name = %existing.name, "reusing identical rule");
            return Ok(BuildOutcome::Existing(existing));
        }

        let name = self.allocate_name(ctx.guild_id).await?;
        info!(guild = %ctx.guild_id, name = %name, "proposed rule");
        Ok(BuildOutcome::Proposed(Rule { name, ..probe }))
    }

    /// Insert a confirmed proposal. A lost check-then-insert race surfaces
    /// here as a store error (unique index on guild + name).
    pub async fn persist(&self, rule: &Rule) -> CoreResult<()> {
        self.store.insert_one(rule).await
    }

    async fn allocate_name(&self, guild: GuildId) -> CoreResult<RuleName> {
        let mut sampler = self.sampler.lock().await;
        names::allocate(sampler.as_mut(), |name| async move {
            Ok(self
                .store
                .find_one(&RuleQuery::by_name(guild, name))
                .await?
                .is_some())
        })
        .await
    }
}

/// Creation-side mention policy: managers may notify anyone; everyone else
/// only themselves (or nobody).
pub fn check_notify_allowed(ctx: &RequestContext, notify: &[ActorRef]) -> CoreResult<()> {
    if ctx.is_manager {
        return Ok(());
    }
    let violations: Vec<ActorRef> = notify
        .iter()
        .filter(|a| !a.is_member(ctx.user_id))
        .copied()
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Authorization(violations))
    }
}

/// Deletion-side policy: managers always; otherwise only rules that mention
/// nobody, or solely the requester.
pub fn may_delete(ctx: &RequestContext, rule: &Rule) -> bool {
    if ctx.is_manager {
        return true;
    }
    match rule.notify.as_slice() {
        [] => true,
        [only] => only.is_member(ctx.user_id),
        _ => false,
    }
}
