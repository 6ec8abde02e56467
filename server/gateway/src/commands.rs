use std::future::Future;
use std::time::Duration;

use tracing::info;

use vw_core::{
    builder::may_delete, names, BuildOutcome, CoreResult, Outcome, PendingAction,
    RequestContext, Rule, RuleBuilder, RuleDraft, RuleName, RuleQuery, RuleStore,
};

/// Outcome of an authoring command, ready for the UI layer to render.
#[derive(Clone, Debug)]
pub enum CreateReply {
    Created(Rule),
    /// Identical rule already existed; nothing new was stored.
    Reused(Rule),
    Cancelled,
    TimedOut,
}

/// Outcome of a deletion command.
#[derive(Clone, Debug)]
pub enum DeleteReply {
    Deleted(Rule),
    NotFound,
    /// The typed name was close but not exact; show the correction, take no
    /// action.
    DidYouMean(RuleName),
    /// Requester may not delete this rule; return the read-only view.
    Refused(Rule),
    Cancelled,
    TimedOut,
}

/// Create a rule: validate and propose, surface the proposal via `present`,
/// then persist only once the external confirmation arrives.
pub async fn handle_create<S, P, C>(
    builder: &RuleBuilder<S>,
    ctx: &RequestContext,
    draft: RuleDraft,
    present: P,
    decision: PendingAction<()>,
    timeout: Duration,
    cleanup: C,
) -> CoreResult<CreateReply>
where
    S: RuleStore,
    P: FnOnce(&Rule),
    C: Future<Output = anyhow::Result<()>>,
{
    match builder.build(ctx, draft).await? {
        BuildOutcome::Existing(rule) => Ok(CreateReply::Reused(rule)),
        BuildOutcome::Proposed(rule) => {
            present(&rule);
            match decision.wait(timeout, cleanup).await {
                Outcome::Confirmed(()) => {
                    builder.persist(&rule).await?;
                    info!(name = %rule.name, "rule created");
                    Ok(CreateReply::Created(rule))
                }
                Outcome::Cancelled => Ok(CreateReply::Cancelled),
                Outcome::TimedOut => Ok(CreateReply::TimedOut),
            }
        }
    }
}

/// Delete a rule by typed identifier. Fuzzy matches force a correction round
/// trip; authorization mirrors the creation-side mention policy.
pub async fn handle_delete<S, P, C>(
    store: &S,
    ctx: &RequestContext,
    typed: &str,
    present: P,
    decision: PendingAction<()>,
    timeout: Duration,
    cleanup: C,
) -> CoreResult<DeleteReply>
where
    S: RuleStore,
    P: FnOnce(&Rule),
    C: Future<Output = anyhow::Result<()>>,
{
    let resolved = names::resolve(typed)?;
    if !resolved.exact {
        return Ok(DeleteReply::DidYouMean(resolved.name));
    }

    let query = RuleQuery::by_name(ctx.guild_id, resolved.name);
    let Some(rule) = store.find_one(&query).await? else {
        return Ok(DeleteReply::NotFound);
    };

    if !may_delete(ctx, &rule) {
        return Ok(DeleteReply::Refused(rule));
    }

    present(&rule);
    match decision.wait(timeout, cleanup).await {
        Outcome::Confirmed(()) => {
            let deleted = store.delete_one(&query).await?;
            match deleted {
                Some(rule) => {
                    info!(name = %rule.name, "rule deleted");
                    Ok(DeleteReply::Deleted(rule))
                }
                // Raced with another deletion; the rule is gone either way.
                None => Ok(DeleteReply::NotFound),
            }
        }
        Outcome::Cancelled => Ok(DeleteReply::Cancelled),
        Outcome::TimedOut => Ok(DeleteReply::TimedOut),
    }
}

/// All rules of the requester's guild, for the listing command.
pub async fn handle_list<S: RuleStore>(store: &S, ctx: &RequestContext) -> CoreResult<Vec<Rule>> {
    store.list_guild(ctx.guild_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use vw_core::{
        pending, Action, ActorRef, ChannelDirectory, ChannelId, ChannelKind, GuildId,
        MemoryRuleStore, RandSampler, Trigger, UserId, CONFIRM_TIMEOUT,
    };

    #[derive(Default)]
    struct StubDirectory {
        kinds: HashMap<ChannelId, ChannelKind>,
    }

    impl StubDirectory {
        fn voice(mut self, id: ChannelId) -> Self {
            self.kinds.insert(id, ChannelKind::Voice);
            self
        }

        fn text(mut self, id: ChannelId) -> Self {
            self.kinds.insert(id, ChannelKind::Text);
            self
        }
    }

    impl ChannelDirectory for StubDirectory {
        fn kind(&self, channel: ChannelId) -> Option<ChannelKind> {
            self.kinds.get(&channel).copied()
        }

        fn guild_channels(&self, _guild: GuildId) -> Vec<ChannelId> {
            self.kinds.keys().copied().collect()
        }

        fn system_channel(&self, _guild: GuildId) -> Option<ChannelId> {
            None
        }
    }

    async fn noop() -> anyhow::Result<()> {
        Ok(())
    }

    fn ctx(is_manager: bool) -> RequestContext {
        RequestContext { guild_id: GuildId::new(), user_id: UserId::new(), is_manager }
    }

    struct Fixture {
        builder: RuleBuilder<MemoryRuleStore>,
        voice: ChannelId,
        text: ChannelId,
    }

    fn fixture() -> Fixture {
        let voice = ChannelId::new();
        let text = ChannelId::new();
        let directory = StubDirectory::default().voice(voice).text(text);
        Fixture {
            builder: RuleBuilder::new(
                MemoryRuleStore::new(),
                Arc::new(directory),
                Box::new(RandSampler),
            ),
            voice,
            text,
        }
    }

    fn draft(f: &Fixture) -> RuleDraft {
        RuleDraft {
            trigger: Trigger { actor: None, action: Action::Joined, channel: Some(f.voice) },
            destination: f.text,
            notify: vec![],
        }
    }

    #[tokio::test]
    async fn confirmed_create_persists() {
        let f = fixture();
        let requester = ctx(true);
        let (handle, decision) = pending();
        handle.confirm(());
        let reply = handle_create(
            &f.builder,
            &requester,
            draft(&f),
            |_| {},
            decision,
            CONFIRM_TIMEOUT,
            noop(),
        )
        .await
        .unwrap();
        assert!(matches!(reply, CreateReply::Created(_)));
        assert_eq!(f.builder.store().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_create_stores_nothing() {
        let f = fixture();
        let requester = ctx(true);
        let (handle, decision) = pending();
        handle.cancel();
        let reply = handle_create(
            &f.builder,
            &requester,
            draft(&f),
            |_| {},
            decision,
            CONFIRM_TIMEOUT,
            noop(),
        )
        .await
        .unwrap();
        assert!(matches!(reply, CreateReply::Cancelled));
        assert!(f.builder.store().is_empty());
    }

    #[tokio::test]
    async fn fuzzy_name_forces_correction_without_deleting() {
        let f = fixture();
        let requester = ctx(true);
        let rule = persisted_rule(&f, &requester, vec![]).await;

        let typed = format!("{}x", rule.name.canonical());
        let (_handle, decision) = pending();
        let reply = handle_delete(
            f.builder.store(),
            &requester,
            &typed,
            |_| {},
            decision,
            CONFIRM_TIMEOUT,
            noop(),
        )
        .await
        .unwrap();
        match reply {
            DeleteReply::DidYouMean(corrected) => assert_eq!(corrected, rule.name),
            other => panic!("expected correction, got {other:?}"),
        }
        assert_eq!(f.builder.store().len(), 1);
    }

    #[tokio::test]
    async fn refusal_when_requester_is_not_sole_mention() {
        let f = fixture();
        let manager = ctx(true);
        let user_a = UserId::new();
        let requester = RequestContext {
            guild_id: manager.guild_id,
            user_id: UserId::new(),
            is_manager: false,
        };
        let rule = persisted_rule(
            &f,
            &manager,
            vec![ActorRef::Member(user_a), ActorRef::Member(requester.user_id)],
        )
        .await;

        let (_handle, decision) = pending();
        let reply = handle_delete(
            f.builder.store(),
            &requester,
            &rule.name.canonical(),
            |_| {},
            decision,
            CONFIRM_TIMEOUT,
            noop(),
        )
        .await
        .unwrap();
        match reply {
            DeleteReply::Refused(view) => assert_eq!(view.name, rule.name),
            other => panic!("expected refusal, got {other:?}"),
        }
        assert_eq!(f.builder.store().len(), 1);
    }

    #[tokio::test]
    async fn confirmed_delete_removes_the_rule() {
        let f = fixture();
        let requester = ctx(true);
        let rule = persisted_rule(&f, &requester, vec![]).await;

        let (handle, decision) = pending();
        handle.confirm(());
        let reply = handle_delete(
            f.builder.store(),
            &requester,
            &rule.name.canonical(),
            |_| {},
            decision,
            CONFIRM_TIMEOUT,
            noop(),
        )
        .await
        .unwrap();
        assert!(matches!(reply, DeleteReply::Deleted(_)));
        assert!(f.builder.store().is_empty());
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_guild() {
        let f = fixture();
        let requester = ctx(true);
        persisted_rule(&f, &requester, vec![]).await;

        let same = handle_list(f.builder.store(), &requester).await.unwrap();
        assert_eq!(same.len(), 1);

        let elsewhere = RequestContext { guild_id: GuildId::new(), ..requester };
        let none = handle_list(f.builder.store(), &elsewhere).await.unwrap();
        assert!(none.is_empty());
    }

    async fn persisted_rule(
        f: &Fixture,
        requester: &RequestContext,
        notify: Vec<ActorRef>,
    ) -> Rule {
        let mut d = draft(f);
        d.notify = notify;
        match f.builder.build(requester, d).await.unwrap() {
            BuildOutcome::Proposed(rule) => {
                f.builder.persist(&rule).await.unwrap();
                rule
            }
            BuildOutcome::Existing(rule) => rule,
        }
    }
}
