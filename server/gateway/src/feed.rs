use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use vw_core::{
    escalate::report_failure, ActorIdentity, Dispatcher, Event, NotificationSink, RuleStore,
    VoiceSnapshot,
};

use crate::state::DirectoryCache;

/// One voice-state change as handed over by the platform connection.
#[derive(Clone, Debug)]
pub struct StateUpdate {
    pub actor: ActorIdentity,
    pub before: VoiceSnapshot,
    pub after: VoiceSnapshot,
}

/// Consume platform updates until the sender goes away. Updates that classify
/// to no tracked change are skipped silently; dispatch errors are escalated
/// best effort and never stop the loop.
pub async fn run_feed<S: RuleStore>(
    mut rx: mpsc::Receiver<StateUpdate>,
    dispatcher: Arc<Dispatcher<S>>,
    sink: Arc<dyn NotificationSink>,
    directory: Arc<DirectoryCache>,
) {
    info!("voice-state feed started");
    while let Some(update) = rx.recv().await {
        let guild = update.actor.guild_id;
        let Some(event) = Event::from_transition(update.actor, &update.before, &update.after)
        else {
            continue;
        };

        if let Err(e) = dispatcher.dispatch(&event).await {
            warn!(%guild, action = event.action.as_str(), "dispatch failed: {e}");
            report_failure(
                sink.as_ref(),
                directory.as_ref(),
                guild,
                None,
                &format!("failed to dispatch a {} event: {e}", event.action.as_str()),
            )
            .await;
        }
    }
    info!("voice-state feed closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use vw_core::{
        Action, ActorRef, ChannelId, DeliveryRefused, GuildId, MemoryRuleStore, Notification,
        Rule, RuleName, Trigger, UserId,
    };

    #[derive(Default)]
    struct CountingSink {
        sent: Mutex<HashMap<ChannelId, usize>>,
    }

    #[async_trait]
    impl NotificationSink for CountingSink {
        async fn send(
            &self,
            destination: ChannelId,
            _note: Notification,
        ) -> Result<(), DeliveryRefused> {
            *self.sent.lock().unwrap().entry(destination).or_default() += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn feed_classifies_and_dispatches() {
        let guild = GuildId::new();
        let voice = ChannelId::new();
        let dest = ChannelId::new();

        let store = MemoryRuleStore::new();
        store
            .insert_one(&Rule {
                guild_id: guild,
                name: RuleName { left: 0, center: 0, right: 0 },
                trigger: Trigger { actor: None, action: Action::Joined, channel: None },
                destination: dest,
                notify: vec![ActorRef::Member(UserId::new())],
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let sink = Arc::new(CountingSink::default());
        let dispatcher = Arc::new(Dispatcher::new(store, sink.clone()));
        let directory = Arc::new(DirectoryCache::new());

        let (tx, rx) = mpsc::channel(8);
        let feed = tokio::spawn(run_feed(rx, dispatcher, sink.clone(), directory));

        let actor = ActorIdentity {
            user_id: UserId::new(),
            guild_id: guild,
            display_name: "alex".into(),
            roles: vec![],
        };
        // A no-change update, then a join.
        tx.send(StateUpdate {
            actor: actor.clone(),
            before: VoiceSnapshot::default(),
            after: VoiceSnapshot::default(),
        })
        .await
        .unwrap();
        tx.send(StateUpdate {
            actor,
            before: VoiceSnapshot::default(),
            after: VoiceSnapshot::in_channel(voice),
        })
        .await
        .unwrap();
        drop(tx);
        feed.await.unwrap();

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.get(&dest), Some(&1));
    }
}
