use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::errors::CoreResult;
use crate::events::Event;
use crate::ids::ChannelId;
use crate::names::{merged_color, RuleName};
use crate::rule::Rule;
use crate::store::{RuleQuery, RuleStore};

/// One structured message bound for a destination channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Mention tokens in rule order. Duplicates are kept; the platform
    /// collapses them at render time.
    pub mentions: Vec<String>,
    pub body: String,
    pub footer: Footer,
}

/// Provenance footer: which rule(s) produced the message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Footer {
    pub color: u32,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error)]
#[error("delivery refused: {0}")]
pub struct DeliveryRefused(pub &'static str);

/// Where notifications go. The gateway's push hub implements this; the real
/// platform send lives behind it and may refuse.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(
        &self,
        destination: ChannelId,
        note: Notification,
    ) -> Result<(), DeliveryRefused>;
}

/// Record of one per-destination send attempt.
#[derive(Clone, Debug)]
pub struct Delivery {
    pub destination: ChannelId,
    pub rules: Vec<RuleName>,
    pub delivered: bool,
}

/// Matches classified events against stored rules and fans the aggregated
/// notifications out, one per destination.
pub struct Dispatcher<S> {
    store: S,
    sink: Arc<dyn NotificationSink>,
}

impl<S: RuleStore> Dispatcher<S> {
    pub fn new(store: S, sink: Arc<dyn NotificationSink>) -> Self {
        Self { store, sink }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// One dispatch cycle. Destination sends run concurrently; a refused
    /// destination is recorded and never blocks its siblings.
    pub async fn dispatch(&self, event: &Event) -> CoreResult<Vec<Delivery>> {
        let rules = self.store.find_many(&RuleQuery::matching(event)).await?;
        if rules.is_empty() {
            debug!(action = event.action.as_str(), "no matching rules");
            return Ok(Vec::new());
        }

        let mut set = JoinSet::new();
        for (destination, group) in group_by_destination(rules) {
            let note = aggregate(event, &group);
            let names: Vec<RuleName> = group.iter().map(|r| r.name).collect();
            let sink = Arc::clone(&self.sink);
            set.spawn(async move {
                let delivered = match sink.send(destination, note).await {
                    Ok(()) => true,
                    Err(refused) => {
                        warn!(%destination, %refused, "notification refused");
                        false
                    }
                };
                Delivery { destination, rules: names, delivered }
            });
        }

        let mut deliveries = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(delivery) => deliveries.push(delivery),
                Err(e) => warn!("notification task failed: {e}"),
            }
        }
        Ok(deliveries)
    }
}

/// Group matched rules by destination, preserving first-seen destination
/// order and rule order within each group.
fn group_by_destination(rules: Vec<Rule>) -> Vec<(ChannelId, Vec<Rule>)> {
    let mut order: Vec<ChannelId> = Vec::new();
    let mut groups: HashMap<ChannelId, Vec<Rule>> = HashMap::new();
    for rule in rules {
        if !groups.contains_key(&rule.destination) {
            order.push(rule.destination);
        }
        groups.entry(rule.destination).or_default().push(rule);
    }
    order
        .into_iter()
        .map(|dest| {
            let group = groups.remove(&dest).unwrap_or_default();
            (dest, group)
        })
        .collect()
}

/// Merge all rules sharing a destination into one notification. All rules in
/// a cycle share the event's action, so the body template is unambiguous.
fn aggregate(event: &Event, group: &[Rule]) -> Notification {
    let mentions: Vec<String> = group
        .iter()
        .flat_map(|r| r.notify.iter().map(|a| a.mention_token()))
        .collect();

    let body = event.action.message(&event.actor.display_name);

    let footer = if let [only] = group {
        Footer {
            color: only.name.accent_color(),
            text: format!("rule {}", only.name),
            timestamp: Utc::now(),
        }
    } else {
        let names: Vec<RuleName> = group.iter().map(|r| r.name).collect();
        let listed: Vec<String> = names.iter().map(RuleName::canonical).collect();
        Footer {
            color: merged_color(&names),
            text: format!("rules {} (merged)", listed.join(", ")),
            timestamp: Utc::now(),
        }
    };

    Notification { mentions, body, footer }
}
