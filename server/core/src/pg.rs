use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::actor::ActorRef;
use crate::errors::{CoreError, CoreResult};
use crate::events::Action;
use crate::ids::{ChannelId, GuildId};
use crate::names::{self, RuleName};
use crate::rule::{Rule, Trigger};
use crate::store::{RuleQuery, RuleStore};

/// Postgres-backed rule store. The `(guild_id, name)` primary key is the
/// backstop for the best-effort check-then-insert name allocation.
#[derive(Clone)]
pub struct PgRuleStore {
    pool: PgPool,
}

impl PgRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch(&self, query: &RuleQuery, limit: Option<i64>) -> CoreResult<Vec<Rule>> {
        let rows = match query {
            RuleQuery::Matching { guild, action, channel, user, roles } => {
                let role_strs: Vec<String> = roles.iter().map(|r| r.0.to_string()).collect();
                sqlx::query(
                    r#"
                    SELECT guild_id, name, action, trigger_actor, trigger_channel,
                           destination, notify, created_at
                    FROM rules
                    WHERE guild_id = $1
                      AND action = $2
                      AND (trigger_channel IS NULL OR trigger_channel = $3)
                      AND (trigger_actor IS NULL
                           OR trigger_actor->>'member' = $4
                           OR trigger_actor->>'role' = ANY($5))
                    ORDER BY created_at ASC
                    LIMIT $6
                    "#,
                )
                .bind(guild.0)
                .bind(action.as_str())
                .bind(channel.0)
                .bind(user.0.to_string())
                .bind(&role_strs)
                .bind(limit.unwrap_or(i64::MAX))
                .fetch_all(&self.pool)
                .await?
            }
            RuleQuery::ByName { guild, name } => {
                sqlx::query(
                    r#"
                    SELECT guild_id, name, action, trigger_actor, trigger_channel,
                           destination, notify, created_at
                    FROM rules
                    WHERE guild_id = $1 AND name = $2
                    "#,
                )
                .bind(guild.0)
                .bind(name.canonical())
                .fetch_all(&self.pool)
                .await?
            }
            RuleQuery::Shape(probe) => {
                // Notify-set equality is checked in process after the exact
                // columns narrow the candidates.
                let rows = sqlx::query(
                    r#"
                    SELECT guild_id, name, action, trigger_actor, trigger_channel,
                           destination, notify, created_at
                    FROM rules
                    WHERE guild_id = $1
                      AND action = $2
                      AND destination = $3
                      AND trigger_channel IS NOT DISTINCT FROM $4
                      AND trigger_actor IS NOT DISTINCT FROM $5
                    ORDER BY created_at ASC
                    "#,
                )
                .bind(probe.guild_id.0)
                .bind(probe.trigger.action.as_str())
                .bind(probe.destination.0)
                .bind(probe.trigger.channel.map(|c| c.0))
                .bind(probe.trigger.actor.map(actor_json))
                .fetch_all(&self.pool)
                .await?;

                let mut out = Vec::with_capacity(rows.len());
                for r in rows {
                    let rule = decode_row(&r)?;
                    if probe.same_shape(&rule) {
                        out.push(rule);
                    }
                }
                return Ok(out);
            }
        };

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(decode_row(&r)?);
        }
        Ok(out)
    }
}

fn actor_json(actor: ActorRef) -> serde_json::Value {
    match actor {
        ActorRef::Member(u) => json!({"member": u.0}),
        ActorRef::Role(r) => json!({"role": r.0}),
    }
}

fn decode_row(r: &sqlx::postgres::PgRow) -> CoreResult<Rule> {
    let name_text = r.get::<String, _>("name");
    let resolved = names::resolve(&name_text)?;
    if !resolved.exact {
        return Err(CoreError::Validation { field: "name", reason: "stored name not canonical" });
    }

    let action_text = r.get::<String, _>("action");
    let action = Action::from_str(&action_text).ok_or(CoreError::Validation {
        field: "action",
        reason: "unknown stored action",
    })?;

    Ok(Rule {
        guild_id: GuildId(r.get::<Uuid, _>("guild_id")),
        name: resolved.name,
        trigger: Trigger {
            actor: r
                .get::<Option<Json<ActorRef>>, _>("trigger_actor")
                .map(|j| j.0),
            action,
            channel: r.get::<Option<Uuid>, _>("trigger_channel").map(ChannelId),
        },
        destination: ChannelId(r.get::<Uuid, _>("destination")),
        notify: r.get::<Json<Vec<ActorRef>>, _>("notify").0,
        created_at: r.get::<DateTime<Utc>, _>("created_at"),
    })
}

#[async_trait]
impl RuleStore for PgRuleStore {
    async fn find_one(&self, query: &RuleQuery) -> CoreResult<Option<Rule>> {
        Ok(self.fetch(query, Some(1)).await?.into_iter().next())
    }

    async fn find_many(&self, query: &RuleQuery) -> CoreResult<Vec<Rule>> {
        self.fetch(query, None).await
    }

    async fn insert_one(&self, rule: &Rule) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rules (guild_id, name, action, trigger_actor, trigger_channel,
                               destination, notify, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(rule.guild_id.0)
        .bind(rule.name.canonical())
        .bind(rule.trigger.action.as_str())
        .bind(rule.trigger.actor.map(actor_json))
        .bind(rule.trigger.channel.map(|c| c.0))
        .bind(rule.destination.0)
        .bind(Json(&rule.notify))
        .bind(rule.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_one(&self, query: &RuleQuery) -> CoreResult<Option<Rule>> {
        let Some(rule) = self.find_one(query).await? else {
            return Ok(None);
        };
        sqlx::query("DELETE FROM rules WHERE guild_id = $1 AND name = $2")
            .bind(rule.guild_id.0)
            .bind(rule.name.canonical())
            .execute(&self.pool)
            .await?;
        Ok(Some(rule))
    }

    async fn list_guild(&self, guild: GuildId) -> CoreResult<Vec<Rule>> {
        let rows = sqlx::query(
            r#"
            SELECT guild_id, name, action, trigger_actor, trigger_channel,
                   destination, notify, created_at
            FROM rules
            WHERE guild_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(guild.0)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            out.push(decode_row(&r)?);
        }
        Ok(out)
    }
}
