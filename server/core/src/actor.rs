use serde::{Deserialize, Serialize};

use crate::ids::{GuildId, RoleId, UserId};

/// Who a trigger points at: a single member or a whole role.
///
/// Serializes externally tagged (`{"member": ...}` / `{"role": ...}`), which
/// is also the shape the Postgres predicate inspects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRef {
    Member(UserId),
    Role(RoleId),
}

impl ActorRef {
    /// Platform mention token for this actor.
    pub fn mention_token(&self) -> String {
        match self {
            ActorRef::Member(u) => format!("<@{}>", u.0),
            ActorRef::Role(r) => format!("<@&{}>", r.0),
        }
    }

    pub fn is_member(&self, user: UserId) -> bool {
        matches!(self, ActorRef::Member(u) if *u == user)
    }
}

/// Resolved identity of the member whose voice state transitioned, carrying
/// the role memberships the matcher needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorIdentity {
    pub user_id: UserId,
    pub guild_id: GuildId,
    pub display_name: String,
    pub roles: Vec<RoleId>,
}

impl ActorIdentity {
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }

    pub fn mention_token(&self) -> String {
        format!("<@{}>", self.user_id.0)
    }

    /// Whether a trigger actor (if any) selects this identity.
    pub fn matches(&self, target: Option<&ActorRef>) -> bool {
        match target {
            None => true,
            Some(ActorRef::Member(u)) => *u == self.user_id,
            Some(ActorRef::Role(r)) => self.has_role(*r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_membership_matches() {
        let role = RoleId::new();
        let other = RoleId::new();
        let id = ActorIdentity {
            user_id: UserId::new(),
            guild_id: GuildId::new(),
            display_name: "casey".into(),
            roles: vec![role],
        };
        assert!(id.matches(None));
        assert!(id.matches(Some(&ActorRef::Member(id.user_id))));
        assert!(id.matches(Some(&ActorRef::Role(role))));
        assert!(!id.matches(Some(&ActorRef::Role(other))));
        assert!(!id.matches(Some(&ActorRef::Member(UserId::new()))));
    }

    #[test]
    fn actor_ref_serde_shape() {
        let user = UserId::new();
        let v = serde_json::to_value(ActorRef::Member(user)).unwrap();
        assert_eq!(v["member"], serde_json::json!(user.0));
    }
}
