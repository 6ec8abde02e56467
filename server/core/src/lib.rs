pub mod actor;
pub mod builder;
pub mod confirm;
pub mod directory;
pub mod dispatch;
pub mod errors;
pub mod escalate;
pub mod events;
pub mod ids;
pub mod names;
pub mod pg;
pub mod rule;
pub mod store;

pub use actor::{ActorIdentity, ActorRef};
pub use builder::{BuildOutcome, RequestContext, RuleBuilder, RuleDraft};
pub use confirm::{pending, ConfirmHandle, Outcome, PendingAction, CONFIRM_TIMEOUT};
pub use directory::{ChannelDirectory, ChannelKind};
pub use dispatch::{Delivery, DeliveryRefused, Dispatcher, Footer, Notification, NotificationSink};
pub use errors::{CoreError, CoreResult};
pub use events::{classify, Action, Event, VoiceSnapshot};
pub use ids::{ChannelId, GuildId, RoleId, UserId};
pub use names::{IndexSampler, RandSampler, Resolved, RuleName};
pub use pg::PgRuleStore;
pub use rule::{Rule, Trigger};
pub use store::{MemoryRuleStore, RuleQuery, RuleStore};
