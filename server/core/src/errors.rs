use crate::actor::ActorRef;
use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: &'static str },

    #[error("not authorized to mention {0:?}")]
    Authorization(Vec<ActorRef>),

    #[error("name allocation exhausted after {attempts} attempts, try again")]
    NameExhausted { attempts: u32 },

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}
