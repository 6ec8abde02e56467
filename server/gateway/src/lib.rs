pub mod commands;
pub mod config;
pub mod feed;
pub mod state;

pub use commands::{handle_create, handle_delete, handle_list, CreateReply, DeleteReply};
pub use config::Config;
pub use feed::{run_feed, StateUpdate};
pub use state::{DirectoryCache, PushHub};
