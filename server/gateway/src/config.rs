use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "vw-gateway", about = "Voicewatch notification gateway")]
pub struct Config {
    /// Postgres connection string for the rule store
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://vw:vw@localhost/vw")]
    pub database_url: String,

    /// Max Postgres connections
    #[arg(long, default_value_t = 16)]
    pub db_max_connections: u32,

    /// Seconds to hold a rule proposal open for confirmation
    #[arg(long, default_value_t = 120)]
    pub confirm_timeout_s: u64,

    /// Capacity of the inbound voice-state update queue
    #[arg(long, default_value_t = 1024)]
    pub feed_capacity: usize,

    /// Capacity of each destination channel's push queue
    #[arg(long, default_value_t = 64)]
    pub push_capacity: usize,
}
