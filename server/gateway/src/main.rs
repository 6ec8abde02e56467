use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use vw_core::{ChannelDirectory, Dispatcher, NotificationSink, PgRuleStore, RandSampler, RuleBuilder};
use vw_gateway::{feed, Config, DirectoryCache, PushHub};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = Config::parse();

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_max_connections)
        .connect(&cfg.database_url)
        .await?;
    sqlx::migrate!("../core/migrations").run(&pool).await?;

    let store = PgRuleStore::new(pool);
    let hub = Arc::new(PushHub::new());
    let directory = Arc::new(DirectoryCache::new());

    let sink: Arc<dyn NotificationSink> = hub.clone();
    let dispatcher = Arc::new(Dispatcher::new(store.clone(), sink.clone()));
    let dir_trait: Arc<dyn ChannelDirectory> = directory.clone();
    let builder = Arc::new(RuleBuilder::new(store.clone(), dir_trait, Box::new(RandSampler)));

    let (feed_tx, feed_rx) = mpsc::channel(cfg.feed_capacity);
    tokio::spawn(feed::run_feed(feed_rx, dispatcher, sink, directory.clone()));

    // The platform connection (out of scope here) owns `feed_tx`, keeps the
    // directory cache and push hub current, and drives the command handlers
    // through `builder`.
    let _platform = (feed_tx, builder, hub, directory);

    info!(confirm_timeout_s = cfg.confirm_timeout_s, "gateway ready");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
