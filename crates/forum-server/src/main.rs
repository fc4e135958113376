mod cli;
mod upstream;

use std::collections::HashSet;
use std::io;

use clap::Parser;
use cli::{Config, MIN_SESSION_SECRET_LEN};
use forum_ingest::account_age::AccountAgeOracle;
use forum_ingest::dispatcher::Dispatcher;
use forum_ingest::repo_tracker::RepoTracker;
use forum_ingest::service::IngestionService;
use forum_reputation::ReputationJob;
use forum_util_error::FmtCompact as _;
use forum_web::{AppState, CommunityMode};
use snafu::{FromString, ResultExt, Snafu, Whatever};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing::level_filters::LevelFilter;
use upstream::{HttpUpstreamClient, HttpUpstreamStream};

pub const LOG_TARGET: &str = "forum::server";

type WhateverResult<T> = std::result::Result<T, Whatever>;

#[derive(Debug, Snafu)]
pub enum ServerError {
    #[snafu(display("configuration error: {message}"))]
    Config { message: String },
    #[snafu(display("relational store error: {source}"))]
    Db { source: forum_db::DbError },
    #[snafu(display("key-value store error: {source}"))]
    Kv { source: forum_kv::KvError },
    #[snafu(display("ingestion service failed to start: {source}"))]
    Ingest { source: forum_ingest::repo_tracker::RepoTrackerError },
    #[snafu(display("server failed to bind: {source}"))]
    Bind { source: io::Error },
    #[snafu(display("server error: {source}"))]
    Serve { source: io::Error },
    #[snafu(display("{source}"))]
    Whatever { source: Whatever },
}

pub type ServerResult<T> = std::result::Result<T, ServerError>;

#[snafu::report]
#[tokio::main]
async fn main() -> ServerResult<()> {
    init_logging().context(WhateverSnafu)?;

    let config = Config::parse();
    validate_config(&config)?;

    info!(target: LOG_TARGET, mode = ?config.community_mode, "starting forum-server");

    let db = forum_db::Database::connect(&config.database_url).await.context(DbSnafu)?;
    let kv = forum_kv::KvStore::connect(&config.redis_url).await.context(KvSnafu)?;

    let oracle = AccountAgeOracle::new(config.directory_url.clone());
    let dispatcher = Dispatcher::new(db.clone(), oracle);
    let cursor = forum_db::CursorStore::new(db.clone());

    let upstream_client = HttpUpstreamClient::new(config.upstream_url.clone(), config.upstream_admin_password.clone());
    let repo_tracker = RepoTracker::new(db.clone(), upstream_client);
    let upstream_stream = HttpUpstreamStream::new(config.upstream_url.clone());

    let mut ingestion = IngestionService::new(db.clone(), dispatcher, cursor, repo_tracker, upstream_stream);
    ingestion.start().await.context(IngestSnafu)?;

    let reputation_job = std::sync::Arc::new(ReputationJob::new(db.clone()));
    let _reputation_handle = reputation_job
        .clone()
        .spawn_periodic(std::time::Duration::from_secs(config.reputation_job_interval_secs));

    let operator_ids: HashSet<String> = config.operator_ids.iter().filter(|id| !id.is_empty()).cloned().collect();
    let app_state = AppState::new(db, kv, config.community_mode.into(), operator_ids);
    let app = forum_web::router(app_state).layer(tower_http::trace::TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.listen).await.context(BindSnafu)?;
    info!(target: LOG_TARGET, listen = %config.listen, "listening");

    axum::serve(listener, app).await.context(ServeSnafu)?;

    if let Err(err) = ingestion.stop().await {
        warn!(target: LOG_TARGET, err = %err.fmt_compact(), "ingestion service failed to stop cleanly");
    }

    Ok(())
}

fn validate_config(config: &Config) -> ServerResult<()> {
    if config.session_secret.len() < MIN_SESSION_SECRET_LEN {
        return Err(ServerError::Config {
            message: format!(
                "SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} bytes, got {}",
                config.session_secret.len()
            ),
        });
    }
    if config.community_mode == cli::CommunityModeArg::Global && config.operator_ids.iter().all(|id| id.is_empty()) {
        warn!(target: LOG_TARGET, "global mode with no OPERATOR_IDS configured; operator routes will 403 for everyone");
    }
    Ok(())
}

pub fn init_logging() -> WhateverResult<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init()
        .map_err(|_| Whatever::without_source("failed to initialize logging".to_string()))?;
    Ok(())
}
