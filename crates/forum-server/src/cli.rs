//! Process configuration (§6.6), following `GlobalOpts`/`WebUiOpts`'s
//! shape in `rostra/src/cli.rs`: one `clap::Parser` struct, every field
//! `env`-sourced so the same binary runs unchanged under a process
//! manager or a plain shell.

use clap::Parser;
use forum_web::CommunityMode;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Postgres connection string for the relational store (§6.2).
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Redis connection string for the session/token authority (§6.3).
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: String,

    /// Directory root for account-age resolution (§6.4), e.g.
    /// `https://plc.directory`.
    #[arg(long, env = "DIRECTORY_URL")]
    pub directory_url: String,

    /// Upstream firehose stream root (§6.1).
    #[arg(long, env = "UPSTREAM_URL")]
    pub upstream_url: String,

    /// Admin credential for the upstream's repo-tracking subscription API
    /// (§4.7).
    #[arg(long, env = "UPSTREAM_ADMIN_PASSWORD")]
    pub upstream_admin_password: String,

    /// `single`: one community, no operator routes. `global`: multiple
    /// communities, operator routes live (§4.9, §6.5).
    #[arg(long, env = "COMMUNITY_MODE", value_enum, default_value = "single")]
    pub community_mode: CommunityModeArg,

    /// Comma-separated repo-ids granted operator access in global mode.
    #[arg(long, env = "OPERATOR_IDS", value_delimiter = ',', default_value = "")]
    pub operator_ids: Vec<String>,

    #[arg(long, env = "OAUTH_SESSION_TTL_SECS", default_value_t = 3600)]
    pub oauth_session_ttl_secs: u64,

    #[arg(long, env = "OAUTH_ACCESS_TOKEN_TTL_SECS", default_value_t = 3600)]
    pub oauth_access_token_ttl_secs: u64,

    /// Must be at least 32 bytes; validated fatally at startup (§7).
    #[arg(long, env = "SESSION_SECRET")]
    pub session_secret: String,

    /// Listen address for the HTTP edge.
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: String,

    #[arg(long, env = "RATE_LIMIT_AUTH", default_value_t = 10)]
    pub rate_limit_auth: u32,
    #[arg(long, env = "RATE_LIMIT_WRITE", default_value_t = 30)]
    pub rate_limit_write: u32,
    #[arg(long, env = "RATE_LIMIT_READ_ANON", default_value_t = 60)]
    pub rate_limit_read_anon: u32,
    #[arg(long, env = "RATE_LIMIT_READ_AUTH", default_value_t = 120)]
    pub rate_limit_read_auth: u32,

    /// Reputation job interval (§5).
    #[arg(long, env = "REPUTATION_JOB_INTERVAL_SECS", default_value_t = 300)]
    pub reputation_job_interval_secs: u64,

    /// Embedding-service timeout, owned for forward compatibility only —
    /// no embedding client is implemented (out of scope, §1, Open
    /// Questions #3).
    #[arg(long, env = "EMBEDDING_TIMEOUT_SECS", default_value_t = 10)]
    pub embedding_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CommunityModeArg {
    Single,
    Global,
}

impl From<CommunityModeArg> for CommunityMode {
    fn from(value: CommunityModeArg) -> Self {
        match value {
            CommunityModeArg::Single => CommunityMode::Single,
            CommunityModeArg::Global => CommunityMode::Global,
        }
    }
}

pub const MIN_SESSION_SECRET_LEN: usize = 32;
