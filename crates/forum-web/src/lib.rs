//! HTTP edge: session/token authority surface (§4.9). Endpoint routing,
//! request schemas, and sanitization for end-user-facing routes are out of
//! scope (§1) — this crate owns the auth middleware contracts, the error
//! shaping they return through, and the ban-propagation orchestration that
//! needs both the relational store and the KV cache in one place.

pub mod auth;
pub mod error;
pub mod moderation;
pub mod state;

use axum::Json;
use axum::routing::get;
use axum::{Router, extract::State};
use serde::Serialize;

pub use auth::{AuthContext, OptionalAuthContext, RequireAdmin, RequireModerator, RequireOperator};
pub use error::{AuthError, RequestError, RequestResult};
pub use moderation::apply_mod_action;
pub use state::{AppState, CommunityMode};

/// Minimal illustrative router: a health check plus one route per auth
/// tier, showing how each extractor is wired. The forum's actual
/// end-user-facing API is assembled by its caller, outside this crate's
/// scope (§1).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/session", get(whoami))
        .route("/api/operator/ping", get(operator_ping))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthBody {
    ok: bool,
}

async fn healthz() -> Json<HealthBody> {
    Json(HealthBody { ok: true })
}

#[derive(Serialize)]
struct WhoAmI {
    repo_id: Option<String>,
}

async fn whoami(OptionalAuthContext(ctx): OptionalAuthContext) -> Json<WhoAmI> {
    Json(WhoAmI {
        repo_id: ctx.map(|c| c.repo_id),
    })
}

async fn operator_ping(RequireOperator(ctx): RequireOperator, State(_state): State<AppState>) -> Json<WhoAmI> {
    Json(WhoAmI {
        repo_id: Some(ctx.repo_id),
    })
}
