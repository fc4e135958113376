//! Auth middleware (§4.9 "Middleware contracts"). Implemented as axum
//! extractors rather than `tower::Layer`s, following the
//! `HxRequest`/`AjaxRequest` extractor idiom from `rostra-web-ui`'s
//! request extractors — the contract each route needs varies (required
//! vs optional vs role-gated), which extractors express more directly
//! than a one-size-fits-all layer.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use forum_core::Role;

use crate::error::AuthError;
use crate::state::{AppState, CommunityMode};

/// Attached to the request by `requireAuth`/`optionalAuth` on success
/// (§4.9: "attach {repo-id, handle, session-id} to the request").
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub repo_id: String,
    pub handle: String,
    pub session_id: forum_kv::SessionId,
}

async fn validate_bearer(parts: &mut Parts, state: &AppState) -> Result<Option<AuthContext>, AuthError> {
    let header = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await;
    let Ok(TypedHeader(auth)) = header else {
        return Ok(None);
    };
    let token = auth.token();
    if token.is_empty() {
        return Ok(None);
    }

    let session = state
        .kv
        .validate_access_token(token)
        .await
        .map_err(|source| AuthError::TransportError { source })?;

    Ok(session.map(|session| AuthContext {
        repo_id: session.repo_id,
        handle: session.handle,
        session_id: session.session_id,
    }))
}

/// `requireAuth`: 401 on a missing/malformed header or an invalid/expired
/// token, 502 on KV transport error.
impl<S> FromRequestParts<S> for AuthContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        if parts.headers.get(axum::http::header::AUTHORIZATION).is_none() {
            return Err(AuthError::MissingOrMalformed);
        }
        match validate_bearer(parts, &state).await? {
            Some(ctx) => Ok(ctx),
            None => Err(AuthError::InvalidOrExpired),
        }
    }
}

/// `optionalAuth`: never rejects; a miss, malformed header, or transport
/// error simply leaves the request unauthenticated.
#[derive(Debug, Clone)]
pub struct OptionalAuthContext(pub Option<AuthContext>);

impl<S> FromRequestParts<S> for OptionalAuthContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let ctx = validate_bearer(parts, &state).await.ok().flatten();
        Ok(OptionalAuthContext(ctx))
    }
}

async fn require_role(parts: &mut Parts, state: &AppState, accepted: &[Role]) -> Result<AuthContext, AuthError> {
    let ctx = AuthContext::from_request_parts(parts, state).await?;
    let user = state
        .db
        .get_user(&ctx.repo_id)
        .await
        .map_err(|_| AuthError::InvalidOrExpired)?;
    let role = user.map(|u| u.role).unwrap_or(Role::User);
    role_check(accepted, role)?;
    Ok(ctx)
}

fn role_check(accepted: &[Role], role: Role) -> Result<(), AuthError> {
    if accepted.contains(&role) {
        Ok(())
    } else {
        Err(AuthError::RoleRequired {
            role: *accepted.first().expect("require_role always has at least one accepted role"),
        })
    }
}

/// `requireAdmin`: accepts only `admin`.
pub struct RequireAdmin(pub AuthContext);

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(RequireAdmin(require_role(parts, &state, &[Role::Admin]).await?))
    }
}

/// `requireModerator`: accepts `moderator` or `admin`.
pub struct RequireModerator(pub AuthContext);

impl<S> FromRequestParts<S> for RequireModerator
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(RequireModerator(
            require_role(parts, &state, &[Role::Moderator, Role::Admin]).await?,
        ))
    }
}

/// `requireOperator`: only exists when the process is in "global" mode —
/// otherwise the route must 404 as if it didn't exist (§4.9, §6.5).
pub struct RequireOperator(pub AuthContext);

impl<S> FromRequestParts<S> for RequireOperator
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        if state.community_mode() != CommunityMode::Global {
            return Err(AuthError::NotFound);
        }
        let ctx = AuthContext::from_request_parts(parts, &state).await?;
        if state.is_operator(&ctx.repo_id) {
            Ok(RequireOperator(ctx))
        } else {
            Err(AuthError::RoleRequired { role: Role::Admin })
        }
    }
}
