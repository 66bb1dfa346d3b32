//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use study_market_core::error::ActionError;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::auth::session_id_from;
use crate::web::state::AppState;

/// Validates the session cookie and inserts the caller's user id into the
/// request extensions. Missing or expired sessions get a 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_session_id = session_id_from(req.headers())
        .ok_or_else(|| ApiError::auth_required("continue"))?;

    let user_id = state
        .store
        .validate_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            warn!("Rejected auth session: {}", e);
            ApiError::auth_required("continue")
        })?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

/// Fails unless `user_id` belongs to an administrator.
pub async fn ensure_admin(state: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    let profile = state.store.get_profile(user_id).await?;
    if !profile.is_admin {
        warn!("User {} tried to reach an admin route", user_id);
        return Err(ApiError::Action(ActionError::AuthRequired(
            "Administrator access required".to_string(),
        )));
    }
    Ok(())
}

/// Lets the request through only when the signed-in user is an administrator.
/// Must be layered inside `require_auth`.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = req
        .extensions()
        .get::<Uuid>()
        .copied()
        .ok_or_else(|| ApiError::auth_required("continue"))?;

    ensure_admin(&state, user_id).await?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_support::{register, test_state};
    use axum::{http::StatusCode, response::IntoResponse};

    #[tokio::test]
    async fn only_flagged_profiles_pass_the_admin_check() {
        let (state, store) = test_state();
        let user = register(&store, "user@school.in").await;
        let admin = register(&store, "admin@school.in").await;
        store.set_admin(admin, true).await.unwrap();

        assert!(ensure_admin(&state, admin).await.is_ok());
        let refused = ensure_admin(&state, user).await.unwrap_err();
        assert_eq!(refused.into_response().status(), StatusCode::UNAUTHORIZED);
        assert!(ensure_admin(&state, Uuid::new_v4()).await.is_err());
    }
}
