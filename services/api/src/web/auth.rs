//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_market_core::{error::ActionError, ports::PortError};
use tracing::{error, info};
use uuid::Uuid;
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorBody};
use crate::web::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
}

//=========================================================================================
// Session Cookie Helpers
//=========================================================================================

/// Reads the `session` cookie from the request headers.
pub fn session_id_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

fn session_cookie(session_id: &str, max_age: Duration) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session_id,
        max_age.num_seconds()
    )
}

/// Persists a new auth session for `user_id` and returns the cookie announcing it.
async fn start_session(state: &AppState, user_id: Uuid) -> Result<String, ApiError> {
    let ttl = Duration::days(state.config.session_ttl_days);
    let auth_session_id = Uuid::new_v4().to_string();
    state
        .store
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await?;
    Ok(session_cookie(&auth_session_id, ttl))
}

fn invalid_credentials() -> ApiError {
    ApiError::Action(ActionError::AuthRequired(
        "Invalid email or password".to_string(),
    ))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::validation("Please enter a valid email address"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })?
        .to_string();

    let first_name = non_empty(req.first_name);
    let last_name = non_empty(req.last_name);
    let profile = state
        .store
        .create_profile(
            &email,
            &password_hash,
            first_name.as_deref(),
            last_name.as_deref(),
        )
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => {
                ApiError::validation("An account with this email already exists")
            }
            other => other.into(),
        })?;

    let cookie = start_session(&state, profile.id).await?;
    info!("New account {} created", profile.id);

    let response = AuthResponse {
        user_id: profile.id,
        email,
    };
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let creds = state
        .store
        .get_credentials_by_email(&email)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => invalid_credentials(),
            other => other.into(),
        })?;

    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Stored password hash is malformed".to_string())
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(invalid_credentials());
    }

    let cookie = start_session(&state, creds.user_id).await?;

    let response = AuthResponse {
        user_id: creds.user_id,
        email: creds.email,
    };
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session", body = ErrorBody)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let auth_session_id =
        session_id_from(&headers).ok_or_else(|| ApiError::auth_required("log out"))?;
    state.store.delete_auth_session(auth_session_id).await?;

    let cookie = session_cookie("", Duration::zero());
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_support;
    use axum::http::HeaderValue;

    fn test_state() -> Arc<AppState> {
        test_support::test_state().0
    }

    fn signup(email: &str, password: &str) -> Json<SignupRequest> {
        Json(SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
            first_name: Some("Meera".to_string()),
            last_name: None,
        })
    }

    fn cookie_of(response: &axum::response::Response) -> String {
        response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc123; lang=en"),
        );
        assert_eq!(session_id_from(&headers), Some("abc123"));

        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_id_from(&headers), None);
    }

    #[tokio::test]
    async fn signup_then_login_issues_valid_sessions() {
        let state = test_state();
        let response = signup_handler(State(state.clone()), signup(" Meera@Example.com ", "secret1"))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = cookie_of(&response);
        assert!(cookie.contains("Max-Age=2592000"));

        let response = login_handler(
            State(state.clone()),
            Json(LoginRequest {
                email: "meera@example.com".to_string(),
                password: "secret1".to_string(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie_of(&response)).unwrap());
        let session = session_id_from(&headers).unwrap();
        assert!(state.store.validate_auth_session(session).await.is_ok());
    }

    #[tokio::test]
    async fn signup_rejects_duplicates_and_weak_passwords() {
        let state = test_state();
        signup_handler(State(state.clone()), signup("a@b.in", "secret1"))
            .await
            .unwrap();

        let dup = signup_handler(State(state.clone()), signup("a@b.in", "secret2"))
            .await
            .err()
            .unwrap();
        assert_eq!(dup.into_response().status(), StatusCode::BAD_REQUEST);

        let weak = signup_handler(State(state), signup("c@d.in", "abc"))
            .await
            .err()
            .unwrap();
        assert_eq!(weak.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let state = test_state();
        signup_handler(State(state.clone()), signup("x@y.in", "secret1"))
            .await
            .unwrap();

        for (email, password) in [("x@y.in", "wrong-one"), ("nobody@y.in", "secret1")] {
            let err = login_handler(
                State(state.clone()),
                Json(LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                }),
            )
            .await
            .err()
            .unwrap();
            assert_eq!(err.to_string(), "Invalid email or password");
        }
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let state = test_state();
        let user = Uuid::new_v4();
        state
            .store
            .create_auth_session("s1", user, Utc::now() + Duration::days(1))
            .await
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session=s1"));
        let response = logout_handler(State(state.clone()), headers)
            .await
            .unwrap()
            .into_response();
        assert!(cookie_of(&response).contains("Max-Age=0"));
        assert!(state.store.validate_auth_session("s1").await.is_err());

        let err = logout_handler(State(state), HeaderMap::new()).await.err().unwrap();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
