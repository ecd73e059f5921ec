//! Authentication endpoints
//!
//! Signup, login, logout, avatar update, and session check.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
};
use axum_extra::extract::CookieJar;

use super::dto::{
    ApiJson, LoginRequest, MessageResponse, SignupRequest, UpdateAvatarRequest, UserResponse,
};
use crate::AppState;
use crate::auth::{
    CurrentUser, Session, build_session_cookie, clear_session_cookie, create_session_token,
    require_auth,
};
use crate::data::User;
use crate::error::AppError;
use crate::service::AccountService;

/// Create authentication router
///
/// Routes:
/// - POST /signup - Register and start a session
/// - POST /login - Start a session
/// - POST /logout - Clear the session cookie
/// - PATCH /updateAvatar - Upload a new avatar (authenticated)
/// - GET /check - Current user (authenticated)
pub fn auth_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout));

    let protected_routes = Router::new()
        .route("/updateAvatar", patch(update_avatar))
        .route("/check", get(check_auth))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public_routes.merge(protected_routes)
}

fn account_service(state: &AppState) -> AccountService {
    AccountService::new(state.db.clone(), state.media.clone(), state.config.clone())
}

/// Sign a session for `user` and add its cookie to the jar
fn start_session(state: &AppState, jar: CookieJar, user: &User) -> Result<CookieJar, AppError> {
    let session = Session::new(user.id.clone(), state.config.auth.session_max_age);
    let token = create_session_token(&session, &state.config.auth.session_secret)?;
    Ok(jar.add(build_session_cookie(token, &state.config)))
}

// =============================================================================
// Signup / Login / Logout
// =============================================================================

/// POST /signup
///
/// The session cookie is only issued once the user row is persisted.
async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<SignupRequest>,
) -> Result<(StatusCode, CookieJar, Json<UserResponse>), AppError> {
    let user = account_service(&state)
        .signup(
            body.full_name.as_deref(),
            body.email.as_deref(),
            body.password.as_deref(),
        )
        .await?;

    let jar = start_session(&state, jar, &user)?;

    Ok((StatusCode::CREATED, jar, Json(UserResponse::from(&user))))
}

/// POST /login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<UserResponse>), AppError> {
    let user = account_service(&state)
        .login(body.email.as_deref(), body.password.as_deref())
        .await?;

    let jar = start_session(&state, jar, &user)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok((jar, Json(UserResponse::from(&user))))
}

/// POST /logout
///
/// Always clears the cookie, whether or not a session was present.
async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.add(clear_session_cookie(&state.config)),
        Json(MessageResponse::new("Logout successful")),
    )
}

// =============================================================================
// Authenticated
// =============================================================================

/// PATCH /updateAvatar
async fn update_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<UpdateAvatarRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let updated = account_service(&state)
        .update_avatar(&user.id, body.avatar.as_deref())
        .await?;

    Ok(Json(UserResponse::from(&updated)))
}

/// GET /check
async fn check_auth(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
