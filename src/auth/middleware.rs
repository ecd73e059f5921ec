//! Authentication middleware
//!
//! Protects routes that require authentication.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::session::{NO_TOKEN_MESSAGE, verify_session_token};
use crate::AppState;
use crate::data::User;
use crate::error::AppError;

pub const USER_NOT_FOUND_MESSAGE: &str = "User not found";

fn extract_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(cookie_name).map(|cookie| cookie.value().to_owned())
        })
        .filter(|token| !token.is_empty())
}

async fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<User, AppError> {
    let token = extract_token_from_headers(headers, &state.config.auth.cookie_name)
        .ok_or_else(|| AppError::Unauthorized(NO_TOKEN_MESSAGE.to_string()))?;

    let session = verify_session_token(&token, &state.config.auth.session_secret)?;

    state
        .db
        .get_user_by_id(&session.user_id)
        .await?
        .ok_or_else(|| {
            tracing::debug!(user_id = %session.user_id, "Session refers to a missing user");
            AppError::NotFound(USER_NOT_FOUND_MESSAGE.to_string())
        })
}

/// Middleware to require authentication
///
/// Extracts and verifies the session from the cookie or Authorization
/// header, loads the user, and adds the `User` to request extensions.
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/check", ...)
///     .layer(middleware::from_fn_with_state(state, require_auth));
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(request.headers(), &state).await?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Extractor for current authenticated user
///
/// # Usage
/// ```ignore
/// async fn handler(
///     CurrentUser(user): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}", user.full_name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    /// Reuses the user attached by `require_auth`, or authenticates
    /// on the spot when the route is not behind the layer.
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>().cloned() {
            return Ok(CurrentUser(user));
        }

        let state = AppState::from_ref(state);
        let user = authenticate(&parts.headers, &state).await?;
        parts.extensions.insert(user.clone());

        Ok(CurrentUser(user))
    }
}
