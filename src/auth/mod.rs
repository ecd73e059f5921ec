//! Cookie session authentication
//!
//! Handles:
//! - Session token signing and cookies
//! - Password hashing
//! - Authentication middleware

mod middleware;
pub mod password;
pub mod session;

pub use middleware::{CurrentUser, USER_NOT_FOUND_MESSAGE, require_auth};
pub use session::{
    Session, build_session_cookie, clear_session_cookie, create_session_token,
    verify_session_token,
};
