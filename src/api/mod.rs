//! API layer
//!
//! HTTP handlers for:
//! - Authentication (signup, login, logout, avatar, session check)
//! - Metrics (Prometheus)

mod auth;
mod dto;
pub mod metrics;

pub use dto::*;

pub use auth::auth_router;
pub use metrics::{metrics_router, track_http_metrics};
