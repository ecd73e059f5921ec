//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate the database and the media host.

mod account;

pub use account::{
    AccountService, INVALID_CREDENTIALS_MESSAGE, MISSING_AVATAR_MESSAGE, MISSING_FIELDS_MESSAGE,
    PASSWORD_TOO_SHORT_MESSAGE, USER_EXISTS_MESSAGE,
};
