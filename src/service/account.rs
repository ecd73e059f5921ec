//! Account service
//!
//! Signup, login, and avatar changes for registered users.

use std::sync::Arc;

use crate::auth::USER_NOT_FOUND_MESSAGE;
use crate::auth::password::{hash_password, verify_dummy_password, verify_password};
use crate::config::AppConfig;
use crate::data::{Database, EntityId, User};
use crate::error::AppError;
use crate::metrics::{AVATAR_BYTES_UPLOADED, AVATAR_UPLOADS_TOTAL, USERS_TOTAL, record_auth_attempt};
use crate::storage::{AvatarImage, MediaHost};

pub const MISSING_FIELDS_MESSAGE: &str = "Please fill in all fields";
pub const PASSWORD_TOO_SHORT_MESSAGE: &str = "Password must be at least 6 characters";
pub const USER_EXISTS_MESSAGE: &str = "User already exists";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid Credentials";
pub const MISSING_AVATAR_MESSAGE: &str = "Please upload an avatar";

const MIN_PASSWORD_CHARS: usize = 6;

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    media: Arc<dyn MediaHost>,
    config: Arc<AppConfig>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, media: Arc<dyn MediaHost>, config: Arc<AppConfig>) -> Self {
        Self { db, media, config }
    }

    /// Register a new user
    ///
    /// The password is not trimmed; name and email are.
    ///
    /// # Errors
    /// `Validation` for missing fields, a short password, or a taken email
    pub async fn signup(
        &self,
        full_name: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User, AppError> {
        let result = self.try_signup(full_name, email, password).await;
        record_auth_attempt(
            "signup",
            match &result {
                Ok(_) => "success",
                Err(AppError::Validation(_)) => "rejected",
                Err(_) => "error",
            },
        );
        result
    }

    async fn try_signup(
        &self,
        full_name: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User, AppError> {
        let (Some(full_name), Some(email), Some(password)) = (
            non_blank(full_name),
            non_blank(email),
            password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AppError::Validation(MISSING_FIELDS_MESSAGE.to_string()));
        };

        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(PASSWORD_TOO_SHORT_MESSAGE.to_string()));
        }

        let password_hash = hash_password(password, self.config.auth.bcrypt_cost).await?;
        let user = User::new(email.to_string(), full_name.to_string(), password_hash);

        if !self.db.insert_user(&user).await? {
            return Err(AppError::Validation(USER_EXISTS_MESSAGE.to_string()));
        }

        tracing::info!(user_id = %user.id, "User registered");
        USERS_TOTAL.inc();

        Ok(user)
    }

    /// Check credentials
    ///
    /// Unknown email, missing password and wrong password all produce the
    /// same `Validation(INVALID_CREDENTIALS_MESSAGE)`.
    pub async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User, AppError> {
        let result = self.try_login(email, password).await;
        record_auth_attempt(
            "login",
            match &result {
                Ok(_) => "success",
                Err(AppError::Validation(_)) => "rejected",
                Err(_) => "error",
            },
        );
        result
    }

    async fn try_login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User, AppError> {
        let invalid = || AppError::Validation(INVALID_CREDENTIALS_MESSAGE.to_string());

        let (Some(email), Some(password)) = (non_blank(email), password) else {
            return Err(invalid());
        };

        let Some(user) = self.db.get_user_by_email(email).await? else {
            verify_dummy_password(password, self.config.auth.bcrypt_cost).await?;
            return Err(invalid());
        };

        if !verify_password(password, &user.password_hash).await? {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(invalid());
        }

        Ok(user)
    }

    /// Upload a new avatar and store its URL on the user
    ///
    /// # Arguments
    /// * `user_id` - Authenticated caller
    /// * `avatar` - `data:image/...;base64,...` URI
    ///
    /// # Errors
    /// `Validation` for an empty or undecodable image, `NotFound` if the
    /// user disappeared, `Storage` if the upload fails
    pub async fn update_avatar(
        &self,
        user_id: &str,
        avatar: Option<&str>,
    ) -> Result<User, AppError> {
        let Some(avatar) = non_blank(avatar) else {
            return Err(AppError::Validation(MISSING_AVATAR_MESSAGE.to_string()));
        };

        let image = AvatarImage::from_data_uri(avatar, self.config.storage.media.max_avatar_bytes)?;
        let key = format!(
            "avatars/{}/{}.{}",
            user_id,
            EntityId::new().0,
            image.extension()
        );
        let size = image.data.len();

        let url = self
            .media
            .upload(&key, image.data, image.content_type)
            .await?;

        AVATAR_UPLOADS_TOTAL.inc();
        AVATAR_BYTES_UPLOADED.inc_by(size as f64);

        let updated = self
            .db
            .update_user_avatar(user_id, &url, chrono::Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND_MESSAGE.to_string()))?;

        tracing::info!(user_id = %updated.id, key = %key, bytes = size, "Avatar updated");

        Ok(updated)
    }

    /// Refresh the registered-user gauge from the database
    pub async fn sync_user_gauge(&self) -> Result<(), AppError> {
        USERS_TOTAL.set(self.db.count_users().await?);
        Ok(())
    }
}
