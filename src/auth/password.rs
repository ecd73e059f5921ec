//! Password hashing
//!
//! bcrypt with a per-hash random salt. Hashing and verification are CPU
//! bound and run on the blocking pool.

use std::collections::HashMap;
use std::sync::Mutex;

use lazy_static::lazy_static;

use crate::error::AppError;

lazy_static! {
    /// Hashes verified against when the email is unknown, keyed by bcrypt
    /// cost, so both failure paths of a login cost one equal bcrypt round.
    static ref DUMMY_HASHES: Mutex<HashMap<u32, String>> = Mutex::new(HashMap::new());
}

const DUMMY_PASSWORD: &str = "authdesk-timing-equalizer";

/// Hash a password with the given bcrypt cost
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_owned();

    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Encryption(format!("password hashing failed: {e}")))
}

/// Check a password against a stored bcrypt hash
///
/// A malformed stored hash counts as a mismatch and is logged.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let hash = hash.to_owned();

    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    match verified {
        Ok(matches) => Ok(matches),
        Err(error) => {
            tracing::warn!(%error, "Stored password hash could not be verified");
            Ok(false)
        }
    }
}

/// Dummy hash at `cost`, computed once per cost on the blocking pool
pub async fn dummy_hash(cost: u32) -> Result<String, AppError> {
    if let Some(hash) = cached_dummy_hash(cost) {
        return Ok(hash);
    }

    let hash = hash_password(DUMMY_PASSWORD, cost).await?;
    let mut hashes = DUMMY_HASHES
        .lock()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("dummy hash cache poisoned")))?;
    Ok(hashes.entry(cost).or_insert(hash).clone())
}

fn cached_dummy_hash(cost: u32) -> Option<String> {
    DUMMY_HASHES.lock().ok()?.get(&cost).cloned()
}

/// Burn one verification against a dummy hash of the same cost as real ones
pub async fn verify_dummy_password(password: &str, cost: u32) -> Result<(), AppError> {
    let hash = dummy_hash(cost).await?;
    verify_password(password, &hash).await.map(|_| ())
}
