use crate::error::ApiError;

/// hash_password
///
/// Salted one-way hash with bcrypt, run on the blocking pool.
pub async fn hash_password(plain: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .map_err(|e| ApiError::Server(e.to_string()))?
        .map_err(|e| {
            tracing::error!("password hashing failed: {:?}", e);
            ApiError::Server("Failed to hash password".to_string())
        })
}

/// verify_password
///
/// A malformed stored hash counts as a mismatch; the caller answers with the
/// same generic credential error either way.
pub async fn verify_password(plain: String, hash: String) -> Result<bool, ApiError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
        .await
        .map_err(|e| ApiError::Server(e.to_string()))?;

    match outcome {
        Ok(valid) => Ok(valid),
        Err(e) => {
            tracing::warn!("stored password hash could not be verified: {:?}", e);
            Ok(false)
        }
    }
}
