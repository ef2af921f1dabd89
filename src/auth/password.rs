//! bcrypt hashing, run on the blocking pool so request handlers stay responsive.

use bcrypt::{hash, verify, DEFAULT_COST};
use lazy_static::lazy_static;

use crate::errors::{Error, Result};

const DUMMY_PASSWORD: &str = "portfolio-cms-dummy-password";

lazy_static! {
    /// Verified against when the username is unknown, so both failure paths cost a bcrypt round.
    /// Only ever forced on the blocking pool.
    static ref DUMMY_HASH: Option<String> = match hash(DUMMY_PASSWORD, DEFAULT_COST) {
        Ok(h) => Some(h),
        Err(e) => {
            tracing::error!("Failed to build dummy password hash: {}", e);
            None
        }
    };
}

pub async fn hash_password(password: String) -> Result<String> {
    hash_password_with_cost(password, DEFAULT_COST).await
}

pub(crate) async fn hash_password_with_cost(password: String, cost: u32) -> Result<String> {
    match tokio::task::spawn_blocking(move || hash(password, cost)).await {
        Ok(Ok(h)) => Ok(h),
        Ok(Err(e)) => {
            tracing::error!("Failed to hash password: {}", e);
            Err(Error::internal("hash password"))
        }
        Err(e) => {
            tracing::error!("spawn_blocking panic during hash: {}", e);
            Err(Error::internal("hash password"))
        }
    }
}

/// Whether `password` matches `stored_hash`. A malformed hash never matches.
pub async fn verify_password(password: String, stored_hash: String) -> Result<bool> {
    match tokio::task::spawn_blocking(move || verify(password, &stored_hash).unwrap_or(false)).await
    {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::error!("spawn_blocking panic during verify: {}", e);
            Err(Error::internal("verify password"))
        }
    }
}

/// Build the dummy hash at startup instead of on the first unknown-user login.
pub async fn warm_up() {
    if let Err(e) = tokio::task::spawn_blocking(|| lazy_static::initialize(&DUMMY_HASH)).await {
        tracing::error!("spawn_blocking panic while building dummy hash: {}", e);
    }
}

fn burn_dummy_round(password: &str) {
    match DUMMY_HASH.as_deref() {
        Some(dummy) => {
            let _ = verify(password, dummy);
        }
        // no hash to compare against, hashing costs the same round
        None => {
            let _ = hash(password, DEFAULT_COST);
        }
    }
}

/// Burn a verification against a fixed hash and report failure.
pub async fn verify_dummy(password: String) -> Result<bool> {
    match tokio::task::spawn_blocking(move || burn_dummy_round(&password)).await {
        Ok(()) => Ok(false),
        Err(e) => {
            tracing::error!("spawn_blocking panic during dummy verify: {}", e);
            Err(Error::internal("verify password"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hashed = hash_password_with_cost("hunter22".to_string(), 4)
            .await
            .unwrap();
        assert_ne!(hashed, "hunter22");
        assert!(verify_password("hunter22".to_string(), hashed.clone())
            .await
            .unwrap());
        assert!(!verify_password("hunter23".to_string(), hashed).await.unwrap());
    }

    #[tokio::test]
    async fn test_dummy_hash_is_built_and_never_matches() {
        warm_up().await;
        let dummy = DUMMY_HASH.as_deref().unwrap();
        assert!(dummy.starts_with("$2"));
        assert!(!verify_dummy(DUMMY_PASSWORD.to_string()).await.unwrap());
        assert!(!verify_dummy("anything".to_string()).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_does_not_match() {
        assert!(!verify_password("x".to_string(), "not-a-hash".to_string())
            .await
            .unwrap());
    }
}
