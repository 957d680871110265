use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use common_http_errors::{ApiError, ApiResult};
use once_cell::sync::Lazy;
use rand_core::OsRng;
use tokio::task;

/// Hash verified on logins for unknown usernames so they cost the same as a
/// wrong password.
static DUMMY_HASH: Lazy<String> =
    Lazy::new(|| hash_blocking("dummy-password-never-issued").unwrap_or_default());

/// Argon2 hash of `password`, computed off the async workers.
pub async fn hash_password(password: &str) -> ApiResult<String> {
    if password.trim().is_empty() {
        return Err(ApiError::bad_request_msg(
            "MISSING_FIELD",
            "Password must not be empty",
        ));
    }

    let password = password.to_owned();
    task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|err| ApiError::internal(format!("Password hashing task failed: {err}"), None))?
}

/// Check `password` against `stored_hash`. A missing hash still runs a full
/// verification against a dummy hash and then reports `false`.
pub async fn verify_password(password: &str, stored_hash: Option<&str>) -> ApiResult<bool> {
    let password = password.to_owned();
    let stored_hash = stored_hash.map(str::to_owned);
    task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_blocking(&password, &hash),
        None => {
            let _ = verify_blocking(&password, &DUMMY_HASH);
            false
        }
    })
    .await
    .map_err(|err| ApiError::internal(format!("Password verification task failed: {err}"), None))
}

fn hash_blocking(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::internal(format!("Failed to hash password: {err}"), None))
}

/// `false` for a wrong password and for a hash that does not parse.
fn verify_blocking(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn hash_verifies_only_matching_password() {
        let hash = hash_password("correct horse").await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", Some(&hash)).await.unwrap());
        assert!(!verify_password("battery staple", Some(&hash)).await.unwrap());
        assert!(!verify_password("correct horse", Some("not-a-hash")).await.unwrap());
    }

    #[tokio::test]
    async fn blank_password_is_rejected() {
        let err = hash_password("   ").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_hash_runs_a_real_verification() {
        assert!(!verify_password("anything", None).await.unwrap());
        let dummy = PasswordHash::new(&DUMMY_HASH).expect("dummy hash parses");
        assert_eq!(dummy.algorithm.as_str(), "argon2id");
        assert!(!verify_password("dummy-password-never-issued", None).await.unwrap());
    }
}
