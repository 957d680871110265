use chrono::{Duration, Utc};
use tracing::warn;
use zeroize::Zeroizing;

use crate::error::{AuthError, AuthResult};

const DEFAULT_TTL_HOURS: i64 = 24;
const RECOMMENDED_SECRET_BYTES: usize = 32;

/// HMAC key shared by every token issued by this process.
#[derive(Clone)]
pub struct SigningSecret(Zeroizing<Vec<u8>>);

impl SigningSecret {
    pub fn new(bytes: impl AsRef<[u8]>) -> AuthResult<Self> {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            return Err(AuthError::InvalidConfig("signing secret must not be empty"));
        }
        if bytes.len() < RECOMMENDED_SECRET_BYTES {
            warn!(
                length = bytes.len(),
                recommended = RECOMMENDED_SECRET_BYTES,
                "token signing secret is shorter than recommended"
            );
        }
        Ok(Self(Zeroizing::new(bytes.to_vec())))
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecret")
            .field("bytes", &"***redacted***")
            .finish()
    }
}

/// Runtime configuration for token issuance and verification.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Process-wide HMAC key. Rotating it invalidates every outstanding token.
    pub secret: SigningSecret,
    /// Lifetime stamped onto newly issued tokens.
    pub ttl: Duration,
}

impl TokenConfig {
    /// Construct config with the default 24 hour lifetime.
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
        }
    }

    /// Adjust the token lifetime. Zero or negative lifetimes are rejected, as
    /// are lifetimes whose expiry would fall outside the representable range.
    pub fn with_ttl_hours(self, hours: i64) -> AuthResult<Self> {
        let ttl = Duration::try_hours(hours)
            .ok_or(AuthError::InvalidConfig("token ttl out of range"))?;
        self.with_ttl(ttl)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> AuthResult<Self> {
        if ttl <= Duration::zero() {
            return Err(AuthError::InvalidConfig("token ttl must be positive"));
        }
        if Utc::now().checked_add_signed(ttl).is_none() {
            return Err(AuthError::InvalidConfig("token ttl out of range"));
        }
        self.ttl = ttl;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_is_rejected() {
        let err = SigningSecret::new("").expect_err("empty secret");
        assert!(matches!(err, AuthError::InvalidConfig(_)));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let secret = SigningSecret::new("super-secret-value").unwrap();
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn ttl_defaults_to_one_day() {
        let config = TokenConfig::new(SigningSecret::new("k").unwrap());
        assert_eq!(config.ttl, Duration::hours(24));
    }

    #[test]
    fn ttl_must_be_positive() {
        let config = TokenConfig::new(SigningSecret::new("k").unwrap());
        assert!(config.clone().with_ttl_hours(0).is_err());
        assert!(config.clone().with_ttl_hours(-3).is_err());
        assert_eq!(config.with_ttl_hours(2).unwrap().ttl, Duration::hours(2));
    }

    #[test]
    fn ttl_past_calendar_range_is_rejected() {
        let config = TokenConfig::new(SigningSecret::new("k").unwrap());
        let err = config.clone().with_ttl_hours(1_000_000_000_000).unwrap_err();
        assert_eq!(err, AuthError::InvalidConfig("token ttl out of range"));
        assert!(config.clone().with_ttl_hours(i64::MAX).is_err());
        assert!(config.with_ttl_hours(24 * 365 * 100).is_ok());
    }
}
