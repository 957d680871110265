use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::claims::Claims;
use crate::codec::TokenCodec;
use crate::config::TokenConfig;
use crate::error::{AuthError, AuthResult};

/// Stamps issue and expiry times onto claims and signs them.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    codec: TokenCodec,
    ttl: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
    #[serde(skip)]
    pub claims: Claims,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> AuthResult<Self> {
        Ok(Self {
            codec: TokenCodec::from_config(config)?,
            ttl: config.ttl,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token with the configured lifetime.
    pub fn issue(
        &self,
        user_id: i64,
        username: Option<&str>,
        role: Option<&str>,
    ) -> AuthResult<IssuedToken> {
        self.issue_at(user_id, username, role, self.ttl, Utc::now())
    }

    /// Issue a token with an explicit lifetime, starting at `now`.
    pub fn issue_at(
        &self,
        user_id: i64,
        username: Option<&str>,
        role: Option<&str>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(AuthError::InvalidConfig("token ttl out of range"))?;
        let mut claims = Claims::new(user_id, now.timestamp(), expires_at.timestamp())?;
        if let Some(username) = username {
            claims = claims.with_username(username);
        }
        if let Some(role) = role {
            claims = claims.with_role(role);
        }

        let token = self.codec.encode(&claims);

        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            expires_in: ttl.num_seconds(),
            expires_at,
            claims,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningSecret;

    fn issuer() -> TokenIssuer {
        let config = TokenConfig::new(SigningSecret::new("issuer-test-secret").unwrap())
            .with_ttl_hours(1)
            .unwrap();
        TokenIssuer::new(&config).unwrap()
    }

    #[test]
    fn issue_stamps_configured_lifetime() {
        let issuer = issuer();
        let issued = issuer.issue(42, Some("ana"), Some("customer")).unwrap();

        assert_eq!(issued.token_type, "Bearer");
        assert_eq!(issued.expires_in, 3_600);
        assert_eq!(
            issued.claims.expires_at() - issued.claims.issued_at(),
            3_600
        );

        let decoded = issuer.codec().decode(&issued.token).unwrap();
        assert_eq!(decoded, issued.claims);
        assert_eq!(decoded.username(), Some("ana"));
        assert_eq!(decoded.role(), Some("customer"));
    }

    #[test]
    fn issue_at_with_lifetime_in_past_yields_expired_token() {
        let issuer = issuer();
        let issued = issuer
            .issue_at(42, None, None, Duration::minutes(5), Utc::now() - Duration::hours(1))
            .unwrap();
        assert_eq!(
            issuer.codec().decode(&issued.token).unwrap_err(),
            AuthError::Expired
        );
    }

    #[test]
    fn sub_second_lifetime_is_rejected() {
        let err = issuer()
            .issue_at(
                1,
                None,
                None,
                Duration::milliseconds(10),
                DateTime::<Utc>::from_timestamp(1_000, 0).unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaim("exp", _)));
    }

    #[test]
    fn lifetime_past_calendar_range_is_an_error() {
        let err = issuer()
            .issue_at(1, None, None, Duration::hours(1_000_000_000_000), Utc::now())
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidConfig("token ttl out of range"));
    }
}
