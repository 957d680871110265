use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Identity and lifetime data carried inside a session token.
///
/// A `Claims` value always has a subject and always expires strictly after it
/// was issued; the only ways to obtain one are [`Claims::new`] and decoding a
/// payload that satisfies the same rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ClaimsRepr")]
pub struct Claims {
    user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(rename = "iat")]
    issued_at: i64,
    #[serde(rename = "exp")]
    expires_at: i64,
}

impl Claims {
    /// Build claims for `user_id` valid over `[issued_at, expires_at]` (Unix seconds).
    pub fn new(user_id: i64, issued_at: i64, expires_at: i64) -> AuthResult<Self> {
        if expires_at <= issued_at {
            return Err(AuthError::InvalidClaim("exp", expires_at.to_string()));
        }

        Ok(Self {
            user_id,
            username: None,
            role: None,
            issued_at,
            expires_at,
        })
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Raw role label as issued. Callers wanting a typed role should go through
    /// the security layer, which maps an absent label to `customer`.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn issued_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.issued_at, 0).single()
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.expires_at, 0).single()
    }

    /// True once `now` (Unix seconds) is past the expiry instant.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    user_id: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<String>,
    iat: i64,
    exp: i64,
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let mut claims = Claims::new(value.user_id, value.iat, value.exp)?;
        claims.username = value.username;
        claims.role = value.role;
        Ok(claims)
    }
}
