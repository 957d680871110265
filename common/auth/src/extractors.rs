use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap, HeaderValue};
use tracing::debug;

use crate::claims::Claims;
use crate::codec::TokenCodec;
use crate::error::{AuthError, AuthResult};

/// Verified claims for the current request.
///
/// When a guard layer has already verified the request, the context is taken
/// from the request extensions instead of decoding the token a second time.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
}

impl AuthContext {
    /// Verify the bearer token carried in `headers`.
    pub fn from_headers(headers: &HeaderMap, codec: &TokenCodec) -> AuthResult<Self> {
        let header_value = headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthorization)?;

        let token = parse_bearer(header_value)?;
        let claims = codec.decode(&token).map_err(|err| {
            debug!(reason = err.reason(), "rejected bearer token");
            err
        })?;

        Ok(Self { claims })
    }

    pub fn user_id(&self) -> i64 {
        self.claims.user_id()
    }

    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<TokenCodec>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<AuthContext>() {
            return Ok(existing.clone());
        }

        let codec = Arc::<TokenCodec>::from_ref(state);
        let context = Self::from_headers(&parts.headers, &codec)?;
        parts.extensions.insert(context.clone());
        Ok(context)
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively and may be separated from the
/// token by any run of whitespace.
pub fn parse_bearer(value: &HeaderValue) -> AuthResult<String> {
    let raw = value
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorization)?
        .trim();

    let (scheme, rest) = raw
        .split_once(char::is_whitespace)
        .ok_or(AuthError::InvalidAuthorization)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthorization);
    }

    let token = rest.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::InvalidAuthorization);
    }

    Ok(token.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningSecret;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn parse_bearer_accepts_valid_token() {
        let header = HeaderValue::from_static("Bearer abc.def.ghi");
        let token = parse_bearer(&header).expect("token");
        assert_eq!(token, "abc.def.ghi");
    }

    #[test]
    fn parse_bearer_is_case_and_whitespace_tolerant() {
        for raw in ["bearer abc.def.ghi", "BEARER\tabc.def.ghi", "  Bearer    abc.def.ghi  "] {
            let header = HeaderValue::from_str(raw).unwrap();
            assert_eq!(parse_bearer(&header).unwrap(), "abc.def.ghi", "{raw:?}");
        }
    }

    #[test]
    fn parse_bearer_rejects_wrong_scheme() {
        let header = HeaderValue::from_static("Basic credentials");
        let err = parse_bearer(&header).expect_err("should reject");
        assert!(matches!(err, AuthError::InvalidAuthorization));
    }

    #[test]
    fn parse_bearer_rejects_empty_value() {
        let header = HeaderValue::from_static("Bearer    ");
        let err = parse_bearer(&header).expect_err("should reject empty token");
        assert!(matches!(err, AuthError::InvalidAuthorization));
    }

    #[test]
    fn parse_bearer_rejects_scheme_glued_to_token() {
        let header = HeaderValue::from_static("Bearerabc.def.ghi");
        assert!(parse_bearer(&header).is_err());
    }

    async fn whoami(auth: AuthContext) -> String {
        auth.user_id().to_string()
    }

    fn app(codec: Arc<TokenCodec>) -> Router {
        Router::new().route("/whoami", get(whoami)).with_state(codec)
    }

    fn codec() -> Arc<TokenCodec> {
        let secret = SigningSecret::new("extractor-test-secret").unwrap();
        Arc::new(TokenCodec::new(&secret).unwrap())
    }

    #[tokio::test]
    async fn extractor_yields_claims_for_valid_token() {
        let codec = codec();
        let now = chrono::Utc::now().timestamp();
        let token = codec.encode(&Claims::new(77, now, now + 60).unwrap());

        let response = app(codec)
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&body[..], b"77");
    }

    #[tokio::test]
    async fn extractor_rejects_missing_header() {
        let response = app(codec())
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
