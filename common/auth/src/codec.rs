use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::claims::Claims;
use crate::config::{SigningSecret, TokenConfig};
use crate::error::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;

/// The only signing algorithm tokens may declare.
pub const TOKEN_ALGORITHM: &str = "HS256";

const HEADER_JSON: &str = r#"{"typ":"JWT","alg":"HS256"}"#;

#[derive(Debug, Deserialize)]
struct TokenHeader {
    alg: String,
}

/// Encodes claims into signed `header.payload.signature` tokens and verifies
/// them again. Holds nothing but the keyed MAC, so it is cheap to clone and
/// safe to share across tasks.
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
    encoded_header: String,
}

impl TokenCodec {
    pub fn new(secret: &SigningSecret) -> AuthResult<Self> {
        let mac = HmacSha256::new_from_slice(secret.expose())
            .map_err(|_| AuthError::InvalidConfig("signing secret rejected by HMAC"))?;

        Ok(Self {
            mac,
            encoded_header: URL_SAFE_NO_PAD.encode(HEADER_JSON),
        })
    }

    pub fn from_config(config: &TokenConfig) -> AuthResult<Self> {
        Self::new(&config.secret)
    }

    pub fn encode(&self, claims: &Claims) -> String {
        let payload = serde_json::to_vec(claims).expect("claims serialize to JSON");
        let signing_input = format!("{}.{}", self.encoded_header, URL_SAFE_NO_PAD.encode(payload));
        let signature = self.sign(&signing_input);
        format!("{signing_input}.{signature}")
    }

    pub fn decode(&self, token: &str) -> AuthResult<Claims> {
        self.decode_at(token, Utc::now())
    }

    /// Verify `token` as if the current time were `now`.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Claims> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthError::MalformedToken);
        };

        // Nothing from the header or payload is trusted before this point.
        let signing_input = &token[..header.len() + 1 + payload.len()];
        let expected = self.sign(signing_input);
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return Err(AuthError::InvalidSignature);
        }

        let header: TokenHeader = decode_segment(header)?;
        if header.alg != TOKEN_ALGORITHM {
            return Err(AuthError::MalformedToken);
        }

        let claims: Claims = decode_segment(payload)?;
        if claims.is_expired_at(now.timestamp()) {
            return Err(AuthError::Expired);
        }

        debug!(user_id = claims.user_id(), "verified token");
        Ok(claims)
    }

    fn sign(&self, signing_input: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("alg", &TOKEN_ALGORITHM)
            .finish_non_exhaustive()
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> AuthResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(&SigningSecret::new(secret).unwrap()).unwrap()
    }

    fn live_claims(user_id: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims::new(user_id, now, now + 3_600).unwrap()
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let codec = codec("round-trip-secret");
        let claims = live_claims(42).with_username("ana").with_role("customer");

        let decoded = codec.decode(&codec.encode(&claims)).expect("valid token");
        assert_eq!(decoded, claims);

        let bare = live_claims(7);
        assert_eq!(codec.decode(&codec.encode(&bare)).unwrap(), bare);
    }

    #[test]
    fn encode_is_deterministic() {
        let codec = codec("deterministic");
        let claims = Claims::new(1, 1_000, 2_000).unwrap();
        assert_eq!(codec.encode(&claims), codec.encode(&claims));
    }

    #[test]
    fn token_has_three_url_safe_segments() {
        let token = codec("shape").encode(&live_claims(3));
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        for segment in segments {
            assert!(!segment.is_empty());
            assert!(segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn header_declares_fixed_algorithm() {
        let token = codec("header").encode(&live_claims(3));
        let header = token.split('.').next().unwrap();
        let json = URL_SAFE_NO_PAD.decode(header).unwrap();
        assert_eq!(json, HEADER_JSON.as_bytes());
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let token = codec("secret-one").encode(&live_claims(9));
        let err = codec("secret-two").decode(&token).unwrap_err();
        assert_eq!(err, AuthError::InvalidSignature);
    }

    #[test]
    fn any_payload_flip_is_invalid_signature() {
        let codec = codec("tamper");
        let token = codec.encode(&live_claims(11).with_role("customer"));
        let (header, rest) = token.split_once('.').unwrap();
        let (payload, signature) = rest.split_once('.').unwrap();

        for index in 0..payload.len() {
            let mut bytes = payload.as_bytes().to_vec();
            bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
            let tampered_payload = String::from_utf8(bytes).unwrap();
            let tampered = format!("{header}.{tampered_payload}.{signature}");
            assert_eq!(
                codec.decode(&tampered).unwrap_err(),
                AuthError::InvalidSignature,
                "flip at {index} was not rejected"
            );
        }
    }

    #[test]
    fn expired_one_second_ago() {
        let codec = codec("expiry");
        let now = Utc::now().timestamp();
        let claims = Claims::new(5, now - 3_600, now - 1).unwrap();
        assert_eq!(codec.decode(&codec.encode(&claims)).unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn decode_at_uses_supplied_clock() {
        let codec = codec("clock");
        let claims = Claims::new(5, 1_000, 2_000).unwrap();
        let token = codec.encode(&claims);

        let at = |secs| DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
        assert_eq!(codec.decode_at(&token, at(2_000)).unwrap(), claims);
        assert_eq!(codec.decode_at(&token, at(2_001)).unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        let codec = codec("segments");
        let token = codec.encode(&live_claims(1));
        let (two, _) = token.rsplit_once('.').unwrap();

        assert_eq!(codec.decode(two).unwrap_err(), AuthError::MalformedToken);
        assert_eq!(codec.decode("").unwrap_err(), AuthError::MalformedToken);
        assert_eq!(
            codec.decode(&format!("{token}.extra")).unwrap_err(),
            AuthError::MalformedToken
        );
    }

    #[test]
    fn validly_signed_garbage_is_malformed() {
        let codec = codec("garbage");
        let forge = |header: &str, payload: &str| {
            let input = format!(
                "{}.{}",
                URL_SAFE_NO_PAD.encode(header),
                URL_SAFE_NO_PAD.encode(payload)
            );
            format!("{input}.{}", codec.sign(&input))
        };

        let not_json = forge(HEADER_JSON, "not json");
        assert_eq!(codec.decode(&not_json).unwrap_err(), AuthError::MalformedToken);

        let missing_subject = forge(HEADER_JSON, r#"{"iat":1,"exp":9999999999}"#);
        assert_eq!(
            codec.decode(&missing_subject).unwrap_err(),
            AuthError::MalformedToken
        );

        let other_alg = forge(
            r#"{"typ":"JWT","alg":"none"}"#,
            r#"{"user_id":1,"iat":1,"exp":9999999999}"#,
        );
        assert_eq!(codec.decode(&other_alg).unwrap_err(), AuthError::MalformedToken);
    }

    #[test]
    fn customer_scenario_round_trips_then_expires() {
        let codec = codec("scenario");
        let now = Utc::now();
        let issued = Claims::new(
            42,
            now.timestamp(),
            (now + Duration::hours(1)).timestamp(),
        )
        .unwrap()
        .with_role("customer");

        assert_eq!(codec.decode(&codec.encode(&issued)).unwrap(), issued);

        let lapsed = Claims::new(42, now.timestamp() - 7_200, now.timestamp() - 3_600)
            .unwrap()
            .with_role("customer");
        assert_eq!(codec.decode(&codec.encode(&lapsed)).unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn debug_does_not_leak_key_material() {
        let rendered = format!("{:?}", codec("do-not-print"));
        assert!(!rendered.contains("do-not-print"));
    }
}
