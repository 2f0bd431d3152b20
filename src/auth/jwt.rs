use std::sync::Arc;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::{config::JwtConfig, state::AppState};

/// Every session token lives exactly this long; there is no refresh.
pub const TOKEN_TTL: Duration = Duration::hours(8);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signature does not match")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed(e.to_string()),
        }
    }
}

/// HS256 keys shared by every instance that signs or checks session tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }

    pub fn issue(&self, user_id: i64, email: &str, full_name: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, email, full_name, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        user_id: i64,
        email: &str,
        full_name: &str,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            user_id,
            email: email.to_string(),
            full_name: full_name.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + TOKEN_TTL).unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Signature first, then expiry: a tampered token reports `BadSignature`
    /// even when it is also past its lifetime.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation())?;
        if now.unix_timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        debug!(user_id = data.claims.user_id, "jwt verified");
        Ok(data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked against the caller's clock with zero leeway
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
        })
    }

    fn keys() -> JwtKeys {
        make_keys("dev-secret", "test-issuer", "test-aud")
    }

    fn flip_first_signature_char(token: &str) -> String {
        let sig_start = token.rfind('.').expect("jwt has three segments") + 1;
        let mut bytes = token.as_bytes().to_vec();
        bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let keys = keys();
        let token = keys.issue(7, "a@x.com", "Dr. Ada").expect("issue");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.full_name, "Dr. Ada");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 8 * 60 * 60);
    }

    #[test]
    fn claims_use_camel_case_on_the_wire() {
        let claims = Claims {
            user_id: 1,
            email: "a@x.com".into(),
            full_name: "A".into(),
            iat: 0,
            exp: 1,
            iss: "i".into(),
            aud: "a".into(),
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], 1);
        assert_eq!(json["fullName"], "A");
    }

    #[test]
    fn valid_until_just_before_expiry() {
        let keys = keys();
        let issued = OffsetDateTime::now_utc() - Duration::hours(1);
        let token = keys.issue_at(1, "a@x.com", "A", issued).unwrap();
        let almost = issued + TOKEN_TTL - Duration::seconds(1);
        assert!(keys.verify_at(&token, almost).is_ok());
    }

    #[test]
    fn expired_at_and_after_lifetime() {
        let keys = keys();
        let issued = OffsetDateTime::now_utc() - Duration::hours(9);
        let token = keys.issue_at(1, "a@x.com", "A", issued).unwrap();
        assert!(matches!(keys.verify(&token), Err(TokenError::Expired)));
        assert!(matches!(
            keys.verify_at(&token, issued + TOKEN_TTL),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let keys = keys();
        let token = keys.issue(1, "a@x.com", "A").unwrap();
        let tampered = flip_first_signature_char(&token);
        assert_ne!(token, tampered);
        assert!(matches!(keys.verify(&tampered), Err(TokenError::BadSignature)));
    }

    #[test]
    fn tampered_and_expired_reports_bad_signature() {
        let keys = keys();
        let issued = OffsetDateTime::now_utc() - Duration::hours(10);
        let token = keys.issue_at(1, "a@x.com", "A", issued).unwrap();
        let tampered = flip_first_signature_char(&token);
        assert!(matches!(keys.verify(&tampered), Err(TokenError::BadSignature)));
    }

    #[test]
    fn wrong_secret_is_bad_signature() {
        let token = keys().issue(1, "a@x.com", "A").unwrap();
        let other = make_keys("another-secret", "test-issuer", "test-aud");
        assert!(matches!(other.verify(&token), Err(TokenError::BadSignature)));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let token = keys().issue(1, "a@x.com", "A").unwrap();
        let other = make_keys("dev-secret", "bad-iss", "bad-aud");
        assert!(matches!(other.verify(&token), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(keys().verify("not.a.jwt"), Err(TokenError::Malformed(_))));
        assert!(matches!(keys().verify(""), Err(TokenError::Malformed(_))));
    }
}
