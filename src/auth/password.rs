use argon2::{
    password_hash::{
        Error as PhcError, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

use crate::config::HashConfig;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(String),
    #[error("stored password digest is not a valid PHC string: {0}")]
    InvalidDigestFormat(String),
    #[error("argon2 hashing failed: {0}")]
    Hashing(String),
}

/// Argon2id with a configurable work factor. Verification reads the
/// parameters and salt out of the stored digest, so digests produced under an
/// older work factor keep verifying.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(cfg: HashConfig) -> Result<Self, HashError> {
        let params = Params::new(cfg.memory_kib, cfg.time_cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| HashError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                HashError::Hashing(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// `Ok(false)` on mismatch; errors only when `digest` cannot be used at all.
    pub fn verify(&self, plain: &str, digest: &str) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(digest).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            HashError::InvalidDigestFormat(e.to_string())
        })?;
        match self.argon2().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PhcError::Password) => Ok(false),
            Err(e) => {
                error!(error = %e, "argon2 verify error");
                Err(HashError::InvalidDigestFormat(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(HashConfig {
        time_cost: 1,
        memory_kib: 64,
    })
    .expect("cheap test params are valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hasher = test_hasher();
        let hash = hasher.hash("doctor123").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("doctor123", &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hasher = test_hasher();
        let hash = hasher.hash("correct-horse-battery-staple").unwrap();
        assert!(!hasher.verify("wrong-password", &hash).expect("mismatch is not an error"));
    }

    #[test]
    fn same_input_gets_distinct_salts() {
        let hasher = test_hasher();
        let a = hasher.hash("doctor123").unwrap();
        let b = hasher.hash("doctor123").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify("doctor123", &a).unwrap());
        assert!(hasher.verify("doctor123", &b).unwrap());
    }

    #[test]
    fn digest_never_contains_plaintext() {
        let hash = test_hasher().hash("doctor123").unwrap();
        assert!(!hash.contains("doctor123"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = test_hasher().verify("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, HashError::InvalidDigestFormat(_)));
    }

    #[test]
    fn verifies_digests_made_with_other_work_factor() {
        let strong = PasswordHasher::new(HashConfig {
            time_cost: 2,
            memory_kib: 128,
        })
        .unwrap();
        let hash = strong.hash("doctor123").unwrap();
        assert!(test_hasher().verify("doctor123", &hash).unwrap());
    }

    #[test]
    fn rejects_impossible_params() {
        let err = PasswordHasher::new(HashConfig {
            time_cost: 0,
            memory_kib: 64,
        });
        assert!(matches!(err, Err(HashError::InvalidParams(_))));
    }
}
