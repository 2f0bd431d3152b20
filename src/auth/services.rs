use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use super::{
    dto::{normalize_email, LoginRequest, PublicUser, SignupRequest},
    jwt::JwtKeys,
    password::{HashError, PasswordHasher},
    repo::{StoreError, UserStore},
    repo_types::NewUser,
};
use crate::error::error_response;

pub const DUPLICATE_EMAIL_MESSAGE: &str = "An account with this email already exists.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";
pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";

/// Everything signup, login and session checks can fail with. The `Display`
/// text is for logs; clients get the fixed messages from `IntoResponse`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("email already registered")]
    EmailAlreadyRegistered,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("missing or malformed Authorization header")]
    MissingToken,
    #[error("invalid or expired session")]
    InvalidSession,
    #[error("signup failed")]
    SignupFailed,
    #[error("auth service unavailable")]
    AuthServiceUnavailable,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(message) => error_response(StatusCode::BAD_REQUEST, &message),
            Self::EmailAlreadyRegistered => {
                error_response(StatusCode::CONFLICT, DUPLICATE_EMAIL_MESSAGE)
            }
            Self::InvalidCredentials => {
                error_response(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS_MESSAGE)
            }
            Self::MissingToken => {
                error_response(StatusCode::UNAUTHORIZED, "Missing or invalid Authorization header")
            }
            Self::InvalidSession => {
                error_response(StatusCode::UNAUTHORIZED, "Invalid or expired token")
            }
            Self::SignupFailed => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error creating user")
            }
            Self::AuthServiceUnavailable => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error logging in")
            }
        }
    }
}

/// Serde detail from a rejected body is logged, never echoed.
impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected auth request body");
        Self::Validation(INVALID_BODY_MESSAGE.into())
    }
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user: PublicUser,
}

/// Signup and login over a credential store, a hasher and the token keys.
/// Expects requests that already passed `validate()`.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    keys: Arc<JwtKeys>,
    /// Verified against on unknown-email logins so both 401 paths pay for
    /// one argon2 run.
    filler_digest: OnceCell<String>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher, keys: Arc<JwtKeys>) -> Self {
        Self {
            users,
            hasher,
            keys,
            filler_digest: OnceCell::new(),
        }
    }

    pub async fn signup(&self, req: SignupRequest) -> Result<i64, AuthError> {
        let email = normalize_email(&req.email);

        match self.users.find_by_email(&email).await {
            Ok(Some(_)) => {
                warn!(email = %email, "email already registered");
                return Err(AuthError::EmailAlreadyRegistered);
            }
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "find_by_email failed during signup");
                return Err(AuthError::SignupFailed);
            }
        }

        let password_hash = self.hash(req.password).await.map_err(|e| {
            error!(error = %e, "hash_password failed");
            AuthError::SignupFailed
        })?;

        let new_user = NewUser {
            email,
            full_name: req.full_name,
            phone: req.phone,
            specialty: req.specialty,
            license_number: req.license_number,
            years_of_experience: req.years_of_experience,
            password_hash,
        };

        match self.users.insert(new_user).await {
            Ok(user) => {
                info!(user_id = user.id, email = %user.email, "user registered");
                Ok(user.id)
            }
            Err(StoreError::DuplicateEmail) => {
                warn!("concurrent signup lost the unique-email race");
                Err(AuthError::EmailAlreadyRegistered)
            }
            Err(e) => {
                error!(error = %e, "create user failed");
                Err(AuthError::SignupFailed)
            }
        }
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(&req.email);

        let user = match self.users.find_by_email(&email).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!(email = %email, "login unknown email");
                self.verify_filler(req.password).await;
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, "find_by_email failed");
                return Err(AuthError::AuthServiceUnavailable);
            }
        };

        let ok = self
            .verify(req.password, user.password_hash.clone())
            .await
            .map_err(|e| {
                error!(error = %e, user_id = user.id, "verify_password failed");
                AuthError::AuthServiceUnavailable
            })?;
        if !ok {
            warn!(email = %email, user_id = user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .keys
            .issue(user.id, &user.email, &user.full_name)
            .map_err(|e| {
                error!(error = %e, "jwt sign failed");
                AuthError::AuthServiceUnavailable
            })?;

        info!(user_id = user.id, email = %user.email, "user logged in");
        Ok(LoginOutcome {
            token,
            user: user.into(),
        })
    }

    /// Profile for an already-verified session. A token for a user that no
    /// longer exists is treated as an invalid session.
    pub async fn current_user(&self, user_id: i64) -> Result<PublicUser, AuthError> {
        match self.users.find_by_id(user_id).await {
            Ok(Some(u)) => Ok(u.into()),
            Ok(None) => {
                warn!(user_id, "token subject not found");
                Err(AuthError::InvalidSession)
            }
            Err(e) => {
                error!(error = %e, user_id, "find_by_id failed");
                Err(AuthError::AuthServiceUnavailable)
            }
        }
    }

    async fn verify_filler(&self, plain: String) {
        let digest = match self
            .filler_digest
            .get_or_try_init(|| self.hash("clinicdesk-unknown-account".to_string()))
            .await
        {
            Ok(d) => d.clone(),
            Err(e) => {
                debug!(error = %e, "filler digest unavailable");
                return;
            }
        };
        if let Err(e) = self.verify(plain, digest).await {
            debug!(error = %e, "filler verify failed");
        }
    }

    async fn hash(&self, plain: String) -> Result<String, ServiceHashError> {
        let hasher = self.hasher.clone();
        Ok(tokio::task::spawn_blocking(move || hasher.hash(&plain)).await??)
    }

    async fn verify(&self, plain: String, digest: String) -> Result<bool, ServiceHashError> {
        let hasher = self.hasher.clone();
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&plain, &digest)).await??)
    }
}

#[derive(Debug, Error)]
enum ServiceHashError {
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
