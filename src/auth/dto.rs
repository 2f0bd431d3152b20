use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{repo_types::User, services::AuthError};

/// Request body for `POST /api/auth/signup`. Missing strings deserialize as
/// empty so `validate` can report them as a 400 rather than a 422.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub specialty: String,
    pub license_number: String,
    pub years_of_experience: Option<i32>,
    pub password: String,
}

/// Request body for `POST /api/auth/login`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails compare case-insensitively; this is the stored and looked-up form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn require(value: &str, field: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::Validation(format!("{field} is required")));
    }
    Ok(())
}

impl SignupRequest {
    pub fn validate(&mut self) -> Result<(), AuthError> {
        require(&self.full_name, "fullName")?;
        require(&self.email, "email")?;
        require(&self.phone, "phone")?;
        require(&self.specialty, "specialty")?;
        require(&self.license_number, "licenseNumber")?;
        require(&self.password, "password")?;

        self.email = normalize_email(&self.email);
        self.full_name = self.full_name.trim().to_string();
        if !is_valid_email(&self.email) {
            return Err(AuthError::Validation("Invalid email".into()));
        }
        if matches!(self.years_of_experience, Some(y) if y < 0) {
            return Err(AuthError::Validation(
                "yearsOfExperience cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

impl LoginRequest {
    /// Only presence is checked; a malformed email is just an unknown one.
    pub fn validate(&mut self) -> Result<(), AuthError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AuthError::Validation(
                "Email and password are required".into(),
            ));
        }
        self.email = normalize_email(&self.email);
        Ok(())
    }
}

/// Public part of the user returned to the client. Has no hash field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub specialty: String,
    pub license_number: String,
    pub years_of_experience: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            phone: u.phone,
            specialty: u.specialty,
            license_number: u.license_number,
            years_of_experience: u.years_of_experience,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub message: &'static str,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: &'static str,
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: PublicUser,
}
