use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String, // stored lowercased
    pub full_name: String,
    pub phone: String,
    pub specialty: String,
    pub license_number: String,
    pub years_of_experience: Option<i32>,
    pub password_hash: String, // argon2 PHC string, never leaves the server
    pub created_at: OffsetDateTime,
}

/// Row to insert at signup. Carries the digest, never the plaintext.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub specialty: String,
    pub license_number: String,
    pub years_of_experience: Option<i32>,
    pub password_hash: String,
}
