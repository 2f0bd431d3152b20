use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(with = "iso_date::option")]
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPatient {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PatientUpdate {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub blood_type: Option<String>,
    pub address: Option<String>,
}

const PATIENT_COLUMNS: &str = "id, full_name, email, phone, date_of_birth, gender, blood_type, \
                               address, city, state, zip_code, created_at";

pub async fn list(db: &PgPool) -> Result<Vec<Patient>, sqlx::Error> {
    sqlx::query_as::<_, Patient>(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY full_name ASC, id ASC"
    ))
    .fetch_all(db)
    .await
}

pub async fn find(db: &PgPool, id: i64) -> Result<Option<Patient>, sqlx::Error> {
    sqlx::query_as::<_, Patient>(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn create(db: &PgPool, p: &NewPatient) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO patients (full_name, email, phone, date_of_birth, gender,
                              blood_type, address, city, state, zip_code)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(&p.full_name)
    .bind(&p.email)
    .bind(&p.phone)
    .bind(p.date_of_birth)
    .bind(&p.gender)
    .bind(&p.blood_type)
    .bind(&p.address)
    .bind(&p.city)
    .bind(&p.state)
    .bind(&p.zip_code)
    .fetch_one(db)
    .await?;
    Ok(id)
}

/// Returns false when no patient has `id`.
pub async fn update(db: &PgPool, id: i64, p: &PatientUpdate) -> Result<bool, sqlx::Error> {
    let done = sqlx::query(
        r#"
        UPDATE patients
           SET full_name = $1, email = $2, phone = $3, blood_type = $4, address = $5
         WHERE id = $6
        "#,
    )
    .bind(&p.full_name)
    .bind(&p.email)
    .bind(&p.phone)
    .bind(&p.blood_type)
    .bind(&p.address)
    .bind(id)
    .execute(db)
    .await?;
    Ok(done.rows_affected() > 0)
}

/// Returns false when no patient has `id`.
pub async fn delete(db: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let done = sqlx::query("DELETE FROM patients WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(done.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn patient_serializes_dates_for_the_dashboard() {
        let p = Patient {
            id: 3,
            full_name: "John Doe".into(),
            email: None,
            phone: Some("555".into()),
            date_of_birth: Some(date!(1980 - 02 - 29)),
            gender: None,
            blood_type: Some("O+".into()),
            address: None,
            city: None,
            state: None,
            zip_code: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["dateOfBirth"], "1980-02-29");
        assert_eq!(json["bloodType"], "O+");
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
        assert!(json["email"].is_null());
    }
}
