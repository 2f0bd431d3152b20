use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date};

use super::{
    handlers::PatientError,
    repo::{NewPatient, Patient, PatientUpdate},
};

/// Body of `POST /api/patients`. Empty strings from the form count as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePatientRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

/// Body of `PUT /api/patients/:id`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdatePatientRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub blood_type: Option<String>,
    pub address: Option<String>,
}

fn blank_to_none(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn required_name(name: &str) -> Result<String, PatientError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PatientError::Validation("fullName is required".into()));
    }
    Ok(name.to_string())
}

fn parse_date(raw: Option<String>) -> Result<Option<Date>, PatientError> {
    blank_to_none(raw)
        .map(|s| {
            Date::parse(&s, format_description!("[year]-[month]-[day]")).map_err(|_| {
                PatientError::Validation("dateOfBirth must be formatted as YYYY-MM-DD".into())
            })
        })
        .transpose()
}

impl CreatePatientRequest {
    pub fn validate(self) -> Result<NewPatient, PatientError> {
        Ok(NewPatient {
            full_name: required_name(&self.full_name)?,
            email: blank_to_none(self.email).map(|e| e.to_lowercase()),
            phone: blank_to_none(self.phone),
            date_of_birth: parse_date(self.date_of_birth)?,
            gender: blank_to_none(self.gender),
            blood_type: blank_to_none(self.blood_type),
            address: blank_to_none(self.address),
            city: blank_to_none(self.city),
            state: blank_to_none(self.state),
            zip_code: blank_to_none(self.zip_code),
        })
    }
}

impl UpdatePatientRequest {
    pub fn validate(self) -> Result<PatientUpdate, PatientError> {
        Ok(PatientUpdate {
            full_name: required_name(&self.full_name)?,
            email: blank_to_none(self.email).map(|e| e.to_lowercase()),
            phone: blank_to_none(self.phone),
            blood_type: blank_to_none(self.blood_type),
            address: blank_to_none(self.address),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PatientListResponse {
    pub success: bool,
    pub data: Vec<Patient>,
}

#[derive(Debug, Serialize)]
pub struct PatientResponse {
    pub success: bool,
    pub data: Patient,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientCreatedResponse {
    pub success: bool,
    pub message: &'static str,
    pub patient_id: i64,
}

#[derive(Debug, Serialize)]
pub struct PatientMessageResponse {
    pub success: bool,
    pub message: &'static str,
}
