use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use thiserror::Error;
use tracing::{error, field, info, instrument, warn, Span};

use super::{
    dto::{
        CreatePatientRequest, PatientCreatedResponse, PatientListResponse, PatientMessageResponse,
        PatientResponse, UpdatePatientRequest,
    },
    repo,
};
use crate::{auth::AuthUser, error::error_response, state::AppState};

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("patient not found")]
    NotFound,
    /// `context` is the only part the client sees.
    #[error("{context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl IntoResponse for PatientError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(message) => error_response(StatusCode::BAD_REQUEST, &message),
            Self::NotFound => error_response(StatusCode::NOT_FOUND, "Patient not found"),
            Self::Database { context, .. } => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, context)
            }
        }
    }
}

impl From<JsonRejection> for PatientError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected patient body");
        Self::Validation("Invalid request body".into())
    }
}

impl From<PathRejection> for PatientError {
    fn from(rejection: PathRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected patient id");
        Self::Validation("Invalid patient id".into())
    }
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> PatientError {
    move |source| {
        error!(error = %source, "{context}");
        PatientError::Database { context, source }
    }
}

pub fn patient_routes() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
}

#[instrument(skip_all)]
pub async fn list_patients(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> Result<Json<PatientListResponse>, PatientError> {
    let data = repo::list(&state.db)
        .await
        .map_err(db_error("Error fetching patients"))?;
    Ok(Json(PatientListResponse {
        success: true,
        data,
    }))
}

#[instrument(skip_all, fields(patient_id = field::Empty))]
pub async fn get_patient(
    State(state): State<AppState>,
    _session: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<PatientResponse>, PatientError> {
    let Path(id) = path?;
    Span::current().record("patient_id", id);
    let data = repo::find(&state.db, id)
        .await
        .map_err(db_error("Error fetching patient"))?
        .ok_or(PatientError::NotFound)?;
    Ok(Json(PatientResponse {
        success: true,
        data,
    }))
}

#[instrument(skip_all, fields(doctor_id = claims.user_id))]
pub async fn create_patient(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    body: Result<Json<CreatePatientRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PatientCreatedResponse>), PatientError> {
    let Json(payload) = body?;
    let new_patient = payload.validate()?;
    let patient_id = repo::create(&state.db, &new_patient)
        .await
        .map_err(db_error("Error creating patient"))?;
    info!(patient_id, "patient created");
    Ok((
        StatusCode::CREATED,
        Json(PatientCreatedResponse {
            success: true,
            message: "Patient created successfully",
            patient_id,
        }),
    ))
}

#[instrument(skip_all, fields(patient_id = field::Empty))]
pub async fn update_patient(
    State(state): State<AppState>,
    _session: AuthUser,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdatePatientRequest>, JsonRejection>,
) -> Result<Json<PatientMessageResponse>, PatientError> {
    let Path(id) = path?;
    Span::current().record("patient_id", id);
    let Json(payload) = body?;
    let update = payload.validate()?;
    let found = repo::update(&state.db, id, &update)
        .await
        .map_err(db_error("Error updating patient"))?;
    if !found {
        return Err(PatientError::NotFound);
    }
    Ok(Json(PatientMessageResponse {
        success: true,
        message: "Patient updated successfully",
    }))
}

#[instrument(skip_all, fields(patient_id = field::Empty))]
pub async fn delete_patient(
    State(state): State<AppState>,
    _session: AuthUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<PatientMessageResponse>, PatientError> {
    let Path(id) = path?;
    Span::current().record("patient_id", id);
    let found = repo::delete(&state.db, id)
        .await
        .map_err(db_error("Error deleting patient"))?;
    if !found {
        return Err(PatientError::NotFound);
    }
    info!(patient_id = id, "patient deleted");
    Ok(Json(PatientMessageResponse {
        success: true,
        message: "Patient deleted successfully",
    }))
}
