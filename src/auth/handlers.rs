use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, MeResponse, SignupRequest, SignupResponse},
        extractors::AuthUser,
        services::AuthError,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, body))]
pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), AuthError> {
    let Json(mut payload) = body?;
    payload.validate()?;
    let user_id = state.auth.signup(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            message: "User created successfully",
            user_id,
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Json(mut payload) = body?;
    payload.validate()?;
    let outcome = state.auth.login(payload).await?;
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful",
        user: outcome.user,
        token: outcome.token,
    }))
}

#[instrument(skip_all, fields(user_id = claims.user_id))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<MeResponse>, AuthError> {
    let user = state.auth.current_user(claims.user_id).await?;
    Ok(Json(MeResponse {
        success: true,
        user,
    }))
}
