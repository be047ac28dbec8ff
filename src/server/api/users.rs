use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};

use crate::auth::{RequireUser, extract_token_from_header, session};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{ChangePasswordRequest, LoginRequest, SignupRequest, TokenResponse};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::validate_email;
use crate::types::User;

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> impl IntoResponse {
    validate_email(&req.email)?;

    let user = User {
        name: req.name,
        email: req.email,
        password: req.password,
    };
    let created = session::signup(state.store.as_ref(), &user)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn delete_me(auth: RequireUser, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store.as_ref();

    store.delete_user(&auth.user)?;
    session::logout(store, &auth.access_token)?;

    tracing::info!(email = %auth.user.email, "user deleted");

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChangePasswordRequest>,
) -> impl IntoResponse {
    session::change_password(
        state.store.as_ref(),
        &req.email,
        &req.password,
        &req.new_password,
        &req.confirmation_password,
    )?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    if let Some(client_id) = req.client_id.as_deref() {
        match store.find_app_by_client_id(client_id) {
            Ok(_) => {}
            Err(Error::NotFound) => return Err(ApiError::bad_request("Unknown client id")),
            Err(e) => return Err(e.into()),
        }
    }

    let token = session::login(
        store,
        &req.email,
        &req.password,
        state.token_ttl_seconds,
        req.client_id,
    )
    .map_err(|e| match e {
        Error::Unauthorized => ApiError::unauthorized("Invalid email or password"),
        e => ApiError::from(e),
    })?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(TokenResponse::from(token))),
    ))
}

/// Revokes the presented token. Unknown and already revoked tokens succeed.
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    let auth_header = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());

    let raw_token = extract_token_from_header(auth_header)
        .ok()
        .flatten()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    session::logout(state.store.as_ref(), &raw_token)?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn me(auth: RequireUser) -> impl IntoResponse {
    Json(ApiResponse::success(auth.user))
}
