use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::error::Error;
use crate::hooks::HookEvent;
use crate::server::AppState;
use crate::server::dto::{CreateAppRequest, UpdateAppRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::App;

use super::access::{require_app_access, require_team_member};
use super::notify;

/// Creates an app in one of the caller's teams. Client id and secret are
/// generated unless given.
pub async fn create_app(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAppRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("App name cannot be empty"));
    }

    let team = require_team_member(store, &auth.user, &req.team)?;

    let client_id = req
        .client_id
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    match store.find_app_by_client_id(&client_id) {
        Ok(_) => return Err(ApiError::conflict("Client id already in use")),
        Err(Error::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let app = App {
        client_id,
        client_secret: req
            .client_secret
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
        name: req.name,
        owner: auth.user.email,
        team: team.alias,
        redirect_uris: req.redirect_uris,
    };
    store.upsert_app(&app)?;
    notify(&state, HookEvent::AppCreate, &app.team);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(app))))
}

pub async fn get_app(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> impl IntoResponse {
    let app = require_app_access(state.store.as_ref(), &auth.user, &client_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(app)))
}

pub async fn update_app(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
    Json(req): Json<UpdateAppRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let mut app = require_app_access(store, &auth.user, &client_id)?;

    if let Some(name) = req.name {
        app.name = name;
    }
    if let Some(redirect_uris) = req.redirect_uris {
        app.redirect_uris = redirect_uris;
    }

    store.upsert_app(&app)?;
    notify(&state, HookEvent::AppUpdate, &app.team);

    Ok::<_, ApiError>(Json(ApiResponse::success(app)))
}

pub async fn delete_app(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(client_id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let app = require_app_access(store, &auth.user, &client_id)?;

    store.delete_app(&app).or_not_found("App not found")?;
    notify(&state, HookEvent::AppDelete, &app.team);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
