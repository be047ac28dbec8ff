use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::error::Error;
use crate::hooks::HookEvent;
use crate::server::AppState;
use crate::server::dto::{CreateServiceRequest, PluginRequest, UpdateServiceRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_subdomain;
use crate::store::cascade;
use crate::types::{Plugin, PluginConfig, Service};

use super::access::{require_service_access, require_team_member};
use super::notify;

pub async fn list_services(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let services = state.store.find_services_by_user(&auth.user.email)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(services)))
}

pub async fn create_service(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateServiceRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_subdomain(&req.subdomain)?;
    if req.endpoint.trim().is_empty() {
        return Err(ApiError::bad_request("Endpoint cannot be empty"));
    }

    let team = require_team_member(store, &auth.user, &req.team)?;

    match store.find_service_by_subdomain(&req.subdomain) {
        Ok(_) => return Err(ApiError::conflict("Subdomain already in use")),
        Err(Error::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let service = Service {
        subdomain: req.subdomain,
        endpoint: req.endpoint,
        team: team.alias,
        owner: auth.user.email,
        transformers: req.transformers,
    };
    store.upsert_service(&service)?;
    notify(&state, HookEvent::ServiceCreate, &service.team);

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(service))))
}

pub async fn get_service(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(subdomain): Path<String>,
) -> impl IntoResponse {
    let service = require_service_access(state.store.as_ref(), &auth.user, &subdomain)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(service)))
}

pub async fn update_service(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(subdomain): Path<String>,
    Json(req): Json<UpdateServiceRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let mut service = require_service_access(store, &auth.user, &subdomain)?;

    if let Some(endpoint) = req.endpoint {
        if endpoint.trim().is_empty() {
            return Err(ApiError::bad_request("Endpoint cannot be empty"));
        }
        service.endpoint = endpoint;
    }
    if let Some(transformers) = req.transformers {
        service.transformers = transformers;
    }

    store.upsert_service(&service)?;
    notify(&state, HookEvent::ServiceUpdate, &service.team);

    Ok::<_, ApiError>(Json(ApiResponse::success(service)))
}

/// Removes the service's plugins, then the service.
pub async fn delete_service(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(subdomain): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let service = require_service_access(store, &auth.user, &subdomain)?;

    let report = cascade::remove_service(store, &service).or_not_found("Service not found")?;
    notify(&state, HookEvent::ServiceDelete, &service.team);

    tracing::info!(
        subdomain = %service.subdomain,
        plugins_removed = report.dependents_removed,
        "service deleted"
    );

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_plugins(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(subdomain): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let service = require_service_access(store, &auth.user, &subdomain)?;

    let plugins = store.find_plugins_by_service(&service.subdomain)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(plugins)))
}

pub async fn upsert_plugin(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(subdomain): Path<String>,
    Json(req): Json<PluginRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let service = require_service_access(store, &auth.user, &subdomain)?;

    let plugin = Plugin {
        name: req.name,
        service: service.subdomain,
        config: req.config,
    };
    store.upsert_plugin(&plugin)?;
    notify(&state, HookEvent::PluginUpdate, &service.team);

    Ok::<_, ApiError>(Json(ApiResponse::success(plugin)))
}

pub async fn delete_plugin(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((subdomain, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let service = require_service_access(store, &auth.user, &subdomain)?;

    // Plugins are identified by (name, service).
    let plugin = Plugin {
        name,
        service: service.subdomain,
        config: PluginConfig::new(),
    };
    store.delete_plugin(&plugin).or_not_found("Plugin not found")?;
    notify(&state, HookEvent::PluginDelete, &service.team);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
