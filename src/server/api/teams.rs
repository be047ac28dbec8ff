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
use crate::server::dto::{CreateTeamRequest, HookRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_team_alias;
use crate::store::cascade;
use crate::types::{Hook, HookConfig, Team, TeamSelector};

use super::access::{require_team_member, require_team_owner};

pub async fn list_teams(auth: RequireUser, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let teams = state.store.find_teams_by_owner(&auth.user.email)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(teams)))
}

pub async fn create_team(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTeamRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_team_alias(&req.alias)?;

    match store.find_team_by_alias(&req.alias) {
        Ok(_) => return Err(ApiError::conflict("Team already exists")),
        Err(Error::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let mut users = req.users;
    if !users.contains(&auth.user.email) {
        users.insert(0, auth.user.email.clone());
    }

    let team = Team {
        name: req.name,
        alias: req.alias,
        owner: auth.user.email,
        users,
    };
    store.upsert_team(&team)?;

    tracing::info!(alias = %team.alias, owner = %team.owner, "team created");

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(team))))
}

pub async fn get_team(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
) -> impl IntoResponse {
    let team = require_team_member(state.store.as_ref(), &auth.user, &alias)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(team)))
}

/// Removes the team's hooks, then the team. Apps and services stay with
/// their owners.
pub async fn delete_team(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let team = require_team_owner(store, &auth.user, &alias)?;

    // Subscribers are resolved before the cascade removes the team's own
    // hooks, and announced only once it committed.
    let (report, _) = state
        .hooks
        .publish_after(HookEvent::TeamDelete, &team.alias, || {
            cascade::remove_team(store, &team)
        })
        .or_not_found("Team not found")?;

    tracing::info!(
        alias = %team.alias,
        hooks_removed = report.dependents_removed,
        "team deleted"
    );

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_team_services(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let team = require_team_member(store, &auth.user, &alias)?;

    let services = store.find_services_by_team(&team.alias)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(services)))
}

pub async fn list_team_apps(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let team = require_team_member(store, &auth.user, &alias)?;

    let apps = store.find_apps_by_team(&team.alias)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(apps)))
}

pub async fn upsert_team_hook(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
    Json(req): Json<HookRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let team = require_team_member(store, &auth.user, &alias)?;

    if req.events.is_empty() {
        return Err(ApiError::bad_request("A hook needs at least one event"));
    }

    let hook = Hook {
        name: req.name,
        team: TeamSelector::team(team.alias),
        events: req.events,
        config: req.config,
    };
    store.upsert_hook(&hook)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(hook)))
}

pub async fn delete_team_hook(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((alias, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let team = require_team_member(store, &auth.user, &alias)?;

    // Hooks are identified by (team, name); the rest is not consulted.
    let hook = Hook {
        name,
        team: TeamSelector::team(team.alias),
        events: Vec::new(),
        config: HookConfig {
            address: String::new(),
        },
    };
    store.delete_hook(&hook).or_not_found("Hook not found")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
