mod access;
mod apps;
mod hooks;
mod services;
mod teams;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::hooks::HookEvent;
use crate::server::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Accounts
        .route("/users", post(users::signup))
        .route("/users", delete(users::delete_me))
        .route("/password", put(users::change_password))
        .route("/login", post(users::login))
        .route("/login", delete(users::logout))
        .route("/me", get(users::me))
        // Teams
        .route("/teams", get(teams::list_teams))
        .route("/teams", post(teams::create_team))
        .route("/teams/{alias}", get(teams::get_team))
        .route("/teams/{alias}", delete(teams::delete_team))
        .route("/teams/{alias}/services", get(teams::list_team_services))
        .route("/teams/{alias}/apps", get(teams::list_team_apps))
        .route("/teams/{alias}/hooks", put(teams::upsert_team_hook))
        .route(
            "/teams/{alias}/hooks/{name}",
            delete(teams::delete_team_hook),
        )
        // Hooks
        .route("/hooks", get(hooks::resolve_hooks))
        // Services and their plugins
        .route("/services", get(services::list_services))
        .route("/services", post(services::create_service))
        .route("/services/{subdomain}", get(services::get_service))
        .route("/services/{subdomain}", put(services::update_service))
        .route("/services/{subdomain}", delete(services::delete_service))
        .route(
            "/services/{subdomain}/plugins",
            get(services::list_plugins),
        )
        .route(
            "/services/{subdomain}/plugins",
            put(services::upsert_plugin),
        )
        .route(
            "/services/{subdomain}/plugins/{name}",
            delete(services::delete_plugin),
        )
        // Apps
        .route("/apps", post(apps::create_app))
        .route("/apps/{client_id}", get(apps::get_app))
        .route("/apps/{client_id}", put(apps::update_app))
        .route("/apps/{client_id}", delete(apps::delete_app))
}

/// Records the subscribers of a lifecycle event. The mutation already
/// happened, so a lookup failure is logged and not returned to the caller.
fn notify(state: &AppState, event: HookEvent, alias: &str) {
    if let Err(e) = state.hooks.publish(event, alias) {
        tracing::warn!(event = %event, team = alias, "Failed to resolve subscribers: {e}");
    }
}
