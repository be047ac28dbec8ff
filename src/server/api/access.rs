use crate::error::Error;
use crate::server::response::{ApiError, StoreResultExt};
use crate::store::Store;
use crate::types::{App, Service, Team, User};

/// Loads a team the user belongs to, either as owner or listed member.
pub fn require_team_member(store: &dyn Store, user: &User, alias: &str) -> Result<Team, ApiError> {
    let team = store.find_team_by_alias(alias).or_not_found("Team not found")?;

    if !team.has_member(&user.email) {
        return Err(ApiError::forbidden("Not a member of this team"));
    }

    Ok(team)
}

pub fn require_team_owner(store: &dyn Store, user: &User, alias: &str) -> Result<Team, ApiError> {
    let team = require_team_member(store, user, alias)?;

    if team.owner != user.email {
        return Err(ApiError::forbidden("Only the team owner can do this"));
    }

    Ok(team)
}

/// Returns true if the user may manage a record owned by `owner` in team
/// `alias`. The record owner keeps access even after the team is gone.
fn can_manage(store: &dyn Store, user: &User, owner: &str, alias: &str) -> Result<bool, ApiError> {
    if owner == user.email {
        return Ok(true);
    }

    match store.find_team_by_alias(alias) {
        Ok(team) => Ok(team.has_member(&user.email)),
        Err(Error::NotFound) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub fn require_service_access(
    store: &dyn Store,
    user: &User,
    subdomain: &str,
) -> Result<Service, ApiError> {
    let service = store
        .find_service_by_subdomain(subdomain)
        .or_not_found("Service not found")?;

    if !can_manage(store, user, &service.owner, &service.team)? {
        return Err(ApiError::forbidden("Not a member of the service team"));
    }

    Ok(service)
}

pub fn require_app_access(store: &dyn Store, user: &User, client_id: &str) -> Result<App, ApiError> {
    let app = store
        .find_app_by_client_id(client_id)
        .or_not_found("App not found")?;

    if !can_manage(store, user, &app.owner, &app.team)? {
        return Err(ApiError::forbidden("Not a member of the app team"));
    }

    Ok(app)
}
