//! Parent removal with dependents cleaned up first.
//!
//! Plugins hang off a service subdomain and hooks off a team alias. Each
//! helper runs the bulk delete for the dependents and only then deletes the
//! parent, so an interrupted sequence can leave a parent without dependents
//! but never dependents without their parent.

use super::Store;
use crate::error::Result;
use crate::types::{Service, Team};

/// Outcome of a cascading removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeReport {
    /// False when the parent had no dependents to clean up.
    pub dependents_removed: bool,
}

/// Interprets the result of a dependent cleanup step.
/// NotFound means there was nothing to clean up; anything else aborts.
fn cleanup_outcome(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Deletes every plugin bound to the service, then the service itself.
pub fn remove_service(store: &dyn Store, service: &Service) -> Result<CascadeReport> {
    let dependents_removed = cleanup_outcome(store.delete_plugins_by_service(&service.subdomain))?;
    store.delete_service(service)?;

    tracing::debug!(
        subdomain = %service.subdomain,
        dependents_removed,
        "removed service"
    );

    Ok(CascadeReport { dependents_removed })
}

/// Deletes every hook scoped to the team, then the team itself.
/// Apps and services of the team are left for their owners to delete.
pub fn remove_team(store: &dyn Store, team: &Team) -> Result<CascadeReport> {
    let dependents_removed = cleanup_outcome(store.delete_hooks_by_team(&team.alias))?;
    store.delete_team(team)?;

    tracing::debug!(alias = %team.alias, dependents_removed, "removed team");

    Ok(CascadeReport { dependents_removed })
}
