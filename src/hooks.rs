//! Event-hook resolution.
//!
//! The store answers the literal query: hooks listening to an event whose
//! scope is admitted by a selector. Publishers usually want more than that
//! for a team event, namely the team's own hooks plus the global ones, which
//! is what [`HookResolver::subscribers`] merges.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::store::Store;
use crate::types::{Hook, TeamSelector};

/// Lifecycle events published by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    ServiceCreate,
    ServiceUpdate,
    ServiceDelete,
    AppCreate,
    AppUpdate,
    AppDelete,
    PluginUpdate,
    PluginDelete,
    TeamDelete,
}

impl HookEvent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HookEvent::ServiceCreate => "service.create",
            HookEvent::ServiceUpdate => "service.update",
            HookEvent::ServiceDelete => "service.delete",
            HookEvent::AppCreate => "app.create",
            HookEvent::AppUpdate => "app.update",
            HookEvent::AppDelete => "app.delete",
            HookEvent::PluginUpdate => "plugin.update",
            HookEvent::PluginDelete => "plugin.delete",
            HookEvent::TeamDelete => "team.delete",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct HookResolver {
    store: Arc<dyn Store>,
}

impl HookResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Hooks listening to `event` admitted by `team`. Never fails on an
    /// empty match.
    pub fn resolve(&self, event: &str, team: &TeamSelector) -> Result<Vec<Hook>> {
        let hooks = self.store.find_hooks_by_event_and_team(event, team)?;
        tracing::debug!(event, team = %team, matched = hooks.len(), "resolved hooks");
        Ok(hooks)
    }

    /// Hooks to notify for an event raised inside team `alias`: the team's own
    /// hooks and the global ones, each at most once, ordered by name then team.
    pub fn subscribers(&self, event: &str, alias: &str) -> Result<Vec<Hook>> {
        let own = TeamSelector::team(alias);
        let hooks: Vec<Hook> = self
            .store
            .find_hooks_by_event(event)?
            .into_iter()
            .filter(|h| h.team == own || h.team.is_all_teams())
            .collect();

        tracing::debug!(event, alias, matched = hooks.len(), "resolved subscribers");
        Ok(hooks)
    }

    /// Resolves and records the subscribers of `event`. Delivery is handled
    /// outside this crate; the returned hooks carry the target addresses.
    pub fn publish(&self, event: HookEvent, alias: &str) -> Result<Vec<Hook>> {
        let hooks = self.subscribers(event.as_str(), alias)?;
        announce(event, alias, &hooks);
        Ok(hooks)
    }

    /// Publishes `event` for a mutation that removes the team's own hooks.
    ///
    /// Subscribers are resolved before `mutation` runs and announced only once
    /// it succeeds. A failed mutation announces nothing and its error is
    /// returned as is.
    pub fn publish_after<T>(
        &self,
        event: HookEvent,
        alias: &str,
        mutation: impl FnOnce() -> Result<T>,
    ) -> Result<(T, Vec<Hook>)> {
        let hooks = self.subscribers(event.as_str(), alias)?;
        let outcome = mutation()?;
        announce(event, alias, &hooks);
        Ok((outcome, hooks))
    }
}

fn announce(event: HookEvent, alias: &str, hooks: &[Hook]) {
    for hook in hooks {
        tracing::info!(
            event = %event,
            team = alias,
            hook = %hook.name,
            address = %hook.config.address,
            "event subscriber"
        );
    }
}
