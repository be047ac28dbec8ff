use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::Store;
use crate::error::{Error, Result};
use crate::types::*;

#[derive(Default)]
struct Tables {
    users: BTreeMap<String, User>,
    teams: BTreeMap<String, Team>,
    apps: BTreeMap<String, App>,
    services: BTreeMap<String, Service>,
    /// Keyed by (service, name) so a service's plugins are contiguous.
    plugins: BTreeMap<(String, String), Plugin>,
    /// Keyed by (name, team) which is also the result order of hook queries.
    hooks: BTreeMap<(String, String), Hook>,
    tokens: BTreeMap<String, Token>,
}

/// In-process backend holding every table behind one lock.
///
/// Each operation takes the lock once, so single writes and bulk deletes are
/// atomic with respect to each other. Nothing is persisted.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn hook_key(hook: &Hook) -> (String, String) {
    (hook.name.clone(), hook.team.as_str().to_string())
}

fn removed<T>(value: Option<T>) -> Result<()> {
    value.map(|_| ()).ok_or(Error::NotFound)
}

impl Store for MemoryStore {
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    // User operations

    fn upsert_user(&self, user: &User) -> Result<()> {
        user.validate()?;
        self.write().users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    fn delete_user(&self, user: &User) -> Result<()> {
        removed(self.write().users.remove(&user.email))
    }

    fn find_user_by_email(&self, email: &str) -> Result<User> {
        self.read().users.get(email).cloned().ok_or(Error::NotFound)
    }

    // Team operations

    fn upsert_team(&self, team: &Team) -> Result<()> {
        team.validate()?;
        self.write().teams.insert(team.alias.clone(), team.clone());
        Ok(())
    }

    fn delete_team_by_alias(&self, alias: &str) -> Result<()> {
        removed(self.write().teams.remove(alias))
    }

    fn find_team_by_alias(&self, alias: &str) -> Result<Team> {
        self.read().teams.get(alias).cloned().ok_or(Error::NotFound)
    }

    fn find_teams_by_owner(&self, email: &str) -> Result<Vec<Team>> {
        Ok(self
            .read()
            .teams
            .values()
            .filter(|t| t.owner == email)
            .cloned()
            .collect())
    }

    // Service operations

    fn upsert_service(&self, service: &Service) -> Result<()> {
        service.validate()?;
        self.write()
            .services
            .insert(service.subdomain.clone(), service.clone());
        Ok(())
    }

    fn delete_service(&self, service: &Service) -> Result<()> {
        removed(self.write().services.remove(&service.subdomain))
    }

    fn find_service_by_subdomain(&self, subdomain: &str) -> Result<Service> {
        self.read()
            .services
            .get(subdomain)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn find_services_by_team(&self, alias: &str) -> Result<Vec<Service>> {
        Ok(self
            .read()
            .services
            .values()
            .filter(|s| s.team == alias)
            .cloned()
            .collect())
    }

    fn find_services_by_user(&self, email: &str) -> Result<Vec<Service>> {
        let tables = self.read();
        Ok(tables
            .services
            .values()
            .filter(|s| {
                tables
                    .teams
                    .get(&s.team)
                    .is_some_and(|team| team.owner == email)
            })
            .cloned()
            .collect())
    }

    // App operations

    fn upsert_app(&self, app: &App) -> Result<()> {
        app.validate()?;
        self.write().apps.insert(app.client_id.clone(), app.clone());
        Ok(())
    }

    fn delete_app(&self, app: &App) -> Result<()> {
        removed(self.write().apps.remove(&app.client_id))
    }

    fn find_app_by_client_id(&self, client_id: &str) -> Result<App> {
        self.read()
            .apps
            .get(client_id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn find_apps_by_team(&self, alias: &str) -> Result<Vec<App>> {
        Ok(self
            .read()
            .apps
            .values()
            .filter(|a| a.team == alias)
            .cloned()
            .collect())
    }

    // Plugin operations

    fn upsert_plugin(&self, plugin: &Plugin) -> Result<()> {
        plugin.validate()?;
        self.write().plugins.insert(
            (plugin.service.clone(), plugin.name.clone()),
            plugin.clone(),
        );
        Ok(())
    }

    fn delete_plugin(&self, plugin: &Plugin) -> Result<()> {
        let key = (plugin.service.clone(), plugin.name.clone());
        removed(self.write().plugins.remove(&key))
    }

    fn delete_plugins_by_service(&self, subdomain: &str) -> Result<()> {
        let mut tables = self.write();
        let before = tables.plugins.len();
        tables.plugins.retain(|(service, _), _| service != subdomain);
        if tables.plugins.len() == before {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn find_plugin_by_name_and_service(&self, name: &str, subdomain: &str) -> Result<Plugin> {
        let key = (subdomain.to_string(), name.to_string());
        self.read()
            .plugins
            .get(&key)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn find_plugins_by_service(&self, subdomain: &str) -> Result<Vec<Plugin>> {
        Ok(self
            .read()
            .plugins
            .values()
            .filter(|p| p.service == subdomain)
            .cloned()
            .collect())
    }

    // Hook operations

    fn upsert_hook(&self, hook: &Hook) -> Result<()> {
        hook.validate()?;
        self.write().hooks.insert(hook_key(hook), hook.clone());
        Ok(())
    }

    fn delete_hook(&self, hook: &Hook) -> Result<()> {
        if hook.team.is_reserved_alias() {
            return Err(Error::NotFound);
        }
        removed(self.write().hooks.remove(&hook_key(hook)))
    }

    fn delete_hooks_by_team(&self, alias: &str) -> Result<()> {
        if alias == ALL_TEAMS {
            return Err(Error::NotFound);
        }
        let mut tables = self.write();
        let before = tables.hooks.len();
        tables.hooks.retain(|(_, team), _| team != alias);
        if tables.hooks.len() == before {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn find_hooks_by_event_and_team(&self, event: &str, team: &TeamSelector) -> Result<Vec<Hook>> {
        Ok(self
            .read()
            .hooks
            .values()
            .filter(|h| team.admits(&h.team) && h.listens_to(event))
            .cloned()
            .collect())
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        token.validate()?;
        let mut tables = self.write();
        if tables.tokens.contains_key(&token.access_token) {
            return Err(Error::Conflict("access token already exists".to_string()));
        }

        let mut stored = token.clone();
        stored.user.password = String::new();
        tables.tokens.insert(token.access_token.clone(), stored);
        Ok(())
    }

    fn delete_token(&self, access_token: &str) -> Result<()> {
        removed(self.write().tokens.remove(access_token))
    }

    fn find_token(&self, access_token: &str) -> Result<Token> {
        let tables = self.read();
        let token = tables.tokens.get(access_token).ok_or(Error::NotFound)?;

        if token.is_expired_at(Utc::now()) {
            return Err(Error::Expired);
        }

        Ok(token.clone())
    }

    fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut tables = self.write();
        let before = tables.tokens.len();
        tables.tokens.retain(|_, token| !token.is_expired_at(now));
        Ok(before - tables.tokens.len())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
