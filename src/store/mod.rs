pub mod cascade;
mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the storage contract every backend satisfies.
///
/// Finders addressing a single identity fail with `Error::NotFound` when no
/// record matches. Finders returning collections yield an empty, ordered
/// `Vec` instead. Every delete, including the bulk deletes, fails with
/// `Error::NotFound` when it removed nothing.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn upsert_user(&self, user: &User) -> Result<()>;
    fn delete_user(&self, user: &User) -> Result<()>;
    fn find_user_by_email(&self, email: &str) -> Result<User>;

    // Team operations
    fn upsert_team(&self, team: &Team) -> Result<()>;
    fn delete_team(&self, team: &Team) -> Result<()> {
        self.delete_team_by_alias(&team.alias)
    }
    fn delete_team_by_alias(&self, alias: &str) -> Result<()>;
    fn find_team_by_alias(&self, alias: &str) -> Result<Team>;
    fn find_teams_by_owner(&self, email: &str) -> Result<Vec<Team>>;

    // Service operations
    fn upsert_service(&self, service: &Service) -> Result<()>;
    fn delete_service(&self, service: &Service) -> Result<()>;
    fn find_service_by_subdomain(&self, subdomain: &str) -> Result<Service>;
    fn find_services_by_team(&self, alias: &str) -> Result<Vec<Service>>;
    /// Services across every team owned by `email`.
    fn find_services_by_user(&self, email: &str) -> Result<Vec<Service>>;

    // App operations
    fn upsert_app(&self, app: &App) -> Result<()>;
    fn delete_app(&self, app: &App) -> Result<()>;
    fn find_app_by_client_id(&self, client_id: &str) -> Result<App>;
    fn find_apps_by_team(&self, alias: &str) -> Result<Vec<App>>;

    // Plugin operations
    fn upsert_plugin(&self, plugin: &Plugin) -> Result<()>;
    fn delete_plugin(&self, plugin: &Plugin) -> Result<()>;
    fn delete_plugins_by_service(&self, subdomain: &str) -> Result<()>;
    fn find_plugin_by_name_and_service(&self, name: &str, subdomain: &str) -> Result<Plugin>;
    fn find_plugins_by_service(&self, subdomain: &str) -> Result<Vec<Plugin>>;

    // Hook operations
    fn upsert_hook(&self, hook: &Hook) -> Result<()>;
    fn delete_hook(&self, hook: &Hook) -> Result<()>;
    /// Removes the hooks scoped to team `alias`. The wildcard is not a team
    /// alias, so global hooks are never removed here.
    fn delete_hooks_by_team(&self, alias: &str) -> Result<()>;
    /// Hooks listening to `event` whose scope is admitted by `team`.
    /// Each hook appears at most once, ordered by name then team.
    fn find_hooks_by_event_and_team(&self, event: &str, team: &TeamSelector) -> Result<Vec<Hook>>;
    fn find_hooks_by_event(&self, event: &str) -> Result<Vec<Hook>> {
        self.find_hooks_by_event_and_team(event, &TeamSelector::AllTeams)
    }

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn delete_token(&self, access_token: &str) -> Result<()>;
    /// Looks up a live token. Fails `Expired` once its time to live elapsed.
    fn find_token(&self, access_token: &str) -> Result<Token>;
    /// Resolves a live token to its bound user, password cleared.
    fn decode_token(&self, access_token: &str) -> Result<User> {
        self.find_token(access_token)
            .map(|token| token.user.without_password())
    }
    /// Removes every token expired at `now`, returning how many were removed.
    fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize>;

    fn close(&self) -> Result<()>;
}
