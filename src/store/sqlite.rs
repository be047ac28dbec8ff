use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::de::DeserializeOwned;

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Reads an RFC 3339 column. A malformed value is a conversion error, never
/// a substitute timestamp, so expiry checks cannot be bypassed.
fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Maps an affected-row count onto the "absence is NotFound" rule.
fn expect_removed(rows: usize) -> Result<()> {
    if rows == 0 {
        return Err(Error::NotFound);
    }
    Ok(())
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        email: row.get(0)?,
        name: row.get(1)?,
        password: row.get(2)?,
    })
}

fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        alias: row.get(0)?,
        name: row.get(1)?,
        owner: row.get(2)?,
        users: json_column(row, 3)?,
    })
}

fn app_from_row(row: &Row<'_>) -> rusqlite::Result<App> {
    Ok(App {
        client_id: row.get(0)?,
        client_secret: row.get(1)?,
        name: row.get(2)?,
        owner: row.get(3)?,
        team: row.get(4)?,
        redirect_uris: json_column(row, 5)?,
    })
}

fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        subdomain: row.get(0)?,
        endpoint: row.get(1)?,
        team: row.get(2)?,
        owner: row.get(3)?,
        transformers: json_column(row, 4)?,
    })
}

fn plugin_from_row(row: &Row<'_>) -> rusqlite::Result<Plugin> {
    Ok(Plugin {
        name: row.get(0)?,
        service: row.get(1)?,
        config: json_column(row, 2)?,
    })
}

fn hook_from_row(row: &Row<'_>) -> rusqlite::Result<Hook> {
    Ok(Hook {
        team: TeamSelector::from(row.get::<_, String>(0)?),
        name: row.get(1)?,
        events: json_column(row, 2)?,
        config: HookConfig {
            address: row.get(3)?,
        },
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        access_token: row.get(0)?,
        expires: row.get(1)?,
        token_type: row.get(2)?,
        user: User {
            email: row.get(3)?,
            name: row.get(4)?,
            password: String::new(),
        },
        client_id: row.get(5)?,
        created_at: datetime_column(row, 6)?,
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn upsert_user(&self, user: &User) -> Result<()> {
        user.validate()?;
        self.conn().execute(
            "INSERT INTO users (email, name, password) VALUES (?1, ?2, ?3)
             ON CONFLICT (email) DO UPDATE SET
                name = excluded.name,
                password = excluded.password",
            params![user.email, user.name, user.password],
        )?;
        Ok(())
    }

    fn delete_user(&self, user: &User) -> Result<()> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE email = ?1", params![user.email])?;
        expect_removed(rows)
    }

    fn find_user_by_email(&self, email: &str) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT email, name, password FROM users WHERE email = ?1",
                params![email],
                user_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)
    }

    // Team operations

    fn upsert_team(&self, team: &Team) -> Result<()> {
        team.validate()?;
        let members = serde_json::to_string(&team.users)?;
        self.conn().execute(
            "INSERT INTO teams (alias, name, owner, members) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (alias) DO UPDATE SET
                name = excluded.name,
                owner = excluded.owner,
                members = excluded.members",
            params![team.alias, team.name, team.owner, members],
        )?;
        Ok(())
    }

    fn delete_team_by_alias(&self, alias: &str) -> Result<()> {
        let rows = self
            .conn()
            .execute("DELETE FROM teams WHERE alias = ?1", params![alias])?;
        expect_removed(rows)
    }

    fn find_team_by_alias(&self, alias: &str) -> Result<Team> {
        self.conn()
            .query_row(
                "SELECT alias, name, owner, members FROM teams WHERE alias = ?1",
                params![alias],
                team_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)
    }

    fn find_teams_by_owner(&self, email: &str) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT alias, name, owner, members FROM teams WHERE owner = ?1 ORDER BY alias",
        )?;

        let rows = stmt.query_map(params![email], team_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Service operations

    fn upsert_service(&self, service: &Service) -> Result<()> {
        service.validate()?;
        let transformers = serde_json::to_string(&service.transformers)?;
        self.conn().execute(
            "INSERT INTO services (subdomain, endpoint, team, owner, transformers)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (subdomain) DO UPDATE SET
                endpoint = excluded.endpoint,
                team = excluded.team,
                owner = excluded.owner,
                transformers = excluded.transformers",
            params![
                service.subdomain,
                service.endpoint,
                service.team,
                service.owner,
                transformers,
            ],
        )?;
        Ok(())
    }

    fn delete_service(&self, service: &Service) -> Result<()> {
        let rows = self.conn().execute(
            "DELETE FROM services WHERE subdomain = ?1",
            params![service.subdomain],
        )?;
        expect_removed(rows)
    }

    fn find_service_by_subdomain(&self, subdomain: &str) -> Result<Service> {
        self.conn()
            .query_row(
                "SELECT subdomain, endpoint, team, owner, transformers
                 FROM services WHERE subdomain = ?1",
                params![subdomain],
                service_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)
    }

    fn find_services_by_team(&self, alias: &str) -> Result<Vec<Service>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT subdomain, endpoint, team, owner, transformers
             FROM services WHERE team = ?1 ORDER BY subdomain",
        )?;

        let rows = stmt.query_map(params![alias], service_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn find_services_by_user(&self, email: &str) -> Result<Vec<Service>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.subdomain, s.endpoint, s.team, s.owner, s.transformers
             FROM services s
             JOIN teams t ON t.alias = s.team
             WHERE t.owner = ?1
             ORDER BY s.subdomain",
        )?;

        let rows = stmt.query_map(params![email], service_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // App operations

    fn upsert_app(&self, app: &App) -> Result<()> {
        app.validate()?;
        let redirect_uris = serde_json::to_string(&app.redirect_uris)?;
        self.conn().execute(
            "INSERT INTO apps (client_id, client_secret, name, owner, team, redirect_uris)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (client_id) DO UPDATE SET
                client_secret = excluded.client_secret,
                name = excluded.name,
                owner = excluded.owner,
                team = excluded.team,
                redirect_uris = excluded.redirect_uris",
            params![
                app.client_id,
                app.client_secret,
                app.name,
                app.owner,
                app.team,
                redirect_uris,
            ],
        )?;
        Ok(())
    }

    fn delete_app(&self, app: &App) -> Result<()> {
        let rows = self
            .conn()
            .execute("DELETE FROM apps WHERE client_id = ?1", params![app.client_id])?;
        expect_removed(rows)
    }

    fn find_app_by_client_id(&self, client_id: &str) -> Result<App> {
        self.conn()
            .query_row(
                "SELECT client_id, client_secret, name, owner, team, redirect_uris
                 FROM apps WHERE client_id = ?1",
                params![client_id],
                app_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)
    }

    fn find_apps_by_team(&self, alias: &str) -> Result<Vec<App>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT client_id, client_secret, name, owner, team, redirect_uris
             FROM apps WHERE team = ?1 ORDER BY client_id",
        )?;

        let rows = stmt.query_map(params![alias], app_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Plugin operations

    fn upsert_plugin(&self, plugin: &Plugin) -> Result<()> {
        plugin.validate()?;
        let config = serde_json::to_string(&plugin.config)?;
        self.conn().execute(
            "INSERT INTO plugins (name, service, config) VALUES (?1, ?2, ?3)
             ON CONFLICT (name, service) DO UPDATE SET config = excluded.config",
            params![plugin.name, plugin.service, config],
        )?;
        Ok(())
    }

    fn delete_plugin(&self, plugin: &Plugin) -> Result<()> {
        let rows = self.conn().execute(
            "DELETE FROM plugins WHERE name = ?1 AND service = ?2",
            params![plugin.name, plugin.service],
        )?;
        expect_removed(rows)
    }

    fn delete_plugins_by_service(&self, subdomain: &str) -> Result<()> {
        let rows = self
            .conn()
            .execute("DELETE FROM plugins WHERE service = ?1", params![subdomain])?;
        expect_removed(rows)
    }

    fn find_plugin_by_name_and_service(&self, name: &str, subdomain: &str) -> Result<Plugin> {
        self.conn()
            .query_row(
                "SELECT name, service, config FROM plugins WHERE name = ?1 AND service = ?2",
                params![name, subdomain],
                plugin_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)
    }

    fn find_plugins_by_service(&self, subdomain: &str) -> Result<Vec<Plugin>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT name, service, config FROM plugins WHERE service = ?1 ORDER BY name",
        )?;

        let rows = stmt.query_map(params![subdomain], plugin_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Hook operations

    fn upsert_hook(&self, hook: &Hook) -> Result<()> {
        hook.validate()?;
        let events = serde_json::to_string(&hook.events)?;
        let team = hook.team.as_str();

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO hooks (team, name, events, address) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (team, name) DO UPDATE SET
                events = excluded.events,
                address = excluded.address",
            params![team, hook.name, events, hook.config.address],
        )?;

        tx.execute(
            "DELETE FROM hook_events WHERE team = ?1 AND name = ?2",
            params![team, hook.name],
        )?;

        for event in &hook.events {
            tx.execute(
                "INSERT OR IGNORE INTO hook_events (team, name, event) VALUES (?1, ?2, ?3)",
                params![team, hook.name, event],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_hook(&self, hook: &Hook) -> Result<()> {
        if hook.team.is_reserved_alias() {
            return Err(Error::NotFound);
        }
        let rows = self.conn().execute(
            "DELETE FROM hooks WHERE team = ?1 AND name = ?2",
            params![hook.team.as_str(), hook.name],
        )?;
        expect_removed(rows)
    }

    fn delete_hooks_by_team(&self, alias: &str) -> Result<()> {
        if alias == ALL_TEAMS {
            return Err(Error::NotFound);
        }
        let rows = self
            .conn()
            .execute("DELETE FROM hooks WHERE team = ?1", params![alias])?;
        expect_removed(rows)
    }

    fn find_hooks_by_event_and_team(&self, event: &str, team: &TeamSelector) -> Result<Vec<Hook>> {
        if team.is_reserved_alias() {
            return Ok(Vec::new());
        }
        let scope = match team {
            TeamSelector::AllTeams => None,
            TeamSelector::Team(alias) => Some(alias.as_str()),
        };

        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT h.team, h.name, h.events, h.address
             FROM hooks h
             JOIN hook_events e ON e.team = h.team AND e.name = h.name
             WHERE e.event = ?1 AND (?2 IS NULL OR h.team = ?2)
             ORDER BY h.name, h.team",
        )?;

        let rows = stmt.query_map(params![event, scope], hook_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        token.validate()?;
        let expires_at = token
            .expires_at()
            .ok_or_else(|| Error::InvalidInput("token time to live is out of range".to_string()))?;

        let result = self.conn().execute(
            "INSERT INTO tokens (access_token, expires, token_type, user_email, user_name, client_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                token.access_token,
                token.expires,
                token.token_type,
                token.user.email,
                token.user.name,
                token.client_id,
                format_datetime(&token.created_at),
                expires_at.timestamp_millis(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::Conflict("access token already exists".to_string()))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn delete_token(&self, access_token: &str) -> Result<()> {
        let rows = self.conn().execute(
            "DELETE FROM tokens WHERE access_token = ?1",
            params![access_token],
        )?;
        expect_removed(rows)
    }

    fn find_token(&self, access_token: &str) -> Result<Token> {
        let token = self
            .conn()
            .query_row(
                "SELECT access_token, expires, token_type, user_email, user_name, client_id, created_at
                 FROM tokens WHERE access_token = ?1",
                params![access_token],
                token_from_row,
            )
            .optional()?
            .ok_or(Error::NotFound)?;

        if token.is_expired_at(Utc::now()) {
            return Err(Error::Expired);
        }

        Ok(token)
    }

    fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM tokens WHERE expires_at < ?1",
            params![now.timestamp_millis()],
        )?;
        Ok(rows)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(temp: &TempDir) -> SqliteStore {
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        store
    }

    fn count_hook_events(store: &SqliteStore, team: &str, name: &str) -> i64 {
        store
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM hook_events WHERE team = ?1 AND name = ?2",
                params![team, name],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[test]
    fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "users",
            "teams",
            "apps",
            "services",
            "plugins",
            "hooks",
            "hook_events",
            "tokens",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);
        store.initialize().unwrap();
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let team = Team {
            name: "ApiHub Team".to_string(),
            alias: "apihub".to_string(),
            owner: "alice@example.org".to_string(),
            users: vec!["alice@example.org".to_string()],
        };

        {
            let store = open(&temp);
            store.upsert_team(&team).unwrap();
        }

        let store = open(&temp);
        assert_eq!(store.find_team_by_alias("apihub").unwrap(), team);
    }

    #[test]
    fn test_hook_event_index_follows_upsert_and_delete() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        let mut hook = Hook {
            name: "notify".to_string(),
            team: TeamSelector::team("apihub"),
            events: vec![
                "service.create".to_string(),
                "service.create".to_string(),
                "service.update".to_string(),
            ],
            config: HookConfig {
                address: "http://www.example.org".to_string(),
            },
        };
        store.upsert_hook(&hook).unwrap();
        assert_eq!(count_hook_events(&store, "apihub", "notify"), 2);

        hook.events = vec!["app.create".to_string()];
        store.upsert_hook(&hook).unwrap();
        assert_eq!(count_hook_events(&store, "apihub", "notify"), 1);
        assert!(
            store
                .find_hooks_by_event("service.create")
                .unwrap()
                .is_empty()
        );

        store.delete_hook(&hook).unwrap();
        assert_eq!(count_hook_events(&store, "apihub", "notify"), 0);
    }

    #[test]
    fn test_token_conflict() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        let token = Token {
            access_token: "secret-token".to_string(),
            expires: 10,
            token_type: "Token".to_string(),
            user: User {
                name: "Alice".to_string(),
                email: "alice@example.org".to_string(),
                password: String::new(),
            },
            client_id: None,
            created_at: Utc::now(),
        };
        store.create_token(&token).unwrap();

        let result = store.create_token(&token);
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_token_never_persists_password() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        let token = Token {
            access_token: "secret-token".to_string(),
            expires: 60,
            token_type: "Token".to_string(),
            user: User {
                name: "Alice".to_string(),
                email: "alice@example.org".to_string(),
                password: "hashed".to_string(),
            },
            client_id: Some("ios".to_string()),
            created_at: Utc::now(),
        };
        store.create_token(&token).unwrap();

        let user = store.decode_token("secret-token").unwrap();
        assert_eq!(user.email, "alice@example.org");
        assert_eq!(user.password, "");
    }

    #[test]
    fn test_corrupt_token_timestamp_fails_closed() {
        let temp = TempDir::new().unwrap();
        let store = open(&temp);

        let token = Token {
            access_token: "secret-token".to_string(),
            expires: 60,
            token_type: "Token".to_string(),
            user: User {
                name: "Alice".to_string(),
                email: "alice@example.org".to_string(),
                password: String::new(),
            },
            client_id: None,
            created_at: Utc::now(),
        };
        store.create_token(&token).unwrap();
        store
            .conn()
            .execute(
                "UPDATE tokens SET created_at = 'not-a-timestamp' WHERE access_token = ?1",
                params!["secret-token"],
            )
            .unwrap();

        assert!(matches!(
            store.find_token("secret-token"),
            Err(Error::Database(_))
        ));
        assert!(matches!(
            store.decode_token("secret-token"),
            Err(Error::Database(_))
        ));
    }
}
