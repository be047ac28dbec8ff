use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{ALL_TEAMS, TeamSelector};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    /// Opaque password credential. Never serialized into responses.
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl User {
    /// Returns a copy safe to hand out: the password credential is cleared.
    #[must_use]
    pub fn without_password(&self) -> User {
        User {
            name: self.name.clone(),
            email: self.email.clone(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub alias: String,
    pub owner: String,
    #[serde(default)]
    pub users: Vec<String>,
}

impl Team {
    #[must_use]
    pub fn has_member(&self, email: &str) -> bool {
        self.owner == email || self.users.iter().any(|u| u == email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub client_id: String,
    pub client_secret: String,
    pub name: String,
    pub owner: String,
    pub team: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub subdomain: String,
    pub endpoint: String,
    pub team: String,
    pub owner: String,
    #[serde(default)]
    pub transformers: Vec<String>,
}

pub type PluginConfig = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    pub service: String,
    #[serde(default)]
    pub config: PluginConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookConfig {
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    pub name: String,
    pub team: TeamSelector,
    #[serde(default)]
    pub events: Vec<String>,
    pub config: HookConfig,
}

impl Hook {
    #[must_use]
    pub fn listens_to(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    /// Time to live, in seconds, counted from `created_at`.
    pub expires: i64,
    pub token_type: String,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// Instant after which the token is no longer usable, or None when the
    /// time to live does not fit in a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        expiry_after(self.created_at, self.expires)
    }

    /// Tokens whose expiry cannot be represented count as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_none_or(|expires_at| now > expires_at)
    }
}

/// `start + ttl_seconds`, or None on overflow.
#[must_use]
pub fn expiry_after(start: DateTime<Utc>, ttl_seconds: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_seconds(ttl_seconds).and_then(|ttl| start.checked_add_signed(ttl))
}

fn require_key(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{what} cannot be empty")));
    }
    Ok(())
}

/// Team aliases are concrete; the wildcard is only valid as a hook scope.
fn require_team_alias(value: &str, what: &str) -> Result<()> {
    require_key(value, what)?;
    if value == ALL_TEAMS {
        return Err(Error::InvalidInput(format!(
            "{what} cannot be the reserved value '{ALL_TEAMS}'"
        )));
    }
    Ok(())
}

/// Identity checks applied by every backend before a write.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

impl Validate for User {
    fn validate(&self) -> Result<()> {
        require_key(&self.email, "user email")
    }
}

impl Validate for Team {
    fn validate(&self) -> Result<()> {
        require_team_alias(&self.alias, "team alias")?;
        require_key(&self.owner, "team owner")
    }
}

impl Validate for App {
    fn validate(&self) -> Result<()> {
        require_key(&self.client_id, "client id")?;
        require_team_alias(&self.team, "app team")
    }
}

impl Validate for Service {
    fn validate(&self) -> Result<()> {
        require_key(&self.subdomain, "service subdomain")?;
        require_team_alias(&self.team, "service team")
    }
}

impl Validate for Plugin {
    fn validate(&self) -> Result<()> {
        require_key(&self.name, "plugin name")?;
        require_key(&self.service, "plugin service")
    }
}

impl Validate for Hook {
    fn validate(&self) -> Result<()> {
        require_key(&self.name, "hook name")?;
        if let TeamSelector::Team(alias) = &self.team {
            require_team_alias(alias, "hook team")?;
        }
        Ok(())
    }
}

impl Validate for Token {
    fn validate(&self) -> Result<()> {
        require_key(&self.access_token, "access token")?;
        require_key(&self.user.email, "token user")?;
        if self.expires <= 0 {
            return Err(Error::InvalidInput(
                "token time to live must be positive".to_string(),
            ));
        }
        if self.expires_at().is_none() {
            return Err(Error::InvalidInput(
                "token time to live is out of range".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry_boundary() {
        let created_at = Utc::now();
        let token = Token {
            access_token: "abc".to_string(),
            expires: 10,
            token_type: "Token".to_string(),
            user: User::default(),
            client_id: None,
            created_at,
        };

        assert!(!token.is_expired_at(created_at + TimeDelta::seconds(10)));
        assert!(token.is_expired_at(created_at + TimeDelta::seconds(11)));
    }

    #[test]
    fn test_unrepresentable_ttl_is_invalid() {
        for expires in [i64::MAX, 10_000_000_000_000] {
            let token = Token {
                access_token: "abc".to_string(),
                expires,
                token_type: "Token".to_string(),
                user: User {
                    email: "alice@example.org".to_string(),
                    ..User::default()
                },
                client_id: None,
                created_at: Utc::now(),
            };

            assert_eq!(token.expires_at(), None);
            assert!(token.is_expired_at(Utc::now()));
            assert!(matches!(token.validate(), Err(Error::InvalidInput(_))));
        }
    }

    #[test]
    fn test_wildcard_is_not_a_team_alias() {
        let team = Team {
            name: "Everyone".to_string(),
            alias: ALL_TEAMS.to_string(),
            owner: "alice@example.org".to_string(),
            users: vec![],
        };
        assert!(matches!(team.validate(), Err(Error::InvalidInput(_))));

        let hook = Hook {
            name: "notify".to_string(),
            team: TeamSelector::Team(ALL_TEAMS.to_string()),
            events: vec![],
            config: HookConfig {
                address: "http://example.org".to_string(),
            },
        };
        assert!(matches!(hook.validate(), Err(Error::InvalidInput(_))));

        let global = Hook {
            team: TeamSelector::AllTeams,
            ..hook
        };
        assert!(global.validate().is_ok());
    }

    #[test]
    fn test_hook_without_team_alias_is_invalid() {
        let hook = Hook {
            name: "notify".to_string(),
            team: TeamSelector::Team(String::new()),
            events: vec![],
            config: HookConfig {
                address: "http://example.org".to_string(),
            },
        };

        assert!(matches!(hook.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_password_is_not_serialized() {
        let user = User {
            name: "Alice".to_string(),
            email: "alice@example.org".to_string(),
            password: "secret".to_string(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(user.without_password().password, "");
    }
}
