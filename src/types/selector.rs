use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved team value meaning "every team".
pub const ALL_TEAMS: &str = "*";

/// Team scope of a hook, and the team filter of a hook query.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TeamSelector {
    Team(String),
    AllTeams,
}

impl TeamSelector {
    pub fn team(alias: impl Into<String>) -> Self {
        TeamSelector::Team(alias.into())
    }

    #[must_use]
    pub fn is_all_teams(&self) -> bool {
        matches!(self, TeamSelector::AllTeams)
    }

    /// A concrete selector carrying the reserved wildcard value. It names no
    /// team and matches nothing.
    #[must_use]
    pub fn is_reserved_alias(&self) -> bool {
        matches!(self, TeamSelector::Team(alias) if alias == ALL_TEAMS)
    }

    /// Whether a hook scoped to `hook_team` is matched by this selector.
    /// A concrete selector only admits the identical scope; global hooks are
    /// not folded into single-team queries.
    #[must_use]
    pub fn admits(&self, hook_team: &TeamSelector) -> bool {
        match self {
            TeamSelector::AllTeams => true,
            TeamSelector::Team(_) => self == hook_team,
        }
    }

    /// Value persisted in the `team` column of the hooks tables.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            TeamSelector::Team(alias) => alias,
            TeamSelector::AllTeams => ALL_TEAMS,
        }
    }
}

impl From<String> for TeamSelector {
    fn from(value: String) -> Self {
        if value == ALL_TEAMS {
            TeamSelector::AllTeams
        } else {
            TeamSelector::Team(value)
        }
    }
}

impl From<&str> for TeamSelector {
    fn from(value: &str) -> Self {
        TeamSelector::from(value.to_string())
    }
}

impl From<TeamSelector> for String {
    fn from(value: TeamSelector) -> Self {
        match value {
            TeamSelector::Team(alias) => alias,
            TeamSelector::AllTeams => ALL_TEAMS.to_string(),
        }
    }
}

impl fmt::Display for TeamSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_admits_every_scope() {
        assert!(TeamSelector::AllTeams.admits(&TeamSelector::team("apihub")));
        assert!(TeamSelector::AllTeams.admits(&TeamSelector::AllTeams));
    }

    #[test]
    fn test_team_admits_only_itself() {
        let selector = TeamSelector::team("apihub");
        assert!(selector.admits(&TeamSelector::team("apihub")));
        assert!(!selector.admits(&TeamSelector::team("other-team")));
        assert!(!selector.admits(&TeamSelector::AllTeams));
    }

    #[test]
    fn test_serde_uses_reserved_value() {
        let json = serde_json::to_string(&TeamSelector::AllTeams).unwrap();
        assert_eq!(json, "\"*\"");

        let parsed: TeamSelector = serde_json::from_str("\"apihub\"").unwrap();
        assert_eq!(parsed, TeamSelector::team("apihub"));
    }
}
