use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{HookConfig, PluginConfig, Token};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub email: String,
    pub password: String,
    pub new_password: String,
    pub confirmation_password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            access_token: token.access_token,
            token_type: token.token_type,
            expires: token.expires,
            created_at: token.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    pub alias: String,
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub subdomain: String,
    pub endpoint: String,
    pub team: String,
    #[serde(default)]
    pub transformers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub transformers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAppRequest {
    pub name: String,
    pub team: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub redirect_uris: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct PluginRequest {
    pub name: String,
    #[serde(default)]
    pub config: PluginConfig,
}

#[derive(Debug, Deserialize)]
pub struct HookRequest {
    pub name: String,
    pub events: Vec<String>,
    pub config: HookConfig,
}

#[derive(Debug, Deserialize)]
pub struct HooksQuery {
    pub event: String,
    pub team: String,
    /// Also return hooks subscribed to every team.
    #[serde(default)]
    pub include_global: bool,
}
