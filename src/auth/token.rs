use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::types::{Token, User};

const TOKEN_PREFIX: &str = "apihub";
const SECRET_BYTES: usize = 32;

/// Type tag carried by tokens issued at login.
pub const TOKEN_TYPE: &str = "Token";

#[derive(Debug, Default, Clone, Copy)]
pub struct TokenGenerator;

impl TokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Generates a new access token with the format: apihub_<secret>
    #[must_use]
    pub fn generate(&self) -> String {
        let mut bytes = [0u8; SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        format!("{TOKEN_PREFIX}_{}", URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Builds a fresh token bound to `user`. The password credential is
    /// stripped from the bound user.
    #[must_use]
    pub fn issue(&self, user: &User, ttl_seconds: i64, client_id: Option<String>) -> Token {
        Token {
            access_token: self.generate(),
            expires: ttl_seconds,
            token_type: TOKEN_TYPE.to_string(),
            user: user.without_password(),
            client_id,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation_format() {
        let token = TokenGenerator::new().generate();

        let (prefix, secret) = token.split_once('_').unwrap();
        assert_eq!(prefix, "apihub");
        assert_eq!(secret.len(), 43);
        assert!(
            secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_tokens_are_unique() {
        let generator = TokenGenerator::new();
        assert_ne!(generator.generate(), generator.generate());
    }

    #[test]
    fn test_issue_strips_password() {
        let user = User {
            name: "Alice".to_string(),
            email: "alice@example.org".to_string(),
            password: "hash".to_string(),
        };

        let token = TokenGenerator::new().issue(&user, 60, Some("ios".to_string()));
        assert_eq!(token.user.password, "");
        assert_eq!(token.expires, 60);
        assert_eq!(token.token_type, TOKEN_TYPE);
        assert_eq!(token.client_id.as_deref(), Some("ios"));
    }
}
