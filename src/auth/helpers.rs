use crate::error::Error;
use crate::store::Store;
use crate::types::User;

#[derive(Debug)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

/// Identity resolved from a bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub client_id: Option<String>,
    pub access_token: String,
}

/// Extracts token from Authorization header (Bearer or Token scheme).
/// Returns None if no auth header is present.
/// Returns Some(token_string) if auth header is present and valid format.
/// Returns Err if the auth scheme is unsupported.
pub fn extract_token_from_header(
    auth_header: Option<&str>,
) -> Result<Option<String>, TokenValidationError> {
    let Some(header) = auth_header.map(str::trim_start) else {
        return Ok(None);
    };

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("Token "))
        .ok_or(TokenValidationError::InvalidScheme)?
        .trim();

    if token.is_empty() {
        return Err(TokenValidationError::InvalidToken);
    }

    Ok(Some(token.to_string()))
}

/// Validates a raw access token against the store.
pub fn validate_token(
    store: &dyn Store,
    raw_token: &str,
) -> Result<Authenticated, TokenValidationError> {
    let token = store.find_token(raw_token).map_err(|e| match e {
        Error::NotFound => TokenValidationError::InvalidToken,
        Error::Expired => TokenValidationError::TokenExpired,
        e => {
            tracing::error!("Failed to look up token: {e}");
            TokenValidationError::InternalError
        }
    })?;

    Ok(Authenticated {
        user: token.user.without_password(),
        client_id: token.client_id,
        access_token: token.access_token,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::store::MemoryStore;
    use crate::types::Token;

    fn token(access_token: &str, created_at: chrono::DateTime<Utc>) -> Token {
        Token {
            access_token: access_token.to_string(),
            expires: 10,
            token_type: "Token".to_string(),
            user: User {
                name: "Alice".to_string(),
                email: "alice@example.org".to_string(),
                password: String::new(),
            },
            client_id: Some("ios".to_string()),
            created_at,
        }
    }

    #[test]
    fn test_extract_bearer_and_token_schemes() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc")).unwrap(),
            Some("abc".to_string())
        );
        assert_eq!(
            extract_token_from_header(Some("Token abc")).unwrap(),
            Some("abc".to_string())
        );
        assert_eq!(extract_token_from_header(None).unwrap(), None);
    }

    #[test]
    fn test_extract_rejects_other_schemes() {
        assert!(matches!(
            extract_token_from_header(Some("Basic abc")),
            Err(TokenValidationError::InvalidScheme)
        ));
        assert!(matches!(
            extract_token_from_header(Some("Bearer   ")),
            Err(TokenValidationError::InvalidToken)
        ));
    }

    #[test]
    fn test_validate_token_outcomes() {
        let store = MemoryStore::new();
        store.create_token(&token("live", Utc::now())).unwrap();
        store
            .create_token(&token("stale", Utc::now() - Duration::seconds(60)))
            .unwrap();

        let auth = validate_token(&store, "live").unwrap();
        assert_eq!(auth.user.email, "alice@example.org");
        assert_eq!(auth.client_id.as_deref(), Some("ios"));

        assert!(matches!(
            validate_token(&store, "stale"),
            Err(TokenValidationError::TokenExpired)
        ));
        assert!(matches!(
            validate_token(&store, "missing"),
            Err(TokenValidationError::InvalidToken)
        ));
    }
}
