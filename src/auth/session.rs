use super::{PasswordHasher, TokenGenerator};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Token, User};

const MAX_TOKEN_RETRIES: u32 = 3;

/// Registers a new user, storing a hash of the given password.
/// Returns the stored user with the credential cleared.
pub fn signup(store: &dyn Store, user: &User) -> Result<User> {
    if user.password.is_empty() {
        return Err(Error::InvalidInput("password cannot be empty".to_string()));
    }

    match store.find_user_by_email(&user.email) {
        Ok(_) => return Err(Error::Conflict("user already exists".to_string())),
        Err(Error::NotFound) => {}
        Err(e) => return Err(e),
    }

    let stored = User {
        name: user.name.clone(),
        email: user.email.clone(),
        password: PasswordHasher::new().hash(&user.password)?,
    };
    store.upsert_user(&stored)?;

    tracing::info!(email = %stored.email, "user signed up");
    Ok(stored.without_password())
}

/// Checks an email/password pair. Unknown users and wrong passwords are
/// both reported as `Unauthorized`.
pub fn authenticate(store: &dyn Store, email: &str, password: &str) -> Result<User> {
    let user = match store.find_user_by_email(email) {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::Unauthorized),
        Err(e) => return Err(e),
    };

    if !PasswordHasher::new().verify(password, &user.password)? {
        return Err(Error::Unauthorized);
    }

    Ok(user)
}

/// Authenticates the user and issues a token living `ttl_seconds`.
pub fn login(
    store: &dyn Store,
    email: &str,
    password: &str,
    ttl_seconds: i64,
    client_id: Option<String>,
) -> Result<Token> {
    let user = authenticate(store, email, password)?;
    let generator = TokenGenerator::new();

    for _ in 0..MAX_TOKEN_RETRIES {
        let token = generator.issue(&user, ttl_seconds, client_id.clone());
        match store.create_token(&token) {
            Ok(()) => {
                tracing::info!(email = %user.email, "user logged in");
                return Ok(token);
            }
            Err(Error::Conflict(_)) => {
                tracing::warn!("access token collision, regenerating");
                continue;
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::Conflict(
        "failed to issue a unique access token".to_string(),
    ))
}

/// Revokes a token. Returns false when it was already gone, which is not an
/// error for a logout.
pub fn logout(store: &dyn Store, access_token: &str) -> Result<bool> {
    match store.delete_token(access_token) {
        Ok(()) => Ok(true),
        Err(Error::NotFound) => {
            tracing::debug!("logout of unknown or revoked token");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

pub fn change_password(
    store: &dyn Store,
    email: &str,
    current: &str,
    new_password: &str,
    confirmation: &str,
) -> Result<()> {
    if new_password.is_empty() || new_password != confirmation {
        return Err(Error::InvalidInput(
            "new password and confirmation must match".to_string(),
        ));
    }

    let mut user = authenticate(store, email, current)?;
    user.password = PasswordHasher::new().hash(new_password)?;
    store.upsert_user(&user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn alice() -> User {
        User {
            name: "Alice".to_string(),
            email: "alice@example.org".to_string(),
            password: "123456".to_string(),
        }
    }

    #[test]
    fn test_signup_hashes_password() {
        let store = MemoryStore::new();
        let created = signup(&store, &alice()).unwrap();
        assert_eq!(created.password, "");

        let stored = store.find_user_by_email("alice@example.org").unwrap();
        assert!(stored.password.starts_with("$argon2id$"));
    }

    #[test]
    fn test_signup_twice_conflicts() {
        let store = MemoryStore::new();
        signup(&store, &alice()).unwrap();
        assert!(matches!(signup(&store, &alice()), Err(Error::Conflict(_))));
    }

    #[test]
    fn test_login_then_decode() {
        let store = MemoryStore::new();
        signup(&store, &alice()).unwrap();

        let token = login(&store, "alice@example.org", "123456", 60, None).unwrap();
        let user = store.decode_token(&token.access_token).unwrap();
        assert_eq!(user.email, "alice@example.org");
        assert_eq!(user.password, "");
    }

    #[test]
    fn test_login_rejects_bad_credentials() {
        let store = MemoryStore::new();
        signup(&store, &alice()).unwrap();

        assert!(matches!(
            login(&store, "alice@example.org", "wrong", 60, None),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            login(&store, "bob@example.org", "123456", 60, None),
            Err(Error::Unauthorized)
        ));
    }

    #[test]
    fn test_logout_twice() {
        let store = MemoryStore::new();
        signup(&store, &alice()).unwrap();
        let token = login(&store, "alice@example.org", "123456", 60, None).unwrap();

        assert!(logout(&store, &token.access_token).unwrap());
        assert!(!logout(&store, &token.access_token).unwrap());
        assert!(matches!(
            store.decode_token(&token.access_token),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_change_password() {
        let store = MemoryStore::new();
        signup(&store, &alice()).unwrap();

        assert!(matches!(
            change_password(&store, "alice@example.org", "123456", "abc", "abd"),
            Err(Error::InvalidInput(_))
        ));

        change_password(&store, "alice@example.org", "123456", "abcdef", "abcdef").unwrap();
        assert!(authenticate(&store, "alice@example.org", "abcdef").is_ok());
        assert!(matches!(
            authenticate(&store, "alice@example.org", "123456"),
            Err(Error::Unauthorized)
        ));
    }
}
