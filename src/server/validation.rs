use crate::server::response::ApiError;

const MAX_ALIAS_LEN: usize = 64;
/// A DNS label is at most 63 octets.
const MAX_SUBDOMAIN_LEN: usize = 63;

fn is_valid_slug_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

fn validate_slug(value: &str, entity: &str, max_len: usize) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{entity} cannot be empty"));
    }
    if value.len() > max_len {
        return Err(format!("{entity} cannot exceed {max_len} characters"));
    }
    if !value.chars().all(is_valid_slug_char) {
        return Err(format!(
            "{entity} can only contain lowercase letters, digits, and hyphens"
        ));
    }
    if value.starts_with('-') || value.ends_with('-') {
        return Err(format!("{entity} cannot start or end with a hyphen"));
    }
    Ok(())
}

pub fn validate_team_alias(alias: &str) -> Result<(), ApiError> {
    validate_slug(alias, "Team alias", MAX_ALIAS_LEN).map_err(ApiError::bad_request)
}

pub fn validate_subdomain(subdomain: &str) -> Result<(), ApiError> {
    validate_slug(subdomain, "Subdomain", MAX_SUBDOMAIN_LEN).map_err(ApiError::bad_request)
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ApiError::bad_request("Invalid email address")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugs() {
        assert!(validate_team_alias("apihub").is_ok());
        assert!(validate_team_alias("api-hub-2").is_ok());
        assert!(validate_team_alias("").is_err());
        assert!(validate_team_alias("ApiHub").is_err());
        assert!(validate_team_alias("-apihub").is_err());
        assert!(validate_subdomain("billing_v2").is_err());
        assert!(validate_subdomain(&"a".repeat(64)).is_err());
        assert!(validate_subdomain(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn test_emails() {
        assert!(validate_email("alice@example.org").is_ok());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("@example.org").is_err());
    }
}
