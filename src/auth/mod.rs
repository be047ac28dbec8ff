mod helpers;
mod middleware;
mod password;
pub mod session;
mod token;

pub use helpers::{Authenticated, TokenValidationError, extract_token_from_header, validate_token};
pub use middleware::{AuthError, RequireUser};
pub use password::PasswordHasher;
pub use token::{TOKEN_TYPE, TokenGenerator};
