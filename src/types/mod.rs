mod models;
mod selector;

pub use models::*;
pub use selector::{ALL_TEAMS, TeamSelector};
