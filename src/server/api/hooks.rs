use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::HooksQuery;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::TeamSelector;

use super::access::require_team_member;

/// Hooks of one team listening to an event. Global hooks are only included
/// when asked for.
pub async fn resolve_hooks(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<HooksQuery>,
) -> impl IntoResponse {
    let team = require_team_member(state.store.as_ref(), &auth.user, &params.team)?;

    let hooks = if params.include_global {
        state.hooks.subscribers(&params.event, &team.alias)?
    } else {
        state
            .hooks
            .resolve(&params.event, &TeamSelector::team(team.alias))?
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(hooks)))
}
