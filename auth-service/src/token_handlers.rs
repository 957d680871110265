use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use common_auth::IssuedToken;
use common_http_errors::{ApiError, ApiResult};
use serde::Deserialize;
use tracing::info;

use crate::AppState;

const DEFAULT_USER_ID: i64 = 1;
const DEFAULT_USERNAME: &str = "testuser";
const DEFAULT_EXP_HOURS: i64 = 24;
const MAX_EXP_HOURS: i64 = 720;

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub exp_hours: Option<i64>,
}

/// Mint a role-less token for an arbitrary user. Only routed when the
/// development endpoint is switched on.
pub async fn generate_token(
    State(state): State<AppState>,
    body: Option<Json<TokenRequest>>,
) -> ApiResult<Json<IssuedToken>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let exp_hours = request.exp_hours.unwrap_or(DEFAULT_EXP_HOURS);
    if !(1..=MAX_EXP_HOURS).contains(&exp_hours) {
        return Err(ApiError::bad_request_msg(
            "INVALID_EXP_HOURS",
            format!("exp_hours must be between 1 and {MAX_EXP_HOURS}"),
        ));
    }

    let user_id = request.user_id.unwrap_or(DEFAULT_USER_ID);
    let username = request
        .username
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_USERNAME.to_string());

    let issued = state
        .issuer
        .issue_at(
            user_id,
            Some(&username),
            None,
            Duration::hours(exp_hours),
            Utc::now(),
        )
        .map_err(|err| ApiError::internal(err, None))?;

    state.metrics.token_issued("dev");
    info!(user_id, exp_hours, "issued development token");
    Ok(Json(issued))
}
