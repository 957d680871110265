use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use common_auth::{AuthContext, Claims, IssuedToken};
use common_http_errors::{ApiError, ApiResult};
use common_security::{ensure_access, AccessRule};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::passwords::{hash_password, verify_password};
use crate::store::StoreError;
use crate::AppState;

const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    fn into_parts(self) -> ApiResult<(String, String)> {
        let username = self
            .username
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let password = self.password.filter(|value| !value.trim().is_empty());

        match (username, password) {
            (Some(username), Some(password)) => Ok((username, password)),
            _ => Err(ApiError::bad_request_msg(
                "MISSING_FIELD",
                "username and password are required",
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub username: String,
    #[serde(flatten)]
    pub token: IssuedToken,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: IssuedToken,
    pub user: UserSummary,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub username: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PasswordResetResponse {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub claims: Claims,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let (username, password) = body.into_parts().map_err(|err| {
        state.metrics.registration("invalid");
        err
    })?;

    let password_hash = hash_password(&password).await?;
    let user = match state.users.create_user(&username, &password_hash).await {
        Ok(user) => user,
        Err(err @ StoreError::UsernameTaken(_)) => {
            state.metrics.registration("conflict");
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    let role = state.roles.effective_role(user.id).await?;
    let token = state
        .issuer
        .issue(user.id, Some(&user.username), Some(role.as_str()))
        .map_err(|err| ApiError::internal(err, None))?;

    state.metrics.registration("created");
    state.metrics.token_issued("register");
    info!(user_id = user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            username: user.username,
            token,
        }),
    ))
}

pub async fn login_user(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> ApiResult<Json<LoginResponse>> {
    let (username, password) = body.into_parts()?;

    let user = state.users.find_by_username(&username).await?;
    let password_valid =
        verify_password(&password, user.as_ref().map(|u| u.password_hash.as_str())).await?;

    let Some(user) = user else {
        state.metrics.login_attempt("unknown_user");
        warn!(username = %username, "login for unknown user");
        return Err(invalid_credentials());
    };

    if !password_valid {
        state.metrics.login_attempt("bad_password");
        warn!(user_id = user.id, "login with wrong password");
        return Err(invalid_credentials());
    }

    let role = state.roles.effective_role(user.id).await?;
    let token = state
        .issuer
        .issue(user.id, Some(&user.username), Some(role.as_str()))
        .map_err(|err| ApiError::internal(err, None))?;

    state.metrics.login_attempt("success");
    state.metrics.token_issued("login");
    info!(user_id = user.id, role = %role, "login succeeded");

    Ok(Json(LoginResponse {
        token,
        user: UserSummary {
            id: user.id,
            username: user.username,
            role: role.as_str().to_string(),
        },
    }))
}

/// Echo the verified claims back to the caller.
pub async fn me(auth: AuthContext) -> Json<MeResponse> {
    let claims = auth.into_claims();
    Json(MeResponse {
        issued_at: claims.issued_at_utc(),
        expires_at: claims.expires_at_utc(),
        claims,
    })
}

/// Replace a user's password. Callers may reset their own password; admins
/// may reset anyone's.
pub async fn reset_password(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<PasswordResetRequest>,
) -> ApiResult<Json<PasswordResetResponse>> {
    let username = body
        .username
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let new_password = body
        .new_password
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let (Some(username), Some(new_password)) = (username, new_password) else {
        return Err(ApiError::bad_request_msg(
            "MISSING_FIELD",
            "username and new_password are required",
        ));
    };
    if new_password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::bad_request_msg(
            "PASSWORD_TOO_SHORT",
            format!("Password must be at least {MIN_PASSWORD_CHARS} characters long"),
        ));
    }

    // An unknown account has no owner, so only admins learn that it is missing.
    let user = state.users.find_by_username(&username).await?;
    ensure_access(&auth, AccessRule::Owner, user.as_ref().map(|u| u.id))?;
    let Some(user) = user else {
        return Err(ApiError::not_found("USER_NOT_FOUND"));
    };

    let password_hash = hash_password(&new_password).await?;
    if !state.users.update_password(&user.username, &password_hash).await? {
        return Err(ApiError::not_found("USER_NOT_FOUND"));
    }

    info!(actor = auth.user_id(), user_id = user.id, "password reset");
    Ok(Json(PasswordResetResponse {
        user_id: user.id,
        username: user.username,
    }))
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("INVALID_CREDENTIALS", "Invalid username or password")
}
