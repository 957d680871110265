use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use common_auth::{AuthContext, ALLOWED_ROLES};
use common_http_errors::{ApiError, ApiResult};
use common_security::{ensure_access, AccessRule, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::RoleAssignment;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewAssignmentRequest {
    pub user_id: Option<i64>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignmentFilter {
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UserRolesResponse {
    pub user_id: i64,
    pub effective_role: Role,
    pub roles: Vec<RoleAssignment>,
}

pub async fn list_roles() -> Json<Vec<&'static str>> {
    Json(ALLOWED_ROLES.to_vec())
}

pub async fn user_roles(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<UserRolesResponse>> {
    ensure_access(&auth, AccessRule::Owner, Some(user_id))?;

    if state.users.find_by_id(user_id).await?.is_none() {
        return Err(ApiError::not_found("USER_NOT_FOUND"));
    }

    let roles = state.roles.roles_for(user_id).await?;
    let effective_role = state.roles.effective_role(user_id).await?;
    Ok(Json(UserRolesResponse {
        user_id,
        effective_role,
        roles,
    }))
}

/// Grant a role. `201` when newly assigned, `200` when the user already held it.
pub async fn assign_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<i64>,
    Json(body): Json<AssignRoleRequest>,
) -> ApiResult<(StatusCode, Json<UserRolesResponse>)> {
    let role = parse_role(body.role.as_deref().unwrap_or_default())?;

    let created = state.roles.assign_role(user_id, role).await?;
    if created {
        info!(
            actor = auth.user_id(),
            user_id,
            role = %role,
            "role assigned"
        );
    }

    let roles = state.roles.roles_for(user_id).await?;
    let effective_role = state.roles.effective_role(user_id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(UserRolesResponse {
            user_id,
            effective_role,
            roles,
        }),
    ))
}

pub async fn remove_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((user_id, role)): Path<(i64, String)>,
) -> ApiResult<StatusCode> {
    let role = parse_role(&role)?;

    if !state.roles.remove_role(user_id, role).await? {
        return Err(ApiError::not_found("ROLE_NOT_ASSIGNED"));
    }

    info!(
        actor = auth.user_id(),
        user_id,
        role = %role,
        "role removed"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// All assignments, optionally narrowed with `?user_id=`.
pub async fn list_assignments(
    State(state): State<AppState>,
    Query(filter): Query<AssignmentFilter>,
) -> ApiResult<Json<Vec<RoleAssignment>>> {
    let assignments = match filter.user_id {
        Some(user_id) => state.roles.roles_for(user_id).await?,
        None => state.roles.all().await?,
    };
    Ok(Json(assignments))
}

pub async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RoleAssignment>> {
    state
        .roles
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("ASSIGNMENT_NOT_FOUND"))
}

/// Same semantics as `POST /users/:user_id/roles`, with the user in the body.
pub async fn create_assignment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<NewAssignmentRequest>,
) -> ApiResult<(StatusCode, Json<RoleAssignment>)> {
    let (Some(user_id), Some(label)) = (body.user_id, body.role) else {
        return Err(ApiError::bad_request_msg(
            "MISSING_FIELD",
            "user_id and role are required",
        ));
    };
    let role = parse_role(&label)?;

    let created = state.roles.assign_role(user_id, role).await?;
    let assignment = state
        .roles
        .roles_for(user_id)
        .await?
        .into_iter()
        .find(|a| a.role == role)
        .ok_or_else(|| ApiError::internal("assignment vanished after insert", None))?;

    if created {
        info!(actor = auth.user_id(), user_id, role = %role, "role assigned");
        Ok((StatusCode::CREATED, Json(assignment)))
    } else {
        Ok((StatusCode::OK, Json(assignment)))
    }
}

pub async fn update_assignment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
    Json(body): Json<AssignRoleRequest>,
) -> ApiResult<Json<RoleAssignment>> {
    let role = parse_role(body.role.as_deref().unwrap_or_default())?;

    let Some(updated) = state.roles.update_role(id, role).await? else {
        return Err(ApiError::not_found("ASSIGNMENT_NOT_FOUND"));
    };

    info!(
        actor = auth.user_id(),
        assignment_id = id,
        user_id = updated.user_id,
        role = %role,
        "role assignment updated"
    );
    Ok(Json(updated))
}

pub async fn delete_assignment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.roles.delete(id).await? {
        return Err(ApiError::not_found("ASSIGNMENT_NOT_FOUND"));
    }

    info!(actor = auth.user_id(), assignment_id = id, "role assignment deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn parse_role(label: &str) -> ApiResult<Role> {
    Role::parse(label).ok_or_else(|| {
        ApiError::bad_request_msg(
            "INVALID_ROLE",
            format!("role must be one of: {}", ALLOWED_ROLES.join(", ")),
        )
    })
}
