use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common_http_errors::ApiError;
use common_security::{effective_role, Role};
use serde::Serialize;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username '{0}' already exists")]
    UsernameTaken(String),
    #[error("user {0} not found")]
    UserNotFound(i64),
    #[error("user {user_id} already holds role '{role}'")]
    RoleAlreadyHeld { user_id: i64, role: Role },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken(_) => ApiError::conflict("USERNAME_TAKEN", err.to_string()),
            StoreError::UserNotFound(_) => ApiError::not_found("USER_NOT_FOUND"),
            StoreError::RoleAlreadyHeld { .. } => ApiError::conflict("ROLE_ALREADY_HELD", err.to_string()),
            StoreError::Unavailable(_) => ApiError::internal(err, None),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleAssignment {
    pub id: i64,
    pub user_id: i64,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Credential store consulted at registration and login.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<UserRecord>;
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>>;
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<UserRecord>>;

    /// Returns `false` when no user has that username.
    async fn update_password(&self, username: &str, password_hash: &str) -> StoreResult<bool>;
}

/// Role assignments, kept in assignment order.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn roles_for(&self, user_id: i64) -> StoreResult<Vec<RoleAssignment>>;

    /// Returns `false` when the user already held the role.
    async fn assign_role(&self, user_id: i64, role: Role) -> StoreResult<bool>;

    /// Returns `false` when the user did not hold the role.
    async fn remove_role(&self, user_id: i64, role: Role) -> StoreResult<bool>;

    /// Every assignment, ordered by assignment id.
    async fn all(&self) -> StoreResult<Vec<RoleAssignment>>;

    async fn get(&self, id: i64) -> StoreResult<Option<RoleAssignment>>;

    /// Change the role of one assignment in place. `None` when the id is unknown.
    async fn update_role(&self, id: i64, role: Role) -> StoreResult<Option<RoleAssignment>>;

    /// Returns `false` when the id is unknown.
    async fn delete(&self, id: i64) -> StoreResult<bool>;

    /// First assigned role, `Customer` when the user has none.
    async fn effective_role(&self, user_id: i64) -> StoreResult<Role> {
        let assigned = self.roles_for(user_id).await?;
        Ok(effective_role(assigned.iter().map(|a| a.role.as_str())))
    }
}

#[derive(Default)]
struct Inner {
    users: HashMap<i64, UserRecord>,
    user_ids_by_name: HashMap<String, i64>,
    roles: HashMap<i64, Vec<RoleAssignment>>,
    next_user_id: i64,
    next_assignment_id: i64,
}

/// Process-local store backing both traits.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> StoreResult<UserRecord> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        if guard.user_ids_by_name.contains_key(username) {
            return Err(StoreError::UsernameTaken(username.to_string()));
        }

        guard.next_user_id += 1;
        let record = UserRecord {
            id: guard.next_user_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        guard.user_ids_by_name.insert(record.username.clone(), record.id);
        guard.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard
            .user_ids_by_name
            .get(username)
            .and_then(|id| guard.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<UserRecord>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.users.get(&id).cloned())
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> StoreResult<bool> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        let Some(id) = guard.user_ids_by_name.get(username).copied() else {
            return Ok(false);
        };
        match guard.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn roles_for(&self, user_id: i64) -> StoreResult<Vec<RoleAssignment>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.roles.get(&user_id).cloned().unwrap_or_default())
    }

    async fn assign_role(&self, user_id: i64, role: Role) -> StoreResult<bool> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        if !guard.users.contains_key(&user_id) {
            return Err(StoreError::UserNotFound(user_id));
        }
        if guard
            .roles
            .get(&user_id)
            .is_some_and(|assigned| assigned.iter().any(|a| a.role == role))
        {
            return Ok(false);
        }

        guard.next_assignment_id += 1;
        let assignment = RoleAssignment {
            id: guard.next_assignment_id,
            user_id,
            role,
            created_at: Utc::now(),
        };
        guard.roles.entry(user_id).or_default().push(assignment);
        Ok(true)
    }

    async fn remove_role(&self, user_id: i64, role: Role) -> StoreResult<bool> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        let Some(assigned) = guard.roles.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = assigned.len();
        assigned.retain(|a| a.role != role);
        Ok(assigned.len() != before)
    }

    async fn all(&self) -> StoreResult<Vec<RoleAssignment>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        let mut assignments: Vec<RoleAssignment> =
            guard.roles.values().flatten().cloned().collect();
        assignments.sort_by_key(|a| a.id);
        Ok(assignments)
    }

    async fn get(&self, id: i64) -> StoreResult<Option<RoleAssignment>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.roles.values().flatten().find(|a| a.id == id).cloned())
    }

    async fn update_role(&self, id: i64, role: Role) -> StoreResult<Option<RoleAssignment>> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        let Some(assigned) = guard
            .roles
            .values_mut()
            .find(|assigned| assigned.iter().any(|a| a.id == id))
        else {
            return Ok(None);
        };

        if assigned.iter().any(|a| a.id != id && a.role == role) {
            let user_id = assigned[0].user_id;
            return Err(StoreError::RoleAlreadyHeld { user_id, role });
        }

        let updated = assigned
            .iter_mut()
            .find(|a| a.id == id)
            .map(|assignment| {
                assignment.role = role;
                assignment.clone()
            });
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        for assigned in guard.roles.values_mut() {
            if let Some(index) = assigned.iter().position(|a| a.id == id) {
                assigned.remove(index);
                return Ok(true);
            }
        }
        Ok(false)
    }
}
