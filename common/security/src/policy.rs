use common_auth::Claims;

use crate::roles::Role;
use crate::rules::AccessRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    InsufficientRole,
    NotOwner,
}

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), crate::SecurityError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason.into()),
        }
    }
}

/// Decide whether `claims` may perform an operation guarded by `rule`.
///
/// `resource_owner_id` is only consulted for [`AccessRule::Owner`]; an owner
/// that could not be determined never matches a non-admin caller.
pub fn check(claims: &Claims, rule: AccessRule, resource_owner_id: Option<i64>) -> Decision {
    if let Decision::Deny(reason) = check_role(claims, rule) {
        return Decision::Deny(reason);
    }

    match rule {
        AccessRule::Owner => {
            if Role::from_claims(claims) == Role::Admin {
                Decision::Allow
            } else if resource_owner_id == Some(claims.user_id()) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotOwner)
            }
        }
        AccessRule::Public | AccessRule::Authenticated | AccessRule::MinimumRole(_) => {
            Decision::Allow
        }
    }
}

/// Role portion of [`check`]: usable before the resource owner is known.
pub fn check_role(claims: &Claims, rule: AccessRule) -> Decision {
    match rule {
        AccessRule::MinimumRole(required) if !Role::from_claims(claims).satisfies(required) => {
            Decision::Deny(DenyReason::InsufficientRole)
        }
        _ => Decision::Allow,
    }
}
