use std::fmt;
use std::str::FromStr;

use common_auth::{Claims, ROLE_ADMIN, ROLE_CUSTOMER, ROLE_STAFF};
use serde::{Deserialize, Serialize};

/// Storefront roles, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => ROLE_CUSTOMER,
            Role::Staff => ROLE_STAFF,
            Role::Admin => ROLE_ADMIN,
        }
    }

    /// Case-insensitive parse of a role label; `None` for anything unknown.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        [Role::Admin, Role::Staff, Role::Customer]
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(label))
    }

    /// Role a token speaks for. Missing or unrecognised labels fall back to
    /// `Customer`.
    pub fn from_claims(claims: &Claims) -> Self {
        claims
            .role()
            .and_then(Role::parse)
            .unwrap_or(Role::Customer)
    }

    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| format!("unknown role '{s}'"))
    }
}

/// Effective role of a user with the given assignments: the first assigned
/// role, or `Customer` when nothing usable is assigned.
pub fn effective_role<I, S>(assigned: I) -> Role
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    assigned
        .into_iter()
        .next()
        .and_then(|label| Role::parse(label.as_ref()))
        .unwrap_or(Role::Customer)
}
