pub mod error;
pub mod guard;
pub mod policy;
pub mod roles;
pub mod rules;

pub use error::SecurityError;
pub use guard::{enforce_route_rules, ensure_access};
pub use policy::{check, check_role, Decision, DenyReason};
pub use roles::{effective_role, Role};
pub use rules::{AccessRule, RouteRules};
