pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";
pub const ROLE_CUSTOMER: &str = "customer";

/// Role labels accepted by the role-assignment store, highest privilege first.
pub const ALLOWED_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_STAFF, ROLE_CUSTOMER];
