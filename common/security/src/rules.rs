use std::collections::HashMap;

use axum::http::Method;

use crate::roles::Role;

/// Access class an endpoint declares. Evaluated by [`crate::policy::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRule {
    /// No token required.
    Public,
    /// Any valid token.
    Authenticated,
    /// Token whose effective role is at least the given role.
    MinimumRole(Role),
    /// Token owned by the target resource's user, or an admin token.
    Owner,
}

impl AccessRule {
    pub const ADMIN_ONLY: AccessRule = AccessRule::MinimumRole(Role::Admin);

    pub fn requires_token(&self) -> bool {
        !matches!(self, AccessRule::Public)
    }
}

/// Declarative `(method, route template) -> AccessRule` table.
///
/// Templates use the router's own syntax (`/orders/:id`) so that a lookup by
/// the matched route needs no pattern matching of its own.
#[derive(Debug, Clone)]
pub struct RouteRules {
    rules: HashMap<(Method, String), AccessRule>,
    fallback: AccessRule,
}

impl Default for RouteRules {
    fn default() -> Self {
        Self::new(AccessRule::Authenticated)
    }
}

impl RouteRules {
    pub fn new(fallback: AccessRule) -> Self {
        Self {
            rules: HashMap::new(),
            fallback,
        }
    }

    pub fn rule(mut self, method: Method, path: &str, rule: AccessRule) -> Self {
        self.rules.insert((method, path.to_string()), rule);
        self
    }

    pub fn public(self, method: Method, path: &str) -> Self {
        self.rule(method, path, AccessRule::Public)
    }

    pub fn authenticated(self, method: Method, path: &str) -> Self {
        self.rule(method, path, AccessRule::Authenticated)
    }

    pub fn admin(self, method: Method, path: &str) -> Self {
        self.rule(method, path, AccessRule::ADMIN_ONLY)
    }

    pub fn owner(self, method: Method, path: &str) -> Self {
        self.rule(method, path, AccessRule::Owner)
    }

    /// Readable by anyone, writable by admins: `GET` on the collection and
    /// item are public, `POST`/`PUT`/`DELETE` require admin.
    pub fn catalog(self, collection: &str) -> Self {
        let item = format!("{collection}/:id");
        self.public(Method::GET, collection)
            .public(Method::GET, &item)
            .admin(Method::POST, collection)
            .admin(Method::PUT, &item)
            .admin(Method::DELETE, &item)
    }

    /// Per-user records: listing needs a token (the handler narrows the list
    /// to the caller unless they are an admin), everything else is
    /// owner-scoped.
    pub fn owned(self, collection: &str) -> Self {
        let item = format!("{collection}/:id");
        self.authenticated(Method::GET, collection)
            .owner(Method::POST, collection)
            .owner(Method::GET, &item)
            .owner(Method::PUT, &item)
            .owner(Method::DELETE, &item)
    }

    pub fn rule_for(&self, method: &Method, path: &str) -> AccessRule {
        self.rules
            .get(&(method.clone(), path.to_string()))
            .copied()
            .unwrap_or(self.fallback)
    }

    /// Access table for the storefront API.
    pub fn storefront() -> Self {
        Self::default()
            .catalog("/products")
            .catalog("/categories")
            .catalog("/variants")
            .catalog("/bulk-prices")
            .public(Method::GET, "/products/:id/images")
            .admin(Method::POST, "/products/:id/images")
            .admin(Method::DELETE, "/images/:id")
            .owned("/orders")
            .admin(Method::PUT, "/orders/:id")
            .owner(Method::GET, "/users/:user_id/orders")
            .owned("/carts")
            .owner(Method::GET, "/carts/:id/items")
            .owner(Method::POST, "/carts/:id/items")
            .owner(Method::PUT, "/cart-items/:id")
            .owner(Method::DELETE, "/cart-items/:id")
            .owned("/addresses")
            .owned("/payments")
            .owned("/cards")
            .owner(Method::GET, "/profiles/:user_id")
            .owner(Method::PUT, "/profiles/:user_id")
            .public(Method::GET, "/roles")
            .owner(Method::GET, "/users/:user_id/roles")
            .admin(Method::POST, "/users/:user_id/roles")
            .admin(Method::DELETE, "/users/:user_id/roles/:role")
            .admin(Method::GET, "/user-roles")
            .admin(Method::GET, "/user-roles/:id")
            .admin(Method::POST, "/user-roles")
            .admin(Method::PUT, "/user-roles/:id")
            .admin(Method::DELETE, "/user-roles/:id")
            .public(Method::POST, "/login")
            .public(Method::POST, "/register")
            .authenticated(Method::POST, "/password-reset")
    }
}
