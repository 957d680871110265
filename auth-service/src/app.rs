use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use axum::extract::{FromRef, State};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use common_auth::{TokenCodec, TokenIssuer};
use common_http_errors::ApiError;
use common_security::{enforce_route_rules, RouteRules, Role};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::metrics::AuthMetrics;
use crate::passwords::hash_password;
use crate::role_handlers::{
    assign_role, create_assignment, delete_assignment, get_assignment, list_assignments,
    list_roles, remove_role, update_assignment, user_roles,
};
use crate::store::{InMemoryStore, RoleStore, UserStore};
use crate::token_handlers::generate_token;
use crate::user_handlers::{login_user, me, register_user, reset_password};

#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub issuer: Arc<TokenIssuer>,
    pub rules: Arc<RouteRules>,
    pub users: Arc<dyn UserStore>,
    pub roles: Arc<dyn RoleStore>,
    pub config: Arc<ServiceConfig>,
    pub metrics: Arc<AuthMetrics>,
}

impl FromRef<AppState> for Arc<TokenCodec> {
    fn from_ref(state: &AppState) -> Self {
        state.codec.clone()
    }
}

impl FromRef<AppState> for Arc<RouteRules> {
    fn from_ref(state: &AppState) -> Self {
        state.rules.clone()
    }
}

impl FromRef<AppState> for Arc<ServiceConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
    ) -> Result<Self> {
        let issuer = TokenIssuer::new(&config.token).context("Failed to build token issuer")?;
        Ok(Self {
            codec: Arc::new(issuer.codec().clone()),
            issuer: Arc::new(issuer),
            rules: Arc::new(route_rules()),
            users,
            roles,
            config: Arc::new(config),
            metrics: Arc::new(AuthMetrics::new()?),
        })
    }

    /// State backed by a single process-local store.
    pub fn in_memory(config: ServiceConfig) -> Result<Self> {
        let store = Arc::new(InMemoryStore::new());
        Self::new(config, store.clone(), store)
    }

    /// Create the configured bootstrap admin and grant it `admin`. Does
    /// nothing when no bootstrap account is configured or it already exists.
    pub async fn seed_bootstrap_admin(&self) -> Result<()> {
        let Some(admin) = self.config.bootstrap_admin.as_ref() else {
            return Ok(());
        };

        if self.users.find_by_username(&admin.username).await?.is_some() {
            info!(username = %admin.username, "bootstrap admin already present");
            return Ok(());
        }

        let password_hash = hash_password(&admin.password)
            .await
            .map_err(|err| anyhow!("Failed to hash bootstrap admin password: {err:?}"))?;
        let user = self
            .users
            .create_user(&admin.username, &password_hash)
            .await?;
        self.roles.assign_role(user.id, Role::Admin).await?;
        info!(user_id = user.id, username = %user.username, "seeded bootstrap admin");
        Ok(())
    }
}

/// Storefront access table plus this service's own operational endpoints.
pub fn route_rules() -> RouteRules {
    RouteRules::storefront()
        .public(Method::GET, "/healthz")
        .public(Method::GET, "/metrics")
        .public(Method::POST, "/token")
        .authenticated(Method::GET, "/me")
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(state.config.cors_origins.clone()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION]);

    let mut app = Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/password-reset", post(reset_password))
        .route("/me", get(me))
        .route("/roles", get(list_roles))
        .route("/users/:user_id/roles", get(user_roles).post(assign_role))
        .route("/users/:user_id/roles/:role", delete(remove_role))
        .route("/user-roles", get(list_assignments).post(create_assignment))
        .route(
            "/user-roles/:id",
            get(get_assignment)
                .put(update_assignment)
                .delete(delete_assignment),
        );

    if state.config.dev_token_endpoint {
        warn!("development token endpoint enabled");
        app = app.route("/token", post(generate_token));
    }

    app.route_layer(middleware::from_fn_with_state(
        state.clone(),
        enforce_route_rules::<AppState>,
    ))
    .with_state(state)
    .layer(cors)
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(response) => response,
        Err(err) => ApiError::internal(err, None).into_response(),
    }
}
