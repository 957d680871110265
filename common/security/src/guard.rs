use std::sync::Arc;

use axum::extract::{FromRef, MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use common_auth::{AuthContext, TokenCodec};
use tracing::warn;

use crate::error::SecurityError;
use crate::policy::{self, Decision};
use crate::roles::Role;
use crate::rules::{AccessRule, RouteRules};

/// Authorize `auth` for an operation guarded by `rule`, given the owner of
/// the target record when the rule is ownership-scoped.
pub fn ensure_access(
    auth: &AuthContext,
    rule: AccessRule,
    resource_owner_id: Option<i64>,
) -> Result<(), SecurityError> {
    match policy::check(&auth.claims, rule, resource_owner_id) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            warn!(
                user_id = auth.user_id(),
                role = %Role::from_claims(&auth.claims),
                ?rule,
                ?reason,
                ?resource_owner_id,
                "access_check_failed"
            );
            Err(reason.into())
        }
    }
}

/// Route-layer middleware applying the [`RouteRules`] held in state.
///
/// Public routes pass straight through. Every other route must carry a valid
/// bearer token whose role satisfies the rule; the verified [`AuthContext`] is
/// left in the request extensions for the handler, which performs any
/// ownership check itself once it has loaded the target record.
pub async fn enforce_route_rules<S>(State(state): State<S>, mut req: Request, next: Next) -> Response
where
    S: Clone + Send + Sync + 'static,
    Arc<TokenCodec>: FromRef<S>,
    Arc<RouteRules>: FromRef<S>,
{
    let rules = Arc::<RouteRules>::from_ref(&state);
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let rule = rules.rule_for(req.method(), &path);

    if !rule.requires_token() {
        return next.run(req).await;
    }

    let codec = Arc::<TokenCodec>::from_ref(&state);
    let auth = match AuthContext::from_headers(req.headers(), &codec) {
        Ok(auth) => auth,
        Err(err) => return err.into_response(),
    };

    if let Decision::Deny(reason) = policy::check_role(&auth.claims, rule) {
        warn!(
            user_id = auth.user_id(),
            role = %Role::from_claims(&auth.claims),
            method = %req.method(),
            path = %path,
            ?reason,
            "route_role_check_failed"
        );
        return SecurityError::from(reason).into_response();
    }

    req.extensions_mut().insert(auth);
    next.run(req).await
}
