#![allow(dead_code)]

use std::collections::HashMap;

use anyhow::{Context, Result};
use auth_service::{router, AppState, ServiceConfig};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

pub const ADMIN_USERNAME: &str = "root";
pub const ADMIN_PASSWORD: &str = "bootstrap-password";

pub fn test_config(extra: &[(&str, &str)]) -> Result<ServiceConfig> {
    let mut vars: HashMap<String, String> = HashMap::from([
        (
            "AUTH_TOKEN_SECRET".to_string(),
            "integration-test-secret-with-enough-bytes".to_string(),
        ),
        ("AUTH_BOOTSTRAP_ADMIN_USERNAME".to_string(), ADMIN_USERNAME.to_string()),
        ("AUTH_BOOTSTRAP_ADMIN_PASSWORD".to_string(), ADMIN_PASSWORD.to_string()),
    ]);
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }
    ServiceConfig::from_lookup(|key| vars.get(key).cloned())
}

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn spawn(extra: &[(&str, &str)]) -> Result<Self> {
        let state = AppState::in_memory(test_config(extra)?)?;
        state.seed_bootstrap_admin().await?;
        let router = router(state.clone());
        Ok(Self { state, router })
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json)?)
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body)?).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok((status, value))
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(i64, String)> {
        let (status, body) = self
            .request(
                Method::POST,
                "/register",
                None,
                Some(serde_json::json!({ "username": username, "password": password })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register returned {status}: {body}");
        let user_id = body["user_id"].as_i64().context("user_id missing")?;
        let token = body["token"].as_str().context("token missing")?.to_string();
        Ok((user_id, token))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(StatusCode, Value)> {
        self.request(
            Method::POST,
            "/login",
            None,
            Some(serde_json::json!({ "username": username, "password": password })),
        )
        .await
    }

    pub async fn admin_token(&self) -> Result<String> {
        let (status, body) = self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await?;
        anyhow::ensure!(status == StatusCode::OK, "admin login returned {status}");
        Ok(body["token"].as_str().context("token missing")?.to_string())
    }
}
