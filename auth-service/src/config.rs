use anyhow::{anyhow, Context, Result};
use axum::http::HeaderValue;
use common_auth::{SigningSecret, TokenConfig};
use std::env;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_PORT: u16 = 8085;
const DEFAULT_TTL_HOURS: i64 = 24;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub token: TokenConfig,
    /// Mounts `POST /token`, which mints tokens for arbitrary user ids.
    pub dev_token_endpoint: bool,
    pub cors_origins: Vec<HeaderValue>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl ServiceConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid HOST '{}'", self.host))?;
        Ok(SocketAddr::from((ip, self.port)))
    }

    /// Build config from an arbitrary key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST")
            .and_then(|value| normalize_optional(&value))
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT").and_then(|value| normalize_optional(&value)) {
            Some(value) => value
                .parse()
                .with_context(|| format!("Invalid PORT '{value}'"))?,
            None => DEFAULT_PORT,
        };

        let secret = lookup("AUTH_TOKEN_SECRET")
            .and_then(|value| normalize_optional(&value))
            .ok_or_else(|| anyhow!("AUTH_TOKEN_SECRET must be set"))?;
        let secret = SigningSecret::new(secret).context("Invalid AUTH_TOKEN_SECRET")?;

        let ttl_hours = match lookup("AUTH_TOKEN_TTL_HOURS").and_then(|value| normalize_optional(&value)) {
            Some(value) => value
                .parse::<i64>()
                .with_context(|| format!("Invalid AUTH_TOKEN_TTL_HOURS '{value}'"))?,
            None => DEFAULT_TTL_HOURS,
        };
        let token = TokenConfig::new(secret)
            .with_ttl_hours(ttl_hours)
            .context("Invalid AUTH_TOKEN_TTL_HOURS")?;

        let dev_token_endpoint = lookup("AUTH_DEV_TOKEN_ENDPOINT")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        let cors_origins = parse_origins(
            &lookup("AUTH_CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
        )
        .context("Failed to parse AUTH_CORS_ORIGINS")?;

        let bootstrap_admin = match (
            lookup("AUTH_BOOTSTRAP_ADMIN_USERNAME").and_then(|value| normalize_optional(&value)),
            lookup("AUTH_BOOTSTRAP_ADMIN_PASSWORD").and_then(|value| normalize_optional(&value)),
        ) {
            (Some(username), Some(password)) => Some(BootstrapAdmin { username, password }),
            (None, None) => None,
            _ => {
                return Err(anyhow!(
                    "AUTH_BOOTSTRAP_ADMIN_USERNAME and AUTH_BOOTSTRAP_ADMIN_PASSWORD must be set together"
                ))
            }
        };

        Ok(Self {
            host,
            port,
            token,
            dev_token_endpoint,
            cors_origins,
            bootstrap_admin,
        })
    }
}

pub fn load_service_config() -> Result<ServiceConfig> {
    ServiceConfig::from_lookup(|key| env::var(key).ok())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_origins(value: &str) -> Result<Vec<HeaderValue>> {
    value
        .split(|c: char| c == ',' || c == ';' || c == ' ')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            HeaderValue::from_str(item).map_err(|err| anyhow!("Invalid origin '{item}': {err}"))
        })
        .collect()
}
