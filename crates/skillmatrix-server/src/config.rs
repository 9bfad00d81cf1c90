use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use tracing::info;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-jwt-secret",
];

#[derive(Debug)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    /// `None` means any origin.
    pub cors_origins: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| {
            lookup(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| {
                info!("{key} not set, using default: {default}");
                default.to_string()
            })
        };

        let jwt_secret = lookup("SKILLMATRIX_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!(
                "SKILLMATRIX_JWT_SECRET is unset or still a placeholder; \
                 set it to the identity provider's JWT secret"
            );
        }

        let host = var("SKILLMATRIX_HOST", "0.0.0.0");
        let port: u16 = var("SKILLMATRIX_PORT", "3000")
            .parse()
            .context("SKILLMATRIX_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", host, port))?;

        let cors_origins = lookup("SKILLMATRIX_CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty());

        Ok(Self {
            jwt_secret,
            db_path: var("SKILLMATRIX_DB_PATH", "skillmatrix.db").into(),
            addr,
            cors_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_secret_is_set() {
        let config = load(&[("SKILLMATRIX_JWT_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(config.addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.db_path, PathBuf::from("skillmatrix.db"));
        assert!(config.cors_origins.is_none());
    }

    #[test]
    fn missing_or_placeholder_secret_is_fatal() {
        assert!(load(&[]).is_err());
        assert!(load(&[("SKILLMATRIX_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("SKILLMATRIX_JWT_SECRET", "a-real-secret"),
            ("SKILLMATRIX_HOST", "127.0.0.1"),
            ("SKILLMATRIX_PORT", "8080"),
            ("SKILLMATRIX_CORS_ORIGINS", "http://localhost:5173, https://app.example.com,"),
        ])
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(
            config.cors_origins.unwrap(),
            vec!["http://localhost:5173", "https://app.example.com"]
        );

        assert!(load(&[("SKILLMATRIX_JWT_SECRET", "s"), ("SKILLMATRIX_PORT", "http")]).is_err());
    }
}
