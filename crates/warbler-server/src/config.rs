use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

/// Session secrets that must not reach production.
pub const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me-to-a-random-string"];

#[derive(Debug, Clone)]
pub struct Config {
    pub secret_key: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    /// Send the session cookie only over HTTPS.
    pub secure_cookies: bool,
}

impl Config {
    /// Read `WARBLER_*` variables, falling back to development defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("WARBLER_PORT", "5000");
        let secure_cookies = var("WARBLER_SECURE_COOKIES", "false");
        Ok(Self {
            secret_key: var("WARBLER_SECRET_KEY", "dev-secret-change-me"),
            db_path: var("WARBLER_DB_PATH", "warbler.db").into(),
            host: var("WARBLER_HOST", "0.0.0.0"),
            port: port
                .parse()
                .with_context(|| format!("WARBLER_PORT is not a port number: {port}"))?,
            static_dir: var("WARBLER_STATIC_DIR", "./static").into(),
            secure_cookies: secure_cookies.parse().with_context(|| {
                format!("WARBLER_SECURE_COOKIES must be true or false: {secure_cookies}")
            })?,
        })
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        self.secret_key.is_empty() || PLACEHOLDER_SECRETS.contains(&self.secret_key.as_str())
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
