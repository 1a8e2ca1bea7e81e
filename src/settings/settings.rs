use crate::application_impl::JwtConfig;
use crate::domain_model::{SessionConfig, TransportMode};
use anyhow::{Result, anyhow, bail};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub revocation: Revocation,
    pub http: Http,
    pub log: Log,
}

#[derive(Deserialize)]
pub struct Auth {
    pub access_secret: String,
    pub refresh_secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
    #[serde(default)]
    pub rotation_leeway_secs: u64,
    #[serde(default = "default_transport")]
    pub transport: TransportMode,
    #[serde(default = "default_cookie_path")]
    pub refresh_cookie_path: String,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("rotation_leeway_secs", &self.rotation_leeway_secs)
            .field("transport", &self.transport)
            .field("refresh_cookie_path", &self.refresh_cookie_path)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Revocation {
    pub backend: String, // "memory" or "redis"
    pub url: Option<String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// How often the memory backend sweeps expired records.
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub tls: Option<Tls>,
}

#[derive(Debug, Deserialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

fn default_issuer() -> String {
    "tokenpair".to_string()
}

fn default_audience() -> String {
    "tokenpair-client".to_string()
}

fn default_access_ttl_secs() -> u64 {
    15 * 60
}

fn default_refresh_ttl_secs() -> u64 {
    14 * 24 * 60 * 60
}

fn default_transport() -> TransportMode {
    TransportMode::Header
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_prefix() -> String {
    "tokenpair".to_string()
}

fn default_timeout_ms() -> u64 {
    500
}

fn default_purge_interval_secs() -> u64 {
    60
}

impl Settings {
    /// Refuse to start on configuration that would run insecurely or not at all.
    pub fn validate(&self) -> Result<()> {
        let auth = &self.auth;
        if auth.access_secret.is_empty() {
            bail!("access token secret not defined");
        }
        if auth.refresh_secret.is_empty() {
            bail!("refresh token secret not defined");
        }
        if auth.access_secret == auth.refresh_secret {
            bail!("access and refresh token secrets must differ");
        }
        if auth.access_ttl_secs == 0 || auth.refresh_ttl_secs == 0 {
            bail!("token lifetimes must be positive");
        }
        if auth.rotation_leeway_secs >= auth.access_ttl_secs {
            bail!("rotation leeway must be shorter than the access token lifetime");
        }
        if !auth.refresh_cookie_path.starts_with('/') {
            bail!("refresh cookie path must start with '/'");
        }
        match self.revocation.backend.as_str() {
            "memory" => {}
            "redis" => {
                if self.revocation.url.as_deref().is_none_or(str::is_empty) {
                    bail!("redis revocation backend requires a url");
                }
            }
            other => bail!("unknown revocation backend: {}", other),
        }
        if self.revocation.timeout_ms == 0 {
            bail!("revocation store timeout must be positive");
        }
        if self.revocation.purge_interval_secs == 0 {
            bail!("revocation purge interval must be positive");
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            access_ttl: Duration::from_secs(self.auth.access_ttl_secs),
            refresh_ttl: Duration::from_secs(self.auth.refresh_ttl_secs),
            rotation_leeway: Duration::from_secs(self.auth.rotation_leeway_secs),
            transport: self.auth.transport,
        }
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            issuer: self.auth.issuer.clone(),
            audience: self.auth.audience.clone(),
            access_secret: self.auth.access_secret.clone().into_bytes(),
            refresh_secret: self.auth.refresh_secret.clone().into_bytes(),
        }
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);
    finish(Config::builder().add_source(File::with_name(path)))
}

/// Layer the environment over a file source, then deserialize and validate.
fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder
        .add_source(
            Environment::with_prefix("TOKENPAIR")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("auth.access_secret", std::env::var("ACCESS_TOKEN_SECRET").ok())
        .map_err(|e| anyhow!(e))?
        .set_override_option("auth.refresh_secret", std::env::var("REFRESH_TOKEN_SECRET").ok())
        .map_err(|e| anyhow!(e))?
        .set_override_option("revocation.url", std::env::var("REDIS_URL").ok())
        .map_err(|e| anyhow!(e))?
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}
