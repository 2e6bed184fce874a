use secrecy::SecretString;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_SFTP_HOST: &str = "anacom.analytica.ch";
pub const DEFAULT_SFTP_PORT: u16 = 22;
pub const DEFAULT_SFTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Credentials and endpoint for the remote file source
#[derive(Debug, Clone)]
pub struct SftpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub max_body_bytes: usize,
    pub sftp: SftpConfig,
}

impl ServiceConfig {
    /// Reads the process environment, after loading `.env` if one exists
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or("HL7_BIND_ADDR", &lookup, || {
            Ok(SocketAddr::from(([0, 0, 0, 0], 8000)))
        })?;
        let max_body_bytes = parse_or("HL7_MAX_BODY_BYTES", &lookup, || Ok(DEFAULT_MAX_BODY_BYTES))?;
        let port = parse_or("SFTP_PORT", &lookup, || Ok(DEFAULT_SFTP_PORT))?;
        let timeout_secs = parse_or("SFTP_TIMEOUT_SECS", &lookup, || Ok(DEFAULT_SFTP_TIMEOUT_SECS))?;

        let host = non_empty(lookup("SFTP_HOST")).unwrap_or_else(|| DEFAULT_SFTP_HOST.to_string());

        Ok(Self {
            bind_addr,
            max_body_bytes,
            sftp: SftpConfig {
                host,
                port,
                username: non_empty(lookup("SFTP_USERNAME")),
                password: non_empty(lookup("SFTP_PASSWORD")).map(SecretString::new),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn parse_or<T, F, D>(name: &'static str, lookup: &F, default: D) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
    D: FnOnce() -> Result<T, ConfigError>,
{
    match non_empty(lookup(name)) {
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|_| ConfigError::Invalid { name, value })
        }
        None => default(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
