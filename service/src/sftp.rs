use crate::config::SftpConfig;
use axum::http::StatusCode;
use secrecy::ExposeSecret;
use ssh2::{ErrorCode, Session};
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use tracing::{debug, info, warn};

// libssh2 LIBSSH2_FX_NO_SUCH_FILE
const SFTP_NO_SUCH_FILE: i32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("SFTP credentials not found in environment variables")]
    MissingCredentials,
    #[error("Failed to connect to {host}: {message}")]
    Connect { host: String, message: String },
    #[error("SSH handshake failed: {0}")]
    Handshake(String),
    #[error("Authentication failed for user '{0}'")]
    Auth(String),
    #[error("Remote file not found: {0}")]
    NotFound(String),
    #[error("Failed to read remote file {path}: {message}")]
    Read { path: String, message: String },
    #[error("Remote file {0} is not valid UTF-8")]
    Decode(String),
    #[error("Transfer task failed: {0}")]
    Task(String),
}

impl TransportError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TransportError::MissingCredentials => StatusCode::SERVICE_UNAVAILABLE,
            TransportError::Connect { .. }
            | TransportError::Handshake(_)
            | TransportError::Auth(_)
            | TransportError::Read { .. } => StatusCode::BAD_GATEWAY,
            TransportError::NotFound(_) => StatusCode::NOT_FOUND,
            TransportError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            TransportError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Hands the parser one fully-buffered message.
///
/// Implementations block; callers on the async runtime wrap `fetch` in
/// `spawn_blocking`.
pub trait RemoteSource: Send + Sync {
    fn fetch(&self, path: &str) -> Result<String, TransportError>;

    fn hostname(&self) -> &str;

    /// Username and whether a password is configured, for diagnostics only
    fn credential_status(&self) -> (Option<&str>, bool);
}

pub struct SftpSource {
    config: SftpConfig,
}

impl SftpSource {
    pub fn new(config: SftpConfig) -> Self {
        Self { config }
    }

    fn open_session(&self, username: &str, password: &str) -> Result<Session, TransportError> {
        let host = &self.config.host;
        let connect_err = |message: String| TransportError::Connect {
            host: host.clone(),
            message,
        };

        let addr = (host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| connect_err(e.to_string()))?
            .next()
            .ok_or_else(|| connect_err("no address resolved".to_string()))?;

        debug!("Connecting to {} ({})", host, addr);
        let tcp = TcpStream::connect_timeout(&addr, self.config.timeout)
            .map_err(|e| connect_err(e.to_string()))?;

        let mut session = Session::new().map_err(|e| TransportError::Handshake(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(self.config.timeout.as_millis().min(u32::MAX as u128) as u32);
        session
            .handshake()
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        session.userauth_password(username, password).map_err(|e| {
            warn!("SFTP authentication rejected for '{}': {}", username, e);
            TransportError::Auth(username.to_string())
        })?;
        if !session.authenticated() {
            return Err(TransportError::Auth(username.to_string()));
        }

        Ok(session)
    }
}

impl RemoteSource for SftpSource {
    fn fetch(&self, path: &str) -> Result<String, TransportError> {
        let (username, password) = match (&self.config.username, &self.config.password) {
            (Some(user), Some(pass)) => (user.as_str(), pass.expose_secret().as_str()),
            _ => return Err(TransportError::MissingCredentials),
        };

        info!("Fetching {} from {}", path, self.config.host);
        let session = self.open_session(username, password)?;

        let read_err = |e: ssh2::Error| TransportError::Read {
            path: path.to_string(),
            message: e.to_string(),
        };

        let sftp = session.sftp().map_err(read_err)?;
        let mut file = sftp.open(Path::new(path)).map_err(|e| match e.code() {
            ErrorCode::SFTP(SFTP_NO_SUCH_FILE) => TransportError::NotFound(path.to_string()),
            _ => read_err(e),
        })?;

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .map_err(|e| TransportError::Read {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        info!("Downloaded {} bytes from {}", buffer.len(), path);

        String::from_utf8(buffer).map_err(|_| TransportError::Decode(path.to_string()))
    }

    fn hostname(&self) -> &str {
        &self.config.host
    }

    fn credential_status(&self) -> (Option<&str>, bool) {
        (self.config.username.as_deref(), self.config.password.is_some())
    }
}
