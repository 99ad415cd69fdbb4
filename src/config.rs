//! # Process-wide configuration
//!
//! Read once at startup from the environment, optionally seeded by a `.env`
//! file. Setting `SMTP_HOST` switches delivery from the local `sendmail`
//! binary to an authenticated SMTP session:
//!
//! ```text
//! SMTP_HOST=smtp.example.org
//! SMTP_PORT=465
//! SMTP_SECURE=true
//! SMTP_USER=bewerbung@example.org
//! SMTP_PASS=hunter2
//! SMTP_FROM=bewerbung@example.org
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::vars::{
    DEFAULT_BIND_ADDR, DEFAULT_PORT, DEFAULT_RECIPIENT, DEFAULT_SENDER,
    DEFAULT_SENDMAIL_PATH, DEFAULT_SENDMAIL_TIMEOUT, DEFAULT_SMTP_TIMEOUT,
    DEFAULT_STATIC_FOLDER, SMTP_IMPLICIT_TLS_PORT, SMTP_SUBMISSION_PORT,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} must be true or false, got {value:?}")]
    InvalidFlag { key: &'static str, value: String },
    #[error("BIND_ADDR is not an IP address: {0:?}")]
    InvalidBindAddr(String),
}

/// Outbound SMTP settings. No `host` means "use the local relay".
#[derive(Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub secure: bool,
    /// Bound on connecting and on every reply
    pub timeout: Duration,
}

// Keeps the password out of logs
impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("secure", &self.secure)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            host: None,
            port: SMTP_SUBMISSION_PORT,
            user: None,
            password: None,
            from: DEFAULT_SENDER.to_owned(),
            secure: false,
            timeout: DEFAULT_SMTP_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendmailConfig {
    pub path: PathBuf,
    pub timeout: Duration,
}

impl Default for SendmailConfig {
    fn default() -> Self {
        SendmailConfig {
            path: PathBuf::from(DEFAULT_SENDMAIL_PATH),
            timeout: DEFAULT_SENDMAIL_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub static_folder: PathBuf,
    /// Every application is sent to this single address
    pub recipient: String,
    pub email: EmailConfig,
    pub sendmail: SendmailConfig,
}

impl Settings {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        Settings::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the settings out of any key/value source. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(addr) => addr
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddr(addr))?,
            None => DEFAULT_BIND_ADDR
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddr(DEFAULT_BIND_ADDR.to_owned()))?,
        };

        let secure = parse_flag("SMTP_SECURE", get("SMTP_SECURE"))?;
        let default_smtp_port = if secure {
            SMTP_IMPLICIT_TLS_PORT
        } else {
            SMTP_SUBMISSION_PORT
        };

        let email = EmailConfig {
            host: get("SMTP_HOST"),
            port: parse_number("SMTP_PORT", get("SMTP_PORT"))?
                .unwrap_or(default_smtp_port),
            user: get("SMTP_USER"),
            password: get("SMTP_PASS"),
            from: get("SMTP_FROM").unwrap_or_else(|| DEFAULT_SENDER.to_owned()),
            secure,
            timeout: parse_number("SMTP_TIMEOUT_SECS", get("SMTP_TIMEOUT_SECS"))?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SMTP_TIMEOUT),
        };

        let sendmail = SendmailConfig {
            path: get("SENDMAIL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SENDMAIL_PATH)),
            timeout: parse_number(
                "SENDMAIL_TIMEOUT_SECS",
                get("SENDMAIL_TIMEOUT_SECS"),
            )?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SENDMAIL_TIMEOUT),
        };

        Ok(Settings {
            bind_addr,
            port: parse_number("PORT", get("PORT"))?.unwrap_or(DEFAULT_PORT),
            static_folder: get("STATIC_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_FOLDER)),
            recipient: get("APPLY_RECIPIENT")
                .unwrap_or_else(|| DEFAULT_RECIPIENT.to_owned()),
            email,
            sendmail,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        None => Ok(None),
    }
}

fn parse_flag(
    key: &'static str,
    value: Option<String>,
) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(false);
    };

    match value.to_ascii_lowercase().as_str() {
        "false" | "0" | "no" => Ok(false),
        "true" | "1" | "yes" => Ok(true),
        _ => Err(ConfigError::InvalidFlag { key, value }),
    }
}
