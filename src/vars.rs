//! Fixed values of the application endpoint and their configurable defaults.

use std::time::Duration;

/// Submissions beyond this many bytes are rejected with `413`
pub const MAX_BODY_BYTES: usize = 15 * 1024 * 1024;

pub const REQUIRED_FIELDS: [&str; 4] = ["name", "klasse", "motivation", "nachricht"];
pub const REQUIRED_FILES: [&str; 1] = ["cv"];

pub const DEFAULT_PORT: u16 = 4173;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_STATIC_FOLDER: &str = "public";
pub const DEFAULT_RECIPIENT: &str = "fabio.juranek@bhakwien13.at";
pub const DEFAULT_SENDER: &str = "no-reply@maygasse-finance-society.local";
pub const DEFAULT_SENDMAIL_PATH: &str = "/usr/sbin/sendmail";

pub const SMTP_SUBMISSION_PORT: u16 = 587;
pub const SMTP_IMPLICIT_TLS_PORT: u16 = 465;

pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SENDMAIL_TIMEOUT: Duration = Duration::from_secs(60);
