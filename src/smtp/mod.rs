//! # SMTP client module
//!
//! Rather than pulling in a full mail library, the conversation is driven by
//! a small state machine built with enums and matching: every state sends one
//! command and moves on only if the reply code is one it accepts. AUTH LOGIN
//! is the only authentication, TLS (when enabled) is set up before the
//! greeting, and there is no STARTTLS.

mod client;
pub mod reply;
pub mod state_machine;

use std::io;
use thiserror::Error;

pub use client::{connect, send_via_smtp, tls_handshake, Session};
pub use reply::Reply;
pub use state_machine::State;

#[derive(Debug, Error)]
pub enum SmtpError {
    #[error("smtp_config_missing")]
    ConfigMissing,
    #[error("smtp_unexpected_{}", .reply.code)]
    UnexpectedReply { state: State, reply: Reply },
    #[error("smtp_malformed_reply: {0:?}")]
    MalformedReply(String),
    #[error("smtp_connection_closed")]
    ConnectionClosed,
    #[error("smtp_timeout: {0}")]
    Timeout(&'static str),
    #[error("smtp_tls: {0}")]
    Tls(String),
    #[error("smtp_transport: {0}")]
    Io(#[from] io::Error),
}

impl SmtpError {
    /// The reply code behind an `UnexpectedReply`
    pub fn code(&self) -> Option<u16> {
        match self {
            SmtpError::UnexpectedReply { reply, .. } => Some(reply.code),
            _ => None,
        }
    }
}
