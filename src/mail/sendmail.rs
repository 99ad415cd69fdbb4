//! Delivery through the local mail transfer agent.
//!
//! `sendmail -t -i` takes the recipients from the message headers and does
//! not treat a lone `.` line as the end of input.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::SendmailConfig;
use crate::mail::message::MimeMessage;

#[derive(Debug, Error)]
pub enum SendmailError {
    #[error("sendmail_not_available: {0}")]
    Unavailable(#[source] io::Error),
    #[error("sendmail_failed: {0}")]
    Failed(String),
    #[error("sendmail_timeout: no exit after {0:?}")]
    Timeout(Duration),
    #[error("sendmail_io: {0}")]
    Io(#[from] io::Error),
}

/// Pipes `message` into the configured MTA binary and waits for it to exit.
pub async fn send_via_sendmail(
    message: &MimeMessage,
    config: &SendmailConfig,
) -> Result<(), SendmailError> {
    info!(
        "Handing {} byte message to {}",
        message.len(),
        config.path.display()
    );

    let mut child = spawn(&config.path)?;
    let mut stdin = child.stdin.take().ok_or_else(|| {
        SendmailError::Unavailable(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "stdin of sendmail was not captured",
        ))
    })?;

    let bytes = message.as_bytes();
    let feed = async move {
        stdin.write_all(bytes).await?;
        // dropping stdin afterwards closes the pipe
        stdin.shutdown().await
    };

    // Dropping the child on timeout kills it
    let (fed, output) = timeout(config.timeout, async {
        tokio::join!(feed, child.wait_with_output())
    })
    .await
    .map_err(|_| SendmailError::Timeout(config.timeout))?;

    let output = output?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SendmailError::Failed(diagnostic(
            stderr.trim(),
            output.status,
        )));
    }
    fed?;

    debug!("sendmail exited with {}", output.status);
    Ok(())
}

fn spawn(path: &Path) -> Result<tokio::process::Child, SendmailError> {
    Command::new(path)
        .args(["-t", "-i"])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(SendmailError::Unavailable)
}

fn diagnostic(stderr: &str, status: ExitStatus) -> String {
    if !stderr.is_empty() {
        return stderr.to_owned();
    }

    match status.code() {
        Some(code) => format!("exit_code_{}", code),
        None => format!("terminated: {}", status),
    }
}
