use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt,
    BufReader,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, error, info};

use crate::config::EmailConfig;
use crate::mail::MimeMessage;
use crate::smtp::reply::{Reply, ReplyBuilder};
use crate::smtp::state_machine::{State, Transaction};
use crate::smtp::SmtpError;

const MAX_LINE_LEN: u64 = 4096;

pub trait AsyncReadAndWrite: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncReadAndWrite for T {}

pub type BoxedAsyncReadAndWrite = Box<dyn AsyncReadAndWrite>;

/// Delivers `message` to `recipient` through the server in `config`.
///
/// Host, user and password must all be set; nothing is opened otherwise.
/// The connection is closed whatever the outcome.
pub async fn send_via_smtp(
    message: &MimeMessage,
    config: &EmailConfig,
    recipient: &str,
) -> Result<(), SmtpError> {
    let (Some(host), Some(user), Some(password)) = (
        present(&config.host),
        present(&config.user),
        present(&config.password),
    ) else {
        return Err(SmtpError::ConfigMissing);
    };

    let hostname = local_hostname();
    let transaction = Transaction {
        hostname: &hostname,
        user,
        password,
        from: &config.from,
        to: recipient,
        message: message.as_bytes(),
    };

    info!(
        "Connecting to {}:{} (tls: {}) to deliver {} bytes",
        host,
        config.port,
        config.secure,
        message.len()
    );
    let stream =
        connect(host, config.port, config.secure, config.timeout).await?;
    let mut session = Session::new(stream, config.timeout);

    let result = session.run(&transaction).await;
    session.close().await;

    if result.is_ok() {
        info!("Message accepted by {}", host);
    }
    result
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

/// Opens the transport, wrapping it in TLS up front when `secure`.
pub async fn connect(
    host: &str,
    port: u16,
    secure: bool,
    wait: Duration,
) -> Result<BoxedAsyncReadAndWrite, SmtpError> {
    let tcp = timeout(wait, TcpStream::connect((host, port)))
        .await
        .map_err(|_| SmtpError::Timeout("connect"))??;

    if !secure {
        return Ok(Box::new(tcp));
    }

    let tls = tls_handshake(host, tcp, &tls_connector(), wait).await?;
    Ok(Box::new(tls))
}

/// Wraps an open stream in TLS, verifying `host` against whatever roots
/// `connector` trusts.
pub async fn tls_handshake<S>(
    host: &str,
    stream: S,
    connector: &TlsConnector,
    wait: Duration,
) -> Result<TlsStream<S>, SmtpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let server_name = rustls::pki_types::ServerName::try_from(host.to_owned())
        .map_err(|e| SmtpError::Tls(format!("invalid server name: {}", e)))?;

    timeout(wait, connector.connect(server_name, stream))
        .await
        .map_err(|_| SmtpError::Timeout("tls handshake"))?
        .map_err(|e| SmtpError::Tls(format!("handshake failed: {}", e)))
}

fn tls_connector() -> TlsConnector {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

fn local_hostname() -> String {
    let hostname = gethostname::gethostname().to_string_lossy().to_string();
    if hostname.is_empty() {
        "localhost".to_owned()
    } else {
        hostname
    }
}

/// One connection worth of SMTP conversation.
pub struct Session<S> {
    stream: BufReader<S>,
    timeout: Duration,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    pub fn new(stream: S, timeout: Duration) -> Self {
        Session {
            stream: BufReader::new(stream),
            timeout,
        }
    }

    /// Walks every state of the transaction, stopping at the first reply
    /// that is not accepted.
    pub async fn run(
        &mut self,
        transaction: &Transaction<'_>,
    ) -> Result<(), SmtpError> {
        let mut state = State::FIRST;
        loop {
            self.send_and_expect(state, transaction).await?;
            match state.next() {
                Some(next) => state = next,
                None => return Ok(()),
            }
        }
    }

    async fn send_and_expect(
        &mut self,
        state: State,
        transaction: &Transaction<'_>,
    ) -> Result<Reply, SmtpError> {
        if let Some(request) = state.request(transaction) {
            debug!("> {}", state.describe(transaction));
            self.write(&request, state).await?;
        }

        let reply = self.read_reply(state).await?;
        debug!("< {}", reply);

        if state.accepts().contains(&reply.code) {
            Ok(reply)
        } else {
            error!(
                "{:?} answered with {}, expected one of {:?}",
                state,
                reply,
                state.accepts()
            );
            Err(SmtpError::UnexpectedReply { state, reply })
        }
    }

    async fn write(
        &mut self,
        bytes: &[u8],
        state: State,
    ) -> Result<(), SmtpError> {
        let stream = self.stream.get_mut();
        timeout(self.timeout, async {
            stream.write_all(bytes).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| SmtpError::Timeout(state.name()))??;

        Ok(())
    }

    /// Reads lines until the reply is complete, however the server chunks
    /// its writes.
    pub async fn read_reply(
        &mut self,
        state: State,
    ) -> Result<Reply, SmtpError> {
        let mut builder = ReplyBuilder::default();
        loop {
            let line = timeout(self.timeout, self.read_line())
                .await
                .map_err(|_| SmtpError::Timeout(state.name()))??;

            if let Some(reply) =
                builder.push(&line).map_err(SmtpError::MalformedReply)?
            {
                return Ok(reply);
            }
        }
    }

    async fn read_line(&mut self) -> Result<String, SmtpError> {
        let mut buf = Vec::new();
        let read = (&mut self.stream)
            .take(MAX_LINE_LEN)
            .read_until(b'\n', &mut buf)
            .await?;

        if read == 0 {
            return Err(SmtpError::ConnectionClosed);
        }
        if !buf.ends_with(b"\n") {
            if read as u64 >= MAX_LINE_LEN {
                return Err(SmtpError::MalformedReply(format!(
                    "line longer than {} bytes",
                    MAX_LINE_LEN
                )));
            }
            return Err(SmtpError::ConnectionClosed);
        }

        let line = String::from_utf8_lossy(&buf);
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }

    /// Shuts the write half down; the socket itself goes with `self`.
    pub async fn close(mut self) {
        let wait = self.timeout;
        if timeout(wait, self.stream.get_mut().shutdown()).await.is_err() {
            debug!("Timed out shutting down SMTP connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn transaction() -> Transaction<'static> {
        Transaction {
            hostname: "client.local",
            user: "user",
            password: "pass",
            from: "from@example.org",
            to: "to@example.org",
            message: b"Subject: hi\r\n\r\nbody\r\n",
        }
    }

    #[tokio::test]
    async fn reply_split_across_reads() {
        let (client, mut server) = duplex(64);
        let mut session = Session::new(client, Duration::from_secs(1));

        tokio::spawn(async move {
            server.write_all(b"250-first\r\n25").await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            server.write_all(b"0-second\r\n250 last\r\n").await.unwrap();
        });

        let reply = session.read_reply(State::Ehlo).await.unwrap();
        assert_eq!(reply.code, 250);
        assert_eq!(reply.lines, vec!["first", "second", "last"]);
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let (client, _server) = duplex(64);
        let mut session = Session::new(client, Duration::from_millis(50));

        let err = session.read_reply(State::Connected).await.unwrap_err();
        assert!(matches!(err, SmtpError::Timeout("greeting")));
    }

    #[tokio::test]
    async fn closed_connection() {
        let (client, server) = duplex(64);
        drop(server);
        let mut session = Session::new(client, Duration::from_secs(1));

        let err = session.run(&transaction()).await.unwrap_err();
        assert!(matches!(err, SmtpError::ConnectionClosed));
    }

    #[tokio::test]
    async fn rejected_greeting_stops_everything() {
        let (client, mut server) = duplex(1024);
        let mut session = Session::new(client, Duration::from_secs(1));

        server.write_all(b"554 go away\r\n").await.unwrap();
        let err = session.run(&transaction()).await.unwrap_err();
        assert_eq!(err.to_string(), "smtp_unexpected_554");

        drop(session);
        let mut sent = Vec::new();
        server.read_to_end(&mut sent).await.unwrap();
        assert!(sent.is_empty(), "client sent {:?}", sent);
    }

    #[tokio::test]
    async fn config_missing_before_connecting() {
        let message = crate::mail::message::build(
            &crate::form::DecodedForm::default(),
            &crate::mail::Envelope {
                from: "a@example.org".to_owned(),
                to: "b@example.org".to_owned(),
            },
        );
        let config = EmailConfig {
            host: Some("127.0.0.1".to_owned()),
            user: Some("user".to_owned()),
            password: Some(String::new()),
            ..EmailConfig::default()
        };

        let err = send_via_smtp(&message, &config, "b@example.org")
            .await
            .unwrap_err();
        assert!(matches!(err, SmtpError::ConfigMissing));
        assert_eq!(err.to_string(), "smtp_config_missing");
    }
}
