//! Test doubles shared by the integration tests: a one-shot SMTP server that
//! records the conversation, and throwaway `sendmail` stand-ins.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::rustls::{self, RootCertStore};
use tokio_rustls::{TlsAcceptor, TlsConnector};

/// What the client sent during one session
#[derive(Debug, Default)]
pub struct Captured {
    pub commands: Vec<String>,
    pub data: Vec<u8>,
}

impl Captured {
    pub fn data_text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SinkOptions {
    /// Answer commands starting with this prefix with this code
    pub reject: Option<(&'static str, u16)>,
    pub rcpt_code: u16,
}

impl Default for SinkOptions {
    fn default() -> Self {
        SinkOptions {
            reject: None,
            rcpt_code: 250,
        }
    }
}

#[derive(Debug, PartialEq)]
enum State {
    Connected,
    AuthUsername,
    AuthPassword,
    Data,
}

/// Accepts a single connection and plays the server side of it.
pub async fn spawn_sink(options: SinkOptions) -> (SocketAddr, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        serve(&mut socket, options).await
    });

    (addr, handle)
}

/// Same as [`spawn_sink`], behind TLS with a fresh self-signed certificate
/// for `localhost`. The returned connector trusts that certificate only.
pub async fn spawn_tls_sink(
    options: SinkOptions,
) -> (SocketAddr, TlsConnector, JoinHandle<Captured>) {
    let generated =
        rcgen::generate_simple_self_signed(vec!["localhost".to_owned()]).unwrap();
    let cert: CertificateDer<'static> = generated.cert.der().clone();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        generated.key_pair.serialize_der(),
    ));

    let server_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert.clone()], key)
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(server_config));

    let mut roots = RootCertStore::empty();
    roots.add(cert).unwrap();
    let client_config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        match acceptor.accept(socket).await {
            Ok(mut tls) => serve(&mut tls, options).await,
            // the client walked away during the handshake
            Err(_) => Captured::default(),
        }
    });

    (addr, TlsConnector::from(Arc::new(client_config)), handle)
}

async fn serve<S>(stream: &mut S, options: SinkOptions) -> Captured
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut captured = Captured::default();
    let mut stream = BufReader::new(stream);
    let mut state = State::Connected;

    send(&mut stream, "220 sink ESMTP ready").await;

    loop {
        let mut line = String::new();
        if stream.read_line(&mut line).await.unwrap_or(0) == 0 {
            break;
        }

        if state == State::Data {
            if line == ".\r\n" {
                state = State::Connected;
                send(&mut stream, "250 queued").await;
            } else {
                captured.data.extend_from_slice(line.as_bytes());
            }
            continue;
        }

        let command = line.trim_end().to_owned();
        captured.commands.push(command.clone());

        if let Some((prefix, code)) = options.reject {
            if command.starts_with(prefix) {
                send(&mut stream, &format!("{} rejected", code)).await;
                continue;
            }
        }

        match state {
            State::AuthUsername => {
                state = State::AuthPassword;
                send(&mut stream, "334 UGFzc3dvcmQ6").await;
                continue;
            }
            State::AuthPassword => {
                state = State::Connected;
                send(&mut stream, "235 authenticated").await;
                continue;
            }
            _ => {}
        }

        match &command.to_ascii_uppercase()[..4.min(command.len())] {
            "EHLO" => {
                // split over two writes to exercise reply reassembly
                send_raw(&mut stream, b"250-sink greets you\r\n250-AUTH LOG").await;
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                send(&mut stream, "IN\r\n250 8BITMIME").await;
            }
            "AUTH" => {
                state = State::AuthUsername;
                send(&mut stream, "334 VXNlcm5hbWU6").await;
            }
            "MAIL" => send(&mut stream, "250 sender ok").await,
            "RCPT" => {
                send(&mut stream, &format!("{} recipient ok", options.rcpt_code))
                    .await
            }
            "DATA" => {
                state = State::Data;
                send(&mut stream, "354 end with <CRLF>.<CRLF>").await;
            }
            "QUIT" => {
                send(&mut stream, "221 bye").await;
                break;
            }
            _ => send(&mut stream, "500 unknown command").await,
        }
    }

    captured
}

async fn send<S>(stream: &mut BufReader<&mut S>, reply: &str)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_raw(stream, format!("{}\r\n", reply).as_bytes()).await;
}

/// Writes `bytes` as they are, without terminating the line.
async fn send_raw<S>(stream: &mut BufReader<&mut S>, bytes: &[u8])
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let _ = stream.write_all(bytes).await;
    let _ = stream.flush().await;
}

/// Writes an executable `sendmail` stand-in running `body` under `/bin/sh`.
pub fn fake_sendmail(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("sendmail");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .unwrap();
    path
}

/// A `sendmail` stand-in that stores its arguments and the message next to
/// itself, as `args.txt` and `message.eml`.
pub fn capturing_sendmail(dir: &Path) -> PathBuf {
    fake_sendmail(
        dir,
        r#"dir="$(dirname "$0")"
echo "$@" > "$dir/args.txt"
cat > "$dir/message.eml""#,
    )
}
