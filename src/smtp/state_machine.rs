//! The client side of one mail transaction as a strictly linear sequence of
//! states. Every state sends (at most) one command and accepts a fixed set
//! of reply codes; anything else ends the session.

use base64::{engine::general_purpose, Engine as _};
use memchr::memmem;
use once_cell::sync::Lazy;
use std::borrow::Cow;

/// Everything the conversation needs to know about the message
pub struct Transaction<'a> {
    pub hostname: &'a str,
    pub user: &'a str,
    pub password: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    pub message: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Connected,
    Ehlo,
    AuthLogin,
    Username,
    Password,
    MailFrom,
    RcptTo,
    Data,
    Payload,
    Quit,
}

impl State {
    pub const FIRST: State = State::Connected;

    pub fn next(self) -> Option<State> {
        match self {
            State::Connected => Some(State::Ehlo),
            State::Ehlo => Some(State::AuthLogin),
            State::AuthLogin => Some(State::Username),
            State::Username => Some(State::Password),
            State::Password => Some(State::MailFrom),
            State::MailFrom => Some(State::RcptTo),
            State::RcptTo => Some(State::Data),
            State::Data => Some(State::Payload),
            State::Payload => Some(State::Quit),
            State::Quit => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            State::Connected => "greeting",
            State::Ehlo => "EHLO",
            State::AuthLogin => "AUTH LOGIN",
            State::Username => "AUTH username",
            State::Password => "AUTH password",
            State::MailFrom => "MAIL FROM",
            State::RcptTo => "RCPT TO",
            State::Data => "DATA",
            State::Payload => "message payload",
            State::Quit => "QUIT",
        }
    }

    /// Reply codes that let the session move on
    pub fn accepts(self) -> &'static [u16] {
        match self {
            State::Connected => &[220],
            State::Ehlo => &[250],
            State::AuthLogin | State::Username => &[334],
            State::Password => &[235],
            State::MailFrom => &[250],
            State::RcptTo => &[250, 251],
            State::Data => &[354],
            State::Payload => &[250],
            State::Quit => &[221],
        }
    }

    /// Bytes to send on entering the state. The greeting is only read.
    pub fn request(self, transaction: &Transaction) -> Option<Vec<u8>> {
        let line = match self {
            State::Connected => return None,
            State::Ehlo => format!("EHLO {}", transaction.hostname),
            State::AuthLogin => "AUTH LOGIN".to_owned(),
            State::Username => general_purpose::STANDARD.encode(transaction.user),
            State::Password => {
                general_purpose::STANDARD.encode(transaction.password)
            }
            State::MailFrom => format!("MAIL FROM:<{}>", transaction.from),
            State::RcptTo => format!("RCPT TO:<{}>", transaction.to),
            State::Data => "DATA".to_owned(),
            State::Payload => return Some(payload(transaction.message)),
            State::Quit => "QUIT".to_owned(),
        };

        let mut bytes = line.into_bytes();
        bytes.extend_from_slice(b"\r\n");
        Some(bytes)
    }

    /// What goes into the debug log for the request of this state
    pub fn describe(self, transaction: &Transaction) -> Cow<'static, str> {
        match self {
            State::Connected => Cow::Borrowed("<greeting>"),
            State::Username | State::Password => Cow::Borrowed("<redacted>"),
            State::Payload => Cow::Owned(format!(
                "<message, {} bytes>",
                transaction.message.len()
            )),
            _ => self
                .request(transaction)
                .map(|bytes| {
                    Cow::Owned(String::from_utf8_lossy(&bytes).trim_end().to_owned())
                })
                .unwrap_or(Cow::Borrowed("")),
        }
    }
}

/// Message bytes as they go after `DATA`: dot-stuffed, ending in CRLF and
/// the terminating `.` line.
fn payload(message: &[u8]) -> Vec<u8> {
    let mut bytes = dot_stuff(message).into_owned();
    if !bytes.is_empty() && !bytes.ends_with(b"\r\n") {
        bytes.extend_from_slice(b"\r\n");
    }
    bytes.extend_from_slice(b".\r\n");
    bytes
}

/// Doubles the leading dot of every line.
fn dot_stuff(data: &[u8]) -> Cow<'_, [u8]> {
    static LFDOT: Lazy<memmem::Finder<'static>> =
        Lazy::new(|| memmem::Finder::new("\n."));

    if !data.starts_with(b".") && LFDOT.find(data).is_none() {
        return Cow::Borrowed(data);
    }

    let mut stuffed = Vec::with_capacity(data.len() + 16);
    if data.starts_with(b".") {
        stuffed.push(b'.');
    }
    let mut last = 0;
    for i in LFDOT.find_iter(data) {
        stuffed.extend_from_slice(&data[last..=i]);
        stuffed.push(b'.');
        last = i + 1;
    }
    stuffed.extend_from_slice(&data[last..]);

    Cow::Owned(stuffed)
}
