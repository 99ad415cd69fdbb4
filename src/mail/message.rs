//! Builds the raw email for one application.
//!
//! Everything is CRLF terminated so the same bytes work for the SMTP `DATA`
//! phase and for piping into `sendmail`.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use rand::Rng;

use crate::form::{latin1, DecodedForm, FilePart};
use crate::mail::Envelope;
use crate::time::{email_date, epoch_millis};

const CRLF: &str = "\r\n";
const BASE64_LINE_LENGTH: usize = 76;

pub const SUBJECT: &str = "Neue Bewerbung - Maygasse Finance Society";
const INTRO: &str = "Neue Bewerbung über Maygasse Finance Society Website";
const NAME_LABEL: &str = "Name: ";
const CLASS_LABEL: &str = "Klasse: ";
const MOTIVATION_LABEL: &str = "Motivation:";
const MESSAGE_LABEL: &str = "Nachricht:";

/// A complete email, headers included, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeMessage {
    bytes: Vec<u8>,
    boundary: Option<String>,
}

impl MimeMessage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The `multipart/mixed` boundary, if the message has an attachment
    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Builds the application email for `form`, stamped with the current time.
pub fn build(form: &DecodedForm, envelope: &Envelope) -> MimeMessage {
    build_at(form, envelope, Utc::now())
}

/// Same as [`build`] with an explicit clock.
pub fn build_at(
    form: &DecodedForm,
    envelope: &Envelope,
    now: DateTime<Utc>,
) -> MimeMessage {
    let mut out = Vec::new();

    push_line(&mut out, &format!("To: {}", envelope.to));
    push_line(&mut out, &format!("From: {}", envelope.from));
    push_line(&mut out, &format!("Subject: {}", SUBJECT));
    push_line(&mut out, &format!("Date: {}", email_date(&now)));
    push_line(&mut out, "MIME-Version: 1.0");

    let body = text_body(form);

    match form.file("cv") {
        Some(cv) => {
            let boundary = new_boundary(&now);

            push_line(
                &mut out,
                &format!(
                    "Content-Type: multipart/mixed; boundary=\"{}\"",
                    boundary
                ),
            );
            push_line(&mut out, "");

            push_line(&mut out, &format!("--{}", boundary));
            push_text_part(&mut out, &body);

            push_line(&mut out, &format!("--{}", boundary));
            push_attachment(&mut out, cv);

            push_line(&mut out, &format!("--{}--", boundary));

            MimeMessage {
                bytes: out,
                boundary: Some(boundary),
            }
        }
        None => {
            push_text_part(&mut out, &body);

            MimeMessage {
                bytes: out,
                boundary: None,
            }
        }
    }
}

/// `MFS-<millis>-<random hex>`, never derived from anything the client sent
pub fn new_boundary(now: &DateTime<Utc>) -> String {
    let suffix: u64 = rand::thread_rng().gen();
    format!("MFS-{}-{:x}", epoch_millis(now), suffix)
}

/// Field values were decoded one char per byte, so they are turned back
/// into their original bytes here; only the labels are ours to encode.
fn text_body(form: &DecodedForm) -> Vec<u8> {
    let field = |name: &str| latin1::encode(form.field(name).unwrap_or(""));

    let mut lines: Vec<Vec<u8>> = Vec::new();
    lines.push(INTRO.as_bytes().to_vec());
    lines.push(Vec::new());
    lines.push([NAME_LABEL.as_bytes(), &field("name")[..]].concat());
    lines.push([CLASS_LABEL.as_bytes(), &field("klasse")[..]].concat());
    lines.push(Vec::new());
    lines.push(MOTIVATION_LABEL.as_bytes().to_vec());
    lines.push(field("motivation"));
    lines.push(Vec::new());
    lines.push(MESSAGE_LABEL.as_bytes().to_vec());
    lines.push(field("nachricht"));

    lines.join(CRLF.as_bytes())
}

fn push_text_part(out: &mut Vec<u8>, body: &[u8]) {
    push_line(out, "Content-Type: text/plain; charset=utf-8");
    push_line(out, "Content-Transfer-Encoding: base64");
    push_line(out, "");
    push_base64(out, body);
}

fn push_attachment(out: &mut Vec<u8>, file: &FilePart) {
    let filename = header_safe(&file.filename);
    let content_type = header_safe(&file.content_type);

    out.extend_from_slice(b"Content-Type: ");
    out.extend_from_slice(&content_type);
    out.extend_from_slice(b"; name=\"");
    out.extend_from_slice(&filename);
    out.extend_from_slice(b"\"\r\n");

    out.extend_from_slice(b"Content-Disposition: attachment; filename=\"");
    out.extend_from_slice(&filename);
    out.extend_from_slice(b"\"\r\n");

    push_line(out, "Content-Transfer-Encoding: base64");
    push_line(out, "");
    push_base64(out, &file.data);
}

fn push_line(out: &mut Vec<u8>, line: &str) {
    out.extend_from_slice(line.as_bytes());
    out.extend_from_slice(CRLF.as_bytes());
}

fn push_base64(out: &mut Vec<u8>, data: &[u8]) {
    let encoded = general_purpose::STANDARD.encode(data);
    for chunk in encoded.as_bytes().chunks(BASE64_LINE_LENGTH) {
        out.extend_from_slice(chunk);
        out.extend_from_slice(CRLF.as_bytes());
    }
}

/// Original bytes of a client-supplied value, minus anything that could end
/// the quoted string or the header line.
fn header_safe(value: &str) -> Vec<u8> {
    latin1::encode(value)
        .into_iter()
        .filter(|b| !matches!(b, b'"' | b'\r' | b'\n'))
        .collect()
}
