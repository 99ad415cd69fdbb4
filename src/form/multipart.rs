//! Lenient in-memory `multipart/form-data` decoder.
//!
//! Malformed parts are dropped rather than rejected; whoever uses the result
//! checks for the fields it needs.

use memchr::memmem;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use super::{latin1, DecodedForm, FilePart};

const CRLF: &[u8] = b"\r\n";
const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const DEFAULT_FILENAME: &str = "attachment";

// `name` has to be its own parameter, so `filename="..."` never matches
static NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|[;\s])name="([^"]+)""#).expect("name regex is valid")
});

static FILENAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|[;\s])filename="([^"]*)""#)
        .expect("filename regex is valid")
});

/// Decodes `buffer` into text fields and file parts delimited by `boundary`.
///
/// An empty buffer, or one where the boundary never shows up, decodes to an
/// empty form. When two parts share a name the last one wins.
pub fn decode(buffer: &[u8], boundary: &str) -> DecodedForm {
    let mut form = DecodedForm::default();
    if boundary.is_empty() {
        return form;
    }

    let delimiter = format!("--{}", boundary);
    let segments = split_on(buffer, delimiter.as_bytes());

    // Preamble and epilogue (closing `--` included) carry no parts
    if segments.len() > 2 {
        for segment in &segments[1..segments.len() - 1] {
            decode_part(segment, &mut form);
        }
    }

    debug!(
        "Decoded multipart body: {} field(s), {} file(s)",
        form.fields.len(),
        form.files.len()
    );

    form
}

fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut segments = Vec::new();
    let mut start = 0;

    for index in memmem::find_iter(haystack, needle) {
        segments.push(&haystack[start..index]);
        start = index + needle.len();
    }
    segments.push(&haystack[start..]);

    segments
}

fn decode_part(segment: &[u8], form: &mut DecodedForm) {
    let part = segment.strip_prefix(CRLF).unwrap_or(segment);

    let Some(separator) = memmem::find(part, HEADER_SEPARATOR) else {
        trace!("Dropping part without header separator");
        return;
    };

    let headers = latin1::decode(&part[..separator]);
    let content = &part[separator + HEADER_SEPARATOR.len()..];
    let content = content.strip_suffix(CRLF).unwrap_or(content);

    let Some(disposition) = header_value(&headers, "content-disposition")
    else {
        trace!("Dropping part without Content-Disposition");
        return;
    };

    let Some(name) = NAME_REGEX
        .captures(disposition)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_owned())
    else {
        trace!("Dropping part without a name: {}", disposition);
        return;
    };

    let filename = FILENAME_REGEX
        .captures(disposition)
        .and_then(|captures| captures.get(1))
        .map(|filename| filename.as_str())
        .filter(|filename| !filename.is_empty());

    match filename {
        Some(filename) => {
            let content_type = header_value(&headers, "content-type")
                .filter(|value| !value.is_empty())
                .unwrap_or(DEFAULT_CONTENT_TYPE);

            form.files.insert(
                name.clone(),
                FilePart {
                    field_name: name,
                    filename: basename(filename).to_owned(),
                    content_type: content_type.to_owned(),
                    data: content.to_vec(),
                },
            );
        }
        None => {
            form.fields.insert(name, latin1::decode(content));
        }
    }
}

/// Value of the first header line called `name`, matched case-insensitively.
fn header_value<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    headers.split("\r\n").find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

/// Last path component, whichever separator style the client used.
fn basename(filename: &str) -> &str {
    let name = filename
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("");

    if name.is_empty() {
        DEFAULT_FILENAME
    } else {
        name
    }
}
