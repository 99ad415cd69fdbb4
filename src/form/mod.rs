//! # Application form module
//!
//! Turns the raw `multipart/form-data` body of an application submission into
//! a [`DecodedForm`]. The decoder works on bytes; only the parts that end up
//! as text fields are ever turned into strings.

pub mod latin1;
mod multipart;

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

pub use multipart::decode;

static BOUNDARY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i);\s*boundary=(?:"([^"]+)"|([^;\s]+))"#)
        .expect("boundary regex is valid")
});

/// A file upload found in the form, e.g. the applicant's CV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field_name: String,
    /// Basename only, never contains `/` or `\`
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Named text fields and file parts of one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, FilePart>,
}

impl DecodedForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    /// Names of the given required fields/files that are missing or empty.
    pub fn missing<'a>(
        &self,
        fields: &[&'a str],
        files: &[&'a str],
    ) -> Vec<&'a str> {
        let missing_fields = fields
            .iter()
            .filter(|name| self.field(name).map_or(true, str::is_empty));
        let missing_files =
            files.iter().filter(|name| self.file(name).is_none());

        missing_fields.chain(missing_files).copied().collect()
    }
}

/// Extracts the boundary token out of a `multipart/form-data` content type.
///
/// ```
/// # use maygasse_apply::form::boundary_from_content_type;
/// assert_eq!(
///     boundary_from_content_type("multipart/form-data; boundary=abc123"),
///     Some("abc123".to_owned())
/// );
/// assert_eq!(boundary_from_content_type("application/json"), None);
/// ```
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    let captures = BOUNDARY_REGEX.captures(content_type)?;
    let boundary = captures.get(1).or_else(|| captures.get(2))?.as_str();

    if boundary.is_empty() {
        None
    } else {
        Some(boundary.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_unquoted() {
        assert_eq!(
            boundary_from_content_type(
                r#"multipart/form-data; boundary="----WebKitFormBoundaryX""#
            ),
            Some("----WebKitFormBoundaryX".to_owned())
        );
    }

    #[test]
    fn boundary_stops_at_next_parameter() {
        assert_eq!(
            boundary_from_content_type(
                "Multipart/Form-Data; boundary=xyz; charset=utf-8"
            ),
            Some("xyz".to_owned())
        );
    }

    #[test]
    fn boundary_required() {
        assert_eq!(boundary_from_content_type("multipart/form-data"), None);
        assert_eq!(
            boundary_from_content_type("multipart/form-data; boundary="),
            None
        );
        assert_eq!(
            boundary_from_content_type("text/plain; boundary=abc"),
            None
        );
    }

    #[test]
    fn missing_reports_empty_fields_and_absent_files() {
        let mut form = DecodedForm::default();
        form.fields.insert("name".to_owned(), "Ada".to_owned());
        form.fields.insert("klasse".to_owned(), String::new());

        assert_eq!(
            form.missing(&["name", "klasse", "motivation"], &["cv"]),
            vec!["klasse", "motivation", "cv"]
        );
    }
}
