//! SMTP reply framing (RFC 5321, section 4.2).
//!
//! `250-first` continues a reply, `250 last` (or a bare `250`) ends it.

use std::fmt;

/// One complete, possibly multi-line, server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    pub fn text(&self) -> String {
        self.lines.join(" | ")
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ReplyLine<'a> {
    pub code: u16,
    pub is_final: bool,
    pub text: &'a str,
}

/// Parses one line, CRLF already stripped. `None` when the line is not a
/// reply line at all.
pub fn parse_line(line: &str) -> Option<ReplyLine<'_>> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let code = line[..3].parse().ok()?;

    match bytes.get(3) {
        None => Some(ReplyLine {
            code,
            is_final: true,
            text: "",
        }),
        Some(b' ') | Some(b'-') => Some(ReplyLine {
            code,
            is_final: bytes[3] == b' ',
            text: &line[4..],
        }),
        Some(_) => None,
    }
}

/// Collects reply lines until the final one arrives.
#[derive(Debug, Default)]
pub struct ReplyBuilder {
    code: Option<u16>,
    lines: Vec<String>,
}

impl ReplyBuilder {
    /// Feeds the next line. Returns the finished reply once the last line is
    /// seen, `Err` with the offending line if it does not belong here.
    pub fn push(&mut self, line: &str) -> Result<Option<Reply>, String> {
        let parsed = parse_line(line).ok_or_else(|| line.to_owned())?;

        match self.code {
            Some(code) if code != parsed.code => return Err(line.to_owned()),
            _ => self.code = Some(parsed.code),
        }
        self.lines.push(parsed.text.to_owned());

        if parsed.is_final {
            Ok(Some(Reply {
                code: parsed.code,
                lines: std::mem::take(&mut self.lines),
            }))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_parsing() {
        assert_eq!(
            parse_line("220 mail.example.org ESMTP"),
            Some(ReplyLine {
                code: 220,
                is_final: true,
                text: "mail.example.org ESMTP",
            })
        );
        assert_eq!(
            parse_line("250-PIPELINING"),
            Some(ReplyLine {
                code: 250,
                is_final: false,
                text: "PIPELINING",
            })
        );
        assert_eq!(
            parse_line("354"),
            Some(ReplyLine {
                code: 354,
                is_final: true,
                text: "",
            })
        );
        assert_eq!(parse_line("25"), None);
        assert_eq!(parse_line("abc def"), None);
        assert_eq!(parse_line("250+nope"), None);
    }

    #[test]
    fn multi_line_reply() {
        let mut builder = ReplyBuilder::default();

        assert_eq!(builder.push("250-mail.example.org"), Ok(None));
        assert_eq!(builder.push("250-AUTH LOGIN PLAIN"), Ok(None));
        assert_eq!(
            builder.push("250 8BITMIME"),
            Ok(Some(Reply {
                code: 250,
                lines: vec![
                    "mail.example.org".to_owned(),
                    "AUTH LOGIN PLAIN".to_owned(),
                    "8BITMIME".to_owned(),
                ],
            }))
        );
    }

    #[test]
    fn mixed_codes_are_rejected() {
        let mut builder = ReplyBuilder::default();

        assert_eq!(builder.push("250-first"), Ok(None));
        assert_eq!(builder.push("550 second"), Err("550 second".to_owned()));
    }

    #[test]
    fn display() {
        let reply = Reply {
            code: 550,
            lines: vec!["no".to_owned(), "way".to_owned()],
        };

        assert_eq!(reply.to_string(), "550 no | way");
    }
}
