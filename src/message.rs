//! RFC 5322 message decoding.
//!
//! Walks every MIME part of a fetched message and returns the HTML parts as
//! text, with transfer encoding and charset already applied. A single-part
//! message is treated as its own only part.
//!
//! Charset handling:
//! - The declared `charset` parameter is looked up with WHATWG label rules.
//! - Undeclared or unknown charsets fall back to UTF-8.
//! - Malformed sequences are replaced, never rejected.
//!
//! A part whose transfer encoding cannot be undone is reported as a
//! [`PartFailure`]; the remaining parts are still returned.

use encoding_rs::{Encoding, UTF_8};
use mailparse::{ParsedMail, parse_mail};
use tracing::{debug, trace};

use crate::errors::{Result, UnsubscriberError};

const HTML_MIME: &str = "text/html";

/// One decoded `text/html` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlPart {
    /// Position among the message's leaf parts (0-based, depth-first).
    pub index: usize,
    /// Encoding actually used for decoding.
    pub charset: &'static str,
    pub html: String,
    /// Malformed byte sequences were replaced.
    pub had_replacements: bool,
}

/// A single part that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartFailure {
    pub index: usize,
    pub reason: String,
}

/// HTML content of a message plus any per-part failures.
#[derive(Debug, Clone, Default)]
pub struct DecodedMessage {
    pub html_parts: Vec<HtmlPart>,
    pub failures: Vec<PartFailure>,
}

/// Decode all HTML parts of a raw message.
pub fn decode_html_parts(message_id: u32, raw: &[u8]) -> Result<DecodedMessage> {
    let mail = parse_mail(raw)
        .map_err(|e| UnsubscriberError::message_parse(message_id, e.to_string()))?;

    let mut decoded = DecodedMessage::default();
    let mut next_index = 0usize;
    walk(&mail, &mut next_index, &mut decoded);

    trace!(
        "Message {}: {} HTML part(s), {} undecodable",
        message_id,
        decoded.html_parts.len(),
        decoded.failures.len()
    );
    Ok(decoded)
}

fn walk(part: &ParsedMail<'_>, next_index: &mut usize, out: &mut DecodedMessage) {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            walk(sub, next_index, out);
        }
        return;
    }

    let index = *next_index;
    *next_index += 1;

    if !part.ctype.mimetype.eq_ignore_ascii_case(HTML_MIME) {
        return;
    }

    match part.get_body_raw() {
        Ok(bytes) => {
            let declared = part.ctype.params.get("charset").map(String::as_str);
            let (html, encoding, had_replacements) = decode_text(&bytes, declared);
            out.html_parts.push(HtmlPart {
                index,
                charset: encoding.name(),
                html,
                had_replacements,
            });
        }
        Err(e) => {
            debug!("Part {} could not be decoded: {}", index, e);
            out.failures.push(PartFailure {
                index,
                reason: e.to_string(),
            });
        }
    }
}

/// Decode bytes using the declared charset label, falling back to UTF-8.
pub fn decode_text(bytes: &[u8], declared: Option<&str>) -> (String, &'static Encoding, bool) {
    let encoding = declared
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8);
    let (text, used, had_errors) = encoding.decode(bytes);
    (text.into_owned(), used, had_errors)
}
