//! Outgoing message descriptor used throughout the mail pipeline.
//!
//! [`OutgoingMessage`] is created per send attempt by the caller, mutated in
//! place by filters and the override surfaces, and discarded once the send
//! returns. Raw headers are kept as an ordered `Vec` (preserving RFC 5322
//! order and tolerating duplicates) next to the structured sender fields,
//! because the transport may consult either surface.

use uuid::Uuid;

/// The mutable descriptor of a single outgoing email.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// Unique message identifier, generated per send attempt.
    pub message_id: String,

    /// Recipient address, RFC 5322 address format.
    pub to: String,

    /// Email subject.
    pub subject: String,

    /// Structured sender address proposed by the caller, consulted by the
    /// transport independently of any raw `From` header line.
    pub sender_address: String,

    /// Structured sender display name proposed by the caller.
    pub sender_name: String,

    /// Structured reply-to list: `(address, display name)` pairs.
    pub reply_to: Vec<(String, String)>,

    /// Ordered list of raw header lines (case-preserved names, trimmed values).
    headers: Vec<(String, String)>,

    /// Message body after the blank-line separator.
    body: String,
}

impl OutgoingMessage {
    /// Creates a message with no raw headers.
    pub fn new(to: &str, subject: &str, body: &str) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            to: to.to_string(),
            subject: subject.to_string(),
            sender_address: String::new(),
            sender_name: String::new(),
            reply_to: Vec::new(),
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    /// Creates a message from a raw RFC 5322 payload, splitting it into
    /// ordered headers and body. The subject is lifted from the headers
    /// when present.
    pub fn from_raw(to: &str, raw: &str) -> Self {
        let (headers, body) = parse_raw_headers(raw);
        let subject = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Subject"))
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        Self {
            message_id: Uuid::new_v4().to_string(),
            to: to.to_string(),
            subject,
            sender_address: String::new(),
            sender_name: String::new(),
            reply_to: Vec::new(),
            headers,
            body: body.to_string(),
        }
    }

    /// Returns the first header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the number of header lines matching `name` (case-insensitive).
    pub fn header_count(&self, name: &str) -> usize {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .count()
    }

    /// Returns a reference to the ordered header list.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns a mutable reference to the ordered header list.
    pub fn headers_mut(&mut self) -> &mut Vec<(String, String)> {
        &mut self.headers
    }

    /// Appends a header line. Duplicates are allowed here, the caller
    /// surface has no upsert semantics.
    pub fn push_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Removes every header line matching `name` (case-insensitive).
    pub fn remove_headers(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Returns whether the message carries any raw header lines.
    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty()
    }

    /// Returns the message body.
    pub fn body(&self) -> &str {
        &self.body
    }
}

/// Parses a raw email payload into an ordered header list and the content
/// after the blank-line separator.
///
/// Header names are case-preserved, values trimmed. A non-header line before
/// the blank separator ends the header section, so plain-text payloads come
/// back with no headers and an untouched body.
pub fn parse_raw_headers(raw: &str) -> (Vec<(String, String)>, &str) {
    let mut headers = Vec::new();
    let mut pos = 0;

    for line in raw.lines() {
        let end = pos + line.len();
        let consumed = if raw[end..].starts_with("\r\n") {
            end + 2
        } else if raw[end..].starts_with('\n') {
            end + 1
        } else {
            end
        };

        if line.trim().is_empty() {
            pos = consumed;
            break;
        }

        match line.split_once(':') {
            Some((name, value)) => {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
            // Not a header and not blank: the payload has no header section.
            None => break,
        }

        pos = consumed;
    }

    (headers, &raw[pos..])
}
