//! Low-level mail transport seam.
//!
//! [`TransportHandoff`] is the transport-native descriptor built immediately
//! before sending. It mirrors the low-level mailer object of the host
//! platform: structured sender and reply-to fields the transport consults
//! with its own precedence, independent of the raw header lines. Its setters
//! are fallible so that a rejected assignment can be caught and swallowed at
//! the point of assignment without aborting the send.

use std::{
    fmt::Display,
    future::Future,
    io,
    path::PathBuf,
    pin::Pin,
    sync::RwLock,
};

use chrono::Utc;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info};

use crate::{address::format_mailbox, message::OutgoingMessage};

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future type for transport operations, enabling object safety.
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = TransportResult<()>> + Send + 'a>>;

/// Errors that can occur at the transport layer.
#[derive(Debug)]
pub enum TransportError {
    /// The transport rejected an address assignment.
    InvalidAddress(String),
    /// An I/O error occurred.
    Io(io::Error),
    /// The transport refused the message.
    Rejected(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            TransportError::Io(e) => write!(f, "I/O error: {e}"),
            TransportError::Rejected(msg) => write!(f, "Message rejected: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        TransportError::Io(e)
    }
}

/// Transport-native message descriptor built just before sending.
#[derive(Debug, Clone)]
pub struct TransportHandoff {
    /// Unique message identifier carried over from the message.
    pub message_id: String,

    /// Recipient address.
    pub to: String,

    /// Email subject.
    pub subject: String,

    /// Native sender address field.
    from_address: String,

    /// Native sender display name field.
    from_name: String,

    /// Native envelope-sender field, consulted for the Return-Path.
    sender: String,

    /// Native reply-to list: `(address, display name)` pairs.
    reply_to: Vec<(String, String)>,

    /// Raw header lines carried over from the message.
    headers: Vec<(String, String)>,

    /// Message body.
    body: String,
}

impl TransportHandoff {
    /// Builds a handoff from a finalized outgoing message, copying both the
    /// structured fields and the raw header lines.
    pub fn from_message(message: &OutgoingMessage) -> Self {
        Self {
            message_id: message.message_id.clone(),
            to: message.to.clone(),
            subject: message.subject.clone(),
            from_address: message.sender_address.clone(),
            from_name: message.sender_name.clone(),
            sender: message.sender_address.clone(),
            reply_to: message.reply_to.clone(),
            headers: message.headers().to_vec(),
            body: message.body().to_string(),
        }
    }

    /// Sets the native From fields and the envelope sender.
    ///
    /// The transport is stricter than the settings layer: it rejects
    /// addresses that fail syntax validation or contain non-ASCII bytes.
    pub fn set_from(&mut self, address: &str, name: &str) -> TransportResult<()> {
        if !crate::address::is_email(address) || !address.is_ascii() {
            return Err(TransportError::InvalidAddress(address.to_string()));
        }
        self.from_address = address.to_string();
        self.from_name = name.to_string();
        self.sender = address.to_string();
        Ok(())
    }

    /// Clears the native reply-to list.
    pub fn clear_reply_tos(&mut self) {
        self.reply_to.clear();
    }

    /// Adds a native reply-to entry. Rejects malformed or non-ASCII addresses.
    pub fn add_reply_to(&mut self, address: &str, name: &str) -> TransportResult<()> {
        if !crate::address::is_email(address) || !address.is_ascii() {
            return Err(TransportError::InvalidAddress(address.to_string()));
        }
        self.reply_to.push((address.to_string(), name.to_string()));
        Ok(())
    }

    /// Returns the native sender address.
    pub fn from_address(&self) -> &str {
        &self.from_address
    }

    /// Returns the native sender display name.
    pub fn from_name(&self) -> &str {
        &self.from_name
    }

    /// Returns the native envelope sender.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Returns the native reply-to list.
    pub fn reply_to(&self) -> &[(String, String)] {
        &self.reply_to
    }

    /// Returns the raw header lines carried over from the message.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the message body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the header block a wire-format transport writes: the raw
    /// header lines, with From, To, Subject, Reply-To and Date synthesized
    /// from the native fields when no raw line carries them.
    pub fn wire_headers(&self) -> Vec<(String, String)> {
        fn has(headers: &[(String, String)], name: &str) -> bool {
            headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
        }

        let mut headers = self.headers.clone();
        if !has(&headers, "From") && !self.from_address.is_empty() {
            headers.push((
                "From".to_string(),
                format_mailbox(&self.from_address, &self.from_name),
            ));
        }
        if !has(&headers, "To") {
            headers.push(("To".to_string(), self.to.clone()));
        }
        if !has(&headers, "Subject") && !self.subject.is_empty() {
            headers.push(("Subject".to_string(), self.subject.clone()));
        }
        if !has(&headers, "Reply-To") {
            if let Some((address, name)) = self.reply_to.first() {
                headers.push(("Reply-To".to_string(), format_mailbox(address, name)));
            }
        }
        if !has(&headers, "Date") {
            headers.push(("Date".to_string(), Utc::now().to_rfc2822()));
        }
        headers
    }

    /// Serializes the message in wire format (headers + blank line + body).
    pub fn serialize(&self) -> String {
        let headers = self.wire_headers();
        let mut raw = String::new();
        for (key, value) in &headers {
            raw.push_str(key);
            raw.push_str(": ");
            raw.push_str(value);
            raw.push_str("\r\n");
        }
        raw.push_str("\r\n");
        raw.push_str(&self.body);
        raw
    }
}

/// Trait for mail transports that deliver finalized messages.
pub trait MailTransport: Send + Sync {
    /// Delivers a message handoff.
    fn send<'a>(&'a self, handoff: &'a TransportHandoff) -> TransportFuture<'a>;

    /// Returns the name of this transport.
    fn name(&self) -> &str;
}

/// Transport that writes each outgoing message to an outbox directory as
/// `{message_id}.eml`.
pub struct FileTransport {
    outbox: PathBuf,
}

impl FileTransport {
    /// Creates a new file transport writing into `outbox`.
    pub fn new(outbox: PathBuf) -> Self {
        info!(outbox = %outbox.display(), "File transport initialized");
        Self { outbox }
    }
}

impl MailTransport for FileTransport {
    fn send<'a>(&'a self, handoff: &'a TransportHandoff) -> TransportFuture<'a> {
        Box::pin(async move {
            fs::create_dir_all(&self.outbox).await?;

            let path = self.outbox.join(format!("{}.eml", handoff.message_id));
            let mut file = File::create(&path).await?;
            file.write_all(handoff.serialize().as_bytes()).await?;
            file.flush().await?;

            debug!(
                message_id = %handoff.message_id,
                to = %handoff.to,
                path = %path.display(),
                "Wrote outgoing message to outbox"
            );
            Ok(())
        })
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// In-memory transport recording every handoff it receives.
///
/// Useful for tests and development; can be armed to reject every send so
/// the failure path can be exercised.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: RwLock<Vec<TransportHandoff>>,
    fail: bool,
}

impl MemoryTransport {
    /// Creates a transport that accepts every message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that rejects every message.
    pub fn failing() -> Self {
        Self {
            sent: RwLock::new(Vec::new()),
            fail: true,
        }
    }

    /// Returns copies of every handoff sent so far.
    pub fn sent(&self) -> Vec<TransportHandoff> {
        self.sent.read().unwrap().clone()
    }

    /// Returns the number of handoffs sent so far.
    pub fn sent_count(&self) -> usize {
        self.sent.read().unwrap().len()
    }
}

impl MailTransport for MemoryTransport {
    fn send<'a>(&'a self, handoff: &'a TransportHandoff) -> TransportFuture<'a> {
        Box::pin(async move {
            if self.fail {
                return Err(TransportError::Rejected(
                    "transport armed to fail".to_string(),
                ));
            }
            self.sent.write().unwrap().push(handoff.clone());
            Ok(())
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}
