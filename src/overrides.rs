//! Sender-identity override engine.
//!
//! Given the configured override set and a mutable [`OutgoingMessage`],
//! these functions enforce the configured From, Return-Path and Reply-To on
//! the message, exactly once each, no matter what the caller (or any other
//! pipeline participant) already supplied. Every operation is a pure,
//! idempotent transformation and is fail-open: an invalid configured value
//! falls back to the caller's value rather than blocking the send.

use tracing::debug;

use crate::{
    address::{format_mailbox, is_email, sanitize_display_name},
    message::OutgoingMessage,
    settings::{SettingsStore, FROM_EMAIL_KEY, FROM_NAME_KEY, REPLY_TO_KEY},
};

/// The configured override set: a fixed From address, From display name and
/// Reply-To address. Each field may be absent (not configured); address
/// fields that fail validation are treated as absent by the consuming logic.
#[derive(Debug, Clone, Default)]
pub struct OverrideConfig {
    pub from_email: Option<String>,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
}

impl OverrideConfig {
    /// Reads the three override keys from a settings store.
    ///
    /// Fail-open: a store error on any key leaves that override absent.
    pub fn load(store: &dyn SettingsStore) -> Self {
        Self {
            from_email: store.get(FROM_EMAIL_KEY).ok().flatten(),
            from_name: store.get(FROM_NAME_KEY).ok().flatten(),
            reply_to: store.get(REPLY_TO_KEY).ok().flatten(),
        }
    }

    /// Returns the configured From address if present and syntactically valid.
    pub fn valid_from_email(&self) -> Option<&str> {
        self.from_email
            .as_deref()
            .map(str::trim)
            .filter(|v| is_email(v))
    }

    /// Returns the configured Reply-To address if present and syntactically valid.
    pub fn valid_reply_to(&self) -> Option<&str> {
        self.reply_to
            .as_deref()
            .map(str::trim)
            .filter(|v| is_email(v))
    }

    /// Returns the sanitized display name, or an empty string when not
    /// configured or nothing usable remains after sanitization.
    pub fn display_name(&self) -> String {
        self.from_name
            .as_deref()
            .map(sanitize_display_name)
            .unwrap_or_default()
    }
}

/// Resolves the sender address: the configured From address when valid,
/// otherwise the caller's proposal unchanged.
///
/// This is the sender-address surface; it must run after every other
/// participant so that it is the final writer.
pub fn apply_from_override(current_from: &str, config: &OverrideConfig) -> String {
    match config.valid_from_email() {
        Some(from_email) => from_email.to_string(),
        None => current_from.to_string(),
    }
}

/// Resolves the sender display name: the sanitized configured name when
/// non-empty, otherwise the caller's proposal unchanged.
pub fn apply_from_name_override(current_name: &str, config: &OverrideConfig) -> String {
    let name = config.display_name();
    if name.is_empty() {
        current_name.to_string()
    } else {
        name
    }
}

/// Upserts a header line, case-insensitively on the name.
///
/// If one or more lines with `name` exist, the first is replaced in place
/// (preserving its position) and the rest are dropped; otherwise a new line
/// is appended. Afterwards the collection contains exactly one line for
/// `name` and the relative order of all other headers is unchanged.
pub fn merge_header_line(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    let mut seen = false;
    headers.retain_mut(|(key, existing)| {
        if key.eq_ignore_ascii_case(name) {
            if seen {
                return false;
            }
            seen = true;
            *existing = value.to_string();
        }
        true
    });
    if !seen {
        headers.push((name.to_string(), value.to_string()));
    }
}

/// Upserts the `Return-Path` header to the configured From address.
///
/// No-op when `from_email` is absent or invalid. The Return-Path mirrors
/// the From address, address-only, matching the observed behavior of the
/// settings layer rather than a separate bounce address.
pub fn apply_return_path_override(headers: &mut Vec<(String, String)>, config: &OverrideConfig) {
    if let Some(from_email) = config.valid_from_email() {
        merge_header_line(headers, "Return-Path", from_email);
    }
}

/// Enforces the configured Reply-To on a message.
///
/// No-op when `reply_to` is absent or invalid. Otherwise clears the
/// structured reply-to list and every raw `Reply-To` line, then adds exactly
/// one entry equal to the configured address, with the configured display
/// name when present.
pub fn apply_reply_to_override(message: &mut OutgoingMessage, config: &OverrideConfig) {
    let Some(reply_to) = config.valid_reply_to() else {
        return;
    };
    let name = config.display_name();

    message.reply_to.clear();
    message.reply_to.push((reply_to.to_string(), name.clone()));

    message.remove_headers("Reply-To");
    message.push_header("Reply-To", &format_mailbox(reply_to, &name));
}

/// The message-arguments surface: upserts From, Return-Path and Reply-To
/// into the raw header collection (and the structured reply-to list) of a
/// message just before transport handoff.
pub fn apply_header_overrides(message: &mut OutgoingMessage, config: &OverrideConfig) {
    if let Some(from_email) = config.valid_from_email() {
        let mailbox = format_mailbox(from_email, &config.display_name());
        debug!(from = %mailbox, "Enforcing configured sender on header surface");
        merge_header_line(message.headers_mut(), "From", &mailbox);
        apply_return_path_override(message.headers_mut(), config);
    }
    apply_reply_to_override(message, config);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> OverrideConfig {
        OverrideConfig {
            from_email: Some("noreply@example.com".to_string()),
            from_name: Some("Example Co".to_string()),
            reply_to: Some("support@example.com".to_string()),
        }
    }

    #[test]
    fn test_from_override_wins_over_caller() {
        let config = full_config();
        assert_eq!(
            apply_from_override("bob@other.com", &config),
            "noreply@example.com"
        );
    }

    #[test]
    fn test_from_override_falls_back_on_invalid_config() {
        let config = OverrideConfig {
            from_email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert_eq!(apply_from_override("bob@other.com", &config), "bob@other.com");

        let config = OverrideConfig::default();
        assert_eq!(apply_from_override("bob@other.com", &config), "bob@other.com");

        let config = OverrideConfig {
            from_email: Some("".to_string()),
            ..Default::default()
        };
        assert_eq!(apply_from_override("bob@other.com", &config), "bob@other.com");
    }

    #[test]
    fn test_from_name_override() {
        let config = full_config();
        assert_eq!(apply_from_name_override("Bob", &config), "Example Co");

        let config = OverrideConfig::default();
        assert_eq!(apply_from_name_override("Bob", &config), "Bob");

        // A name that sanitizes to nothing falls back
        let config = OverrideConfig {
            from_name: Some("\r\n".to_string()),
            ..Default::default()
        };
        assert_eq!(apply_from_name_override("Bob", &config), "Bob");
    }

    #[test]
    fn test_from_name_override_sanitizes() {
        let config = OverrideConfig {
            from_name: Some("Evil\r\nBcc: x <y@z.com>".to_string()),
            ..Default::default()
        };
        assert_eq!(apply_from_name_override("Bob", &config), "EvilBcc: x y@z.com");
    }

    #[test]
    fn test_merge_header_line_replaces_in_place() {
        let mut headers = vec![
            ("From".to_string(), "bob@other.com".to_string()),
            ("X-Custom".to_string(), "1".to_string()),
        ];

        merge_header_line(&mut headers, "from", "alice@example.com");

        assert_eq!(
            headers,
            vec![
                ("From".to_string(), "alice@example.com".to_string()),
                ("X-Custom".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_merge_header_line_appends_when_missing() {
        let mut headers = vec![("X-Custom".to_string(), "1".to_string())];

        merge_header_line(&mut headers, "Reply-To", "support@example.com");

        assert_eq!(headers.len(), 2);
        assert_eq!(
            headers[1],
            ("Reply-To".to_string(), "support@example.com".to_string())
        );
    }

    #[test]
    fn test_merge_header_line_collapses_duplicates() {
        let mut headers = vec![
            ("Reply-To".to_string(), "a@b.com".to_string()),
            ("X-Custom".to_string(), "1".to_string()),
            ("reply-to".to_string(), "c@d.com".to_string()),
        ];

        merge_header_line(&mut headers, "Reply-To", "support@example.com");

        assert_eq!(
            headers,
            vec![
                ("Reply-To".to_string(), "support@example.com".to_string()),
                ("X-Custom".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_merge_header_line_is_idempotent() {
        let mut once = vec![("X-Custom".to_string(), "1".to_string())];
        merge_header_line(&mut once, "From", "a@b.com");

        let mut twice = once.clone();
        merge_header_line(&mut twice, "From", "a@b.com");

        assert_eq!(once, twice);
    }

    #[test]
    fn test_return_path_override() {
        let config = full_config();
        let mut headers = Vec::new();

        apply_return_path_override(&mut headers, &config);
        apply_return_path_override(&mut headers, &config);

        assert_eq!(
            headers,
            vec![("Return-Path".to_string(), "noreply@example.com".to_string())]
        );
    }

    #[test]
    fn test_return_path_noop_without_valid_from() {
        let config = OverrideConfig {
            from_email: Some("broken".to_string()),
            ..Default::default()
        };
        let mut headers = Vec::new();

        apply_return_path_override(&mut headers, &config);

        assert!(headers.is_empty());
    }

    #[test]
    fn test_reply_to_override_exclusive() {
        let config = full_config();
        let mut message = OutgoingMessage::from_raw(
            "rcpt@example.com",
            "Reply-To: a@b.com\r\nReply-To: c@d.com\r\n\r\nBody",
        );
        message.reply_to.push(("old@b.com".to_string(), String::new()));

        apply_reply_to_override(&mut message, &config);

        assert_eq!(message.header_count("Reply-To"), 1);
        assert_eq!(
            message.header("Reply-To"),
            Some("Example Co <support@example.com>")
        );
        assert_eq!(
            message.reply_to,
            vec![("support@example.com".to_string(), "Example Co".to_string())]
        );
    }

    #[test]
    fn test_reply_to_override_noop_when_unconfigured() {
        let config = OverrideConfig::default();
        let mut message =
            OutgoingMessage::from_raw("rcpt@example.com", "Reply-To: a@b.com\r\n\r\nBody");

        apply_reply_to_override(&mut message, &config);

        assert_eq!(message.header("Reply-To"), Some("a@b.com"));
    }

    #[test]
    fn test_header_overrides_example_scenario() {
        let config = full_config();
        let mut message = OutgoingMessage::from_raw(
            "rcpt@example.com",
            "From: bob@other.com\r\nX-Custom: 1\r\n\r\nBody",
        );

        apply_header_overrides(&mut message, &config);

        let expected: Vec<(String, String)> = [
            ("From", "Example Co <noreply@example.com>"),
            ("X-Custom", "1"),
            ("Return-Path", "noreply@example.com"),
            ("Reply-To", "Example Co <support@example.com>"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(message.headers(), expected.as_slice());
    }

    #[test]
    fn test_header_overrides_invalid_from_scenario() {
        let config = OverrideConfig {
            from_email: Some("not-an-email".to_string()),
            from_name: Some("Example Co".to_string()),
            reply_to: None,
        };
        let mut message =
            OutgoingMessage::from_raw("rcpt@example.com", "From: bob@other.com\r\n\r\nBody");

        apply_header_overrides(&mut message, &config);

        // Fallback: caller's From untouched, no Return-Path injected
        assert_eq!(message.header("From"), Some("bob@other.com"));
        assert_eq!(message.header_count("Return-Path"), 0);
    }

    #[test]
    fn test_header_overrides_idempotent() {
        let config = full_config();
        let mut message = OutgoingMessage::from_raw(
            "rcpt@example.com",
            "From: bob@other.com\r\nX-Custom: 1\r\n\r\nBody",
        );

        apply_header_overrides(&mut message, &config);
        let after_once = message.headers().to_vec();
        apply_header_overrides(&mut message, &config);

        assert_eq!(message.headers(), after_once.as_slice());
    }

    #[test]
    fn test_single_writer_invariant() {
        let config = full_config();
        let mut message = OutgoingMessage::from_raw(
            "rcpt@example.com",
            "From: a@b.com\r\nFrom: c@d.com\r\nReturn-Path: e@f.com\r\nReply-To: g@h.com\r\nReply-To: i@j.com\r\n\r\nBody",
        );

        apply_header_overrides(&mut message, &config);

        for name in ["From", "Return-Path", "Reply-To"] {
            assert_eq!(message.header_count(name), 1, "{name} must appear once");
        }
    }

    #[test]
    fn test_load_from_store() {
        use crate::settings::MemorySettingsStore;

        let store = MemorySettingsStore::new();
        store.set(FROM_EMAIL_KEY, "noreply@example.com").unwrap();
        store.set(REPLY_TO_KEY, "support@example.com").unwrap();

        let config = OverrideConfig::load(&store);

        assert_eq!(config.valid_from_email(), Some("noreply@example.com"));
        assert_eq!(config.valid_reply_to(), Some("support@example.com"));
        assert_eq!(config.from_name, None);
        assert_eq!(config.display_name(), "");
    }
}
