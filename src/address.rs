//! Email address validation and mailbox formatting.

/// Checks whether a value looks like a valid email address.
///
/// The check is deliberately light, aligned with the "looks like an email
/// address" bar of the settings layer: a non-empty local part, a single `@`,
/// a dotted domain, and no whitespace or control characters.
///
/// # Examples
///
/// ```rust
/// assert!(mailfix::is_email("noreply@example.com"));
/// assert!(!mailfix::is_email("not-an-email"));
/// assert!(!mailfix::is_email("two words@example.com"));
/// ```
pub fn is_email(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Strips header-breaking characters from a display name.
///
/// Removes control characters plus `<`, `>` and `"`, then collapses runs of
/// whitespace into single spaces. Returns an empty string when nothing
/// usable remains.
pub fn sanitize_display_name(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>' | '"'))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Formats an address with an optional display name as an RFC 5322 mailbox.
///
/// # Examples
///
/// ```rust
/// assert_eq!(
///     mailfix::format_mailbox("noreply@example.com", "Example Co"),
///     "Example Co <noreply@example.com>"
/// );
/// assert_eq!(
///     mailfix::format_mailbox("noreply@example.com", ""),
///     "noreply@example.com"
/// );
/// ```
pub fn format_mailbox(address: &str, name: &str) -> String {
    if name.is_empty() {
        address.to_string()
    } else {
        format!("{name} <{address}>")
    }
}
