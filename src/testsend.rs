//! Interactive test-send path.
//!
//! Composes a diagnostic email describing the current override settings and
//! dispatches it through the normal pipeline, so the operator can verify the
//! configured identity end to end.

use chrono::Utc;

use crate::{
    address::is_email,
    message::OutgoingMessage,
    pipeline::MailPipeline,
    settings::{SettingsStore, FROM_EMAIL_KEY, FROM_NAME_KEY, REPLY_TO_KEY},
};

/// Outcome of a test-send attempt, suitable for direct display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestSendOutcome {
    /// The test email was handed to the transport.
    Sent { recipient: String },
    /// The supplied recipient is not a valid email address.
    InvalidRecipient,
    /// The transport refused the message.
    Failed { reason: String },
}

impl TestSendOutcome {
    /// Returns the user-visible message for this outcome.
    pub fn message(&self) -> String {
        match self {
            TestSendOutcome::Sent { recipient } => format!(
                "Test email sent successfully to {recipient}. Check your inbox and spam folder."
            ),
            TestSendOutcome::InvalidRecipient => {
                "Please enter a valid recipient email address.".to_string()
            }
            TestSendOutcome::Failed { reason } => {
                format!("Failed to send test email: {reason}")
            }
        }
    }
}

/// Sends a test email to `recipient` through the given pipeline.
///
/// The body lists the three currently configured override values as read
/// from the settings store, so the received message documents the settings
/// that produced it.
pub async fn send_test_email(
    pipeline: &MailPipeline,
    store: &dyn SettingsStore,
    recipient: &str,
    site_name: &str,
) -> TestSendOutcome {
    if !is_email(recipient) {
        return TestSendOutcome::InvalidRecipient;
    }

    let from_email = store.get_or(FROM_EMAIL_KEY, "(unset)");
    let from_name = store.get_or(FROM_NAME_KEY, "(unset)");
    let reply_to = store.get_or(REPLY_TO_KEY, "(unset)");

    let subject = format!("Test email from {site_name}");
    let body = format!(
        "This is a test email from {site_name}.\r\n\
         \r\n\
         Sent at: {}\r\n\
         \r\n\
         Email settings:\r\n\
         - From email: {from_email}\r\n\
         - From name: {from_name}\r\n\
         - Reply-To: {reply_to}\r\n\
         \r\n\
         If you received this email, your sender settings are working correctly.\r\n",
        Utc::now().to_rfc2822()
    );

    let message = OutgoingMessage::new(recipient, &subject, &body);
    match pipeline.send(message).await {
        Ok(()) => TestSendOutcome::Sent {
            recipient: recipient.to_string(),
        },
        Err(e) => TestSendOutcome::Failed {
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        settings::MemorySettingsStore,
        transport::MemoryTransport,
    };

    fn store_with_settings() -> Arc<MemorySettingsStore> {
        let store = MemorySettingsStore::new();
        store.set(FROM_EMAIL_KEY, "noreply@example.com").unwrap();
        store.set(FROM_NAME_KEY, "Example Co").unwrap();
        store.set(REPLY_TO_KEY, "support@example.com").unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_send_test_email_dispatches_with_overrides() {
        let store = store_with_settings();
        let transport = Arc::new(MemoryTransport::new());
        let pipeline = MailPipeline::new(store.clone(), transport.clone());

        let outcome =
            send_test_email(&pipeline, store.as_ref(), "operator@example.com", "My Site").await;

        assert_eq!(
            outcome,
            TestSendOutcome::Sent {
                recipient: "operator@example.com".to_string()
            }
        );

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "operator@example.com");
        assert_eq!(sent[0].from_address(), "noreply@example.com");
        assert!(sent[0].subject.contains("My Site"));
        assert!(sent[0].body().contains("- From email: noreply@example.com"));
        assert!(sent[0].body().contains("- Reply-To: support@example.com"));
    }

    #[tokio::test]
    async fn test_send_test_email_rejects_invalid_recipient() {
        let store = store_with_settings();
        let transport = Arc::new(MemoryTransport::new());
        let pipeline = MailPipeline::new(store.clone(), transport.clone());

        let outcome = send_test_email(&pipeline, store.as_ref(), "nope", "My Site").await;

        assert_eq!(outcome, TestSendOutcome::InvalidRecipient);
        assert_eq!(transport.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_send_test_email_reports_delivery_failure() {
        let store = store_with_settings();
        let transport = Arc::new(MemoryTransport::failing());
        let pipeline = MailPipeline::new(store.clone(), transport);

        let outcome =
            send_test_email(&pipeline, store.as_ref(), "operator@example.com", "My Site").await;

        match outcome {
            TestSendOutcome::Failed { reason } => {
                assert!(reason.contains("transport armed to fail"));
            }
            other => panic!("Expected failure outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_test_email_reports_unset_settings() {
        let store = Arc::new(MemorySettingsStore::new());
        let transport = Arc::new(MemoryTransport::new());
        let pipeline = MailPipeline::new(store.clone(), transport.clone());

        let outcome =
            send_test_email(&pipeline, store.as_ref(), "operator@example.com", "My Site").await;

        assert!(matches!(outcome, TestSendOutcome::Sent { .. }));
        assert!(transport.sent()[0].body().contains("- From email: (unset)"));
    }

    #[test]
    fn test_outcome_messages() {
        assert!(TestSendOutcome::Sent {
            recipient: "a@b.com".to_string()
        }
        .message()
        .contains("a@b.com"));
        assert_eq!(
            TestSendOutcome::InvalidRecipient.message(),
            "Please enter a valid recipient email address."
        );
        assert!(TestSendOutcome::Failed {
            reason: "busy".to_string()
        }
        .message()
        .contains("busy"));
    }
}
