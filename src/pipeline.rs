//! Outgoing-mail dispatch pipeline with sender-identity enforcement.
//!
//! The pipeline is the ordered list of surfaces the override engine writes
//! into, made explicit: caller filters run first, then the sender-address
//! and sender-name surfaces, then the header surface, then the transport's
//! native fields. Whichever surface the transport ultimately consults, the
//! configured identity is present, and the overrides are the final writer
//! at every one of them.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    filter::{apply_filters, MessageFilter},
    message::OutgoingMessage,
    overrides::{
        apply_from_name_override, apply_from_override, apply_header_overrides, OverrideConfig,
    },
    settings::SettingsStore,
    transport::{MailTransport, TransportHandoff, TransportResult},
};

/// Dispatches outgoing messages through filters, override enforcement and a
/// transport.
///
/// The settings store is the injected configuration provider: the override
/// set is read fresh from it on every send, never cached inside the
/// pipeline.
pub struct MailPipeline {
    settings: Arc<dyn SettingsStore>,
    filters: Vec<Box<dyn MessageFilter>>,
    transport: Arc<dyn MailTransport>,
    debug_log: bool,
}

impl MailPipeline {
    /// Creates a pipeline with no registered filters.
    pub fn new(settings: Arc<dyn SettingsStore>, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            settings,
            filters: Vec::new(),
            transport,
            debug_log: false,
        }
    }

    /// Enables delivery-failure diagnostics on the send-failure hook.
    pub fn with_debug_log(mut self, enabled: bool) -> Self {
        self.debug_log = enabled;
        self
    }

    /// Registers a participant filter.
    ///
    /// Filters run in registration order, always before the override
    /// surfaces, which keep the final word on sender identity.
    pub fn add_filter(&mut self, filter: Box<dyn MessageFilter>) {
        self.filters.push(filter);
    }

    /// Sends a message through the full pipeline.
    ///
    /// Delivery failures are observed by the send-failure hook and returned
    /// to the caller; they are never retried here.
    pub async fn send(&self, mut message: OutgoingMessage) -> TransportResult<()> {
        let config = OverrideConfig::load(self.settings.as_ref());

        apply_filters(&self.filters, &mut message).await;

        // Override surfaces, each independently idempotent
        message.sender_address = apply_from_override(&message.sender_address, &config);
        message.sender_name = apply_from_name_override(&message.sender_name, &config);
        apply_header_overrides(&mut message, &config);

        let mut handoff = TransportHandoff::from_message(&message);
        self.init_transport(&mut handoff, &config);

        debug!(
            message_id = %handoff.message_id,
            to = %handoff.to,
            transport = self.transport.name(),
            "Dispatching message"
        );
        match self.transport.send(&handoff).await {
            Ok(()) => {
                info!(
                    message_id = %handoff.message_id,
                    to = %handoff.to,
                    "Message dispatched"
                );
                Ok(())
            }
            Err(e) => {
                self.on_send_failure(&handoff, &e);
                Err(e)
            }
        }
    }

    /// Transport-init surface: writes the transport's native sender and
    /// reply-to fields directly. Best-effort: a rejected assignment is
    /// swallowed here, the header surface already carries the values.
    fn init_transport(&self, handoff: &mut TransportHandoff, config: &OverrideConfig) {
        if let Some(from_email) = config.valid_from_email() {
            if let Err(e) = handoff.set_from(from_email, &config.display_name()) {
                debug!(error = %e, "Transport rejected From assignment");
            }
        }
        if let Some(reply_to) = config.valid_reply_to() {
            handoff.clear_reply_tos();
            if let Err(e) = handoff.add_reply_to(reply_to, &config.display_name()) {
                debug!(error = %e, "Transport rejected Reply-To assignment");
            }
        }
    }

    /// Send-failure hook: read-only observer of delivery failures.
    fn on_send_failure(&self, handoff: &TransportHandoff, error: &crate::transport::TransportError) {
        if self.debug_log {
            debug!(
                message_id = %handoff.message_id,
                to = %handoff.to,
                error = %error,
                "Mail delivery failed"
            );
        }
    }
}
