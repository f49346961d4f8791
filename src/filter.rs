//! In-pipeline message filters.
//!
//! Filters model the other participants of the host mail pipeline: each can
//! mutate an [`OutgoingMessage`] in place before transport handoff. The
//! pipeline runs every registered filter first and enforces the sender
//! overrides afterwards, so the overrides are always the final writer on
//! every surface a filter may have touched.

use std::{future::Future, pin::Pin};

use tracing::debug;

use crate::message::OutgoingMessage;

/// Boxed future type for filter operations, enabling async filters.
pub type FilterFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Trait for pipeline participants that modify outgoing messages.
///
/// Filters may perform async operations such as lookups; failures are the
/// filter's own concern and must not surface into the send path.
pub trait MessageFilter: Send + Sync {
    /// Transforms an outgoing message in place.
    fn apply<'a>(&'a self, message: &'a mut OutgoingMessage) -> FilterFuture<'a>;

    /// Returns the name of this filter.
    fn name(&self) -> &str;
}

/// Applies a list of filters to a message in order.
pub async fn apply_filters(filters: &[Box<dyn MessageFilter>], message: &mut OutgoingMessage) {
    for filter in filters {
        debug!(filter = filter.name(), "Applying message filter");
        filter.apply(message).await;
    }
}
