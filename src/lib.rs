//! Configuration-driven sender-identity override for outgoing email.
//!
//! An operator configures a fixed From address, From display name and
//! Reply-To address; the [`MailPipeline`] enforces them on every outgoing
//! message, on every surface the transport may consult, regardless of what
//! the triggering caller requested.

pub mod address;
pub mod config;
pub mod filter;
pub mod message;
pub mod overrides;
pub mod pipeline;
pub mod settings;
pub mod testsend;
pub mod transport;

pub use address::*;
pub use config::*;
pub use filter::*;
pub use message::*;
pub use overrides::*;
pub use pipeline::*;
pub use settings::*;
pub use testsend::*;
pub use transport::*;
