//! Payment gateway integration: outbound signed redirect URLs, inbound
//! signature-verified callbacks, and idempotent reconciliation keyed by the
//! persisted gateway reference.

pub mod service;
pub mod signing;

pub use service::{CallbackOutcome, GatewayConfig, InitiatedPayment, PaymentService};
