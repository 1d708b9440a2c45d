//! Billing webhook handling and subscription state reconciliation.

pub mod reconciler;
pub mod webhook;

pub use reconciler::SubscriptionReconciler;
pub use webhook::{parse_event, verify_signature, BillingEvent, SignatureError};
