//! Billing webhook envelope: signature verification and event extraction.
//!
//! The provider signs each delivery with `Stripe-Signature:
//! t=<unix ts>,v1=<hex hmac-sha256 of "<ts>.<payload>">` under a shared
//! secret. Verification uses a constant-time comparison.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature header")]
    Malformed,
    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a webhook delivery against the shared secret.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    let signature = signature.ok_or(SignatureError::Malformed)?;
    let provided = hex::decode(signature).map_err(|_| SignatureError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    if expected.ct_eq(&provided).into() {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// A billing event this service reacts to. Everything else parses to
/// `Ignored`, as do recognized kinds missing the fields we match users by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted { email: String, customer_id: String },
    SubscriptionUpdated { customer_id: String, status: String },
    SubscriptionDeleted { customer_id: String },
    Ignored,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    object: EnvelopeObject,
}

#[derive(Debug, Default, Deserialize)]
struct EnvelopeObject {
    customer: Option<String>,
    customer_email: Option<String>,
    customer_details: Option<CustomerDetails>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    email: Option<String>,
}

pub fn parse_event(body: &[u8]) -> Result<BillingEvent, serde_json::Error> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    let object = envelope.data.object;

    let event = match envelope.kind.as_str() {
        "checkout.session.completed" => {
            let email = object
                .customer_details
                .and_then(|d| d.email)
                .or(object.customer_email);
            match (email, object.customer) {
                (Some(email), Some(customer_id)) => BillingEvent::CheckoutCompleted {
                    email,
                    customer_id,
                },
                _ => BillingEvent::Ignored,
            }
        }
        "customer.subscription.updated" => match (object.customer, object.status) {
            (Some(customer_id), Some(status)) => BillingEvent::SubscriptionUpdated {
                customer_id,
                status,
            },
            _ => BillingEvent::Ignored,
        },
        "customer.subscription.deleted" => match object.customer {
            Some(customer_id) => BillingEvent::SubscriptionDeleted { customer_id },
            None => BillingEvent::Ignored,
        },
        _ => BillingEvent::Ignored,
    };

    Ok(event)
}
