//! Subscription state reconciler
//!
//! Applies billing events to the user's premium flag, idempotently, keyed
//! by customer/email identity rather than event id: replaying a delivery
//! produces the same end state, so exactly-once delivery is not required.
//! No subscription history is kept.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

use crate::billing::webhook::BillingEvent;
use crate::storage::Storage;

/// Subscription statuses that count as premium.
const PREMIUM_STATUSES: &[&str] = &["active", "trialing"];

pub struct SubscriptionReconciler {
    storage: Arc<dyn Storage>,
}

impl SubscriptionReconciler {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Apply one billing event. An identity that matches no user is a
    /// silent no-op (zero rows affected), never an error.
    pub async fn apply(&self, event: BillingEvent) -> Result<()> {
        match event {
            BillingEvent::CheckoutCompleted { email, customer_id } => {
                let affected = self
                    .storage
                    .set_premium_by_email(&email, &customer_id)
                    .await?;
                if affected > 0 {
                    info!(%customer_id, "checkout completed, premium enabled");
                } else {
                    debug!(%customer_id, "checkout completed for unknown email, ignoring");
                }
            }
            BillingEvent::SubscriptionUpdated {
                customer_id,
                status,
            } => {
                let premium = PREMIUM_STATUSES.contains(&status.as_str());
                let affected = self
                    .storage
                    .set_premium_by_customer(&customer_id, premium)
                    .await?;
                if affected > 0 {
                    info!(%customer_id, %status, premium, "subscription updated");
                } else {
                    debug!(%customer_id, "subscription update for unknown customer, ignoring");
                }
            }
            BillingEvent::SubscriptionDeleted { customer_id } => {
                let affected = self
                    .storage
                    .set_premium_by_customer(&customer_id, false)
                    .await?;
                if affected > 0 {
                    info!(%customer_id, "subscription deleted, premium disabled");
                } else {
                    debug!(%customer_id, "subscription delete for unknown customer, ignoring");
                }
            }
            BillingEvent::Ignored => {}
        }

        Ok(())
    }
}
