use super::event::PaymentEvent;
use super::product::Product;
use super::session::Session;
use crate::error::{CheckoutError, Result};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

const ACCESS_TOKEN_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How callbacks against an order that already left `pending` are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Terminal orders are frozen. Re-delivery of the event that finished the
    /// order is a no-op, anything else is rejected.
    #[default]
    Strict,
    /// Every callback overwrites the order, whatever its current status.
    LastWriteWins,
}

/// What applying a callback did to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Duplicate,
    Rejected,
}

/// One purchase attempt for a digital product (`orders` table).
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: String,
    pub seller_id: String,
    pub product_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub buyer_email: Option<String>,
    pub max_downloads: u32,
    pub access_token: String,
    pub payment_id: Option<String>,
    pub txid: Option<String>,
    pub download_expires_at: Option<DateTime<Utc>>,
    pub download_count: u32,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a pending order for `product` on behalf of the session's buyer.
    pub fn new(id: OrderId, session: &Session, product: &Product, buyer_email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            buyer_id: session.uid().to_string(),
            seller_id: product.user_id.clone(),
            product_id: product.id.clone(),
            amount: product.price.value(),
            currency: product.currency.clone(),
            status: OrderStatus::Pending,
            buyer_email: buyer_email.or_else(|| session.email().map(str::to_string)),
            max_downloads: product.max_downloads,
            access_token: generate_access_token(),
            payment_id: None,
            txid: None,
            download_expires_at: None,
            download_count: 0,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a provider callback.
    ///
    /// `expiry_hours` is the product's download window; it only matters for
    /// completion events. A window that does not fit the calendar fails the
    /// callback and leaves the order untouched.
    pub fn apply(
        &mut self,
        event: &PaymentEvent,
        expiry_hours: u32,
        now: DateTime<Utc>,
        policy: TransitionPolicy,
    ) -> Result<Outcome> {
        if policy == TransitionPolicy::Strict
            && let Some(outcome) = self.guard(event)
        {
            return Ok(outcome);
        }

        match event {
            PaymentEvent::ApprovalRequested { payment_id, .. } => {
                self.payment_id = Some(payment_id.clone());
            }
            PaymentEvent::CompletionReady { txid, .. } => {
                let expires_at = download_deadline(now, expiry_hours)?;
                self.status = OrderStatus::Completed;
                self.txid = Some(txid.clone());
                self.download_expires_at = Some(expires_at);
            }
            PaymentEvent::Cancelled { .. } => {
                self.status = OrderStatus::Cancelled;
            }
            PaymentEvent::Failed { error, .. } => {
                self.status = OrderStatus::Failed;
                self.failure_reason = Some(error.clone());
            }
        }
        self.updated_at = now;
        Ok(Outcome::Applied)
    }

    /// Returns the outcome for events that must not touch the order.
    fn guard(&self, event: &PaymentEvent) -> Option<Outcome> {
        let same_payment = self.payment_id.as_deref() == Some(event.payment_id());
        match event {
            PaymentEvent::ApprovalRequested { .. } if same_payment => Some(Outcome::Duplicate),
            _ if self.status == OrderStatus::Pending => None,
            PaymentEvent::CompletionReady { txid, .. }
                if self.status == OrderStatus::Completed
                    && self.txid.as_deref() == Some(txid.as_str()) =>
            {
                Some(Outcome::Duplicate)
            }
            PaymentEvent::Cancelled { .. } if self.status == OrderStatus::Cancelled => {
                Some(Outcome::Duplicate)
            }
            PaymentEvent::Failed { .. } if self.status == OrderStatus::Failed => {
                Some(Outcome::Duplicate)
            }
            _ => Some(Outcome::Rejected),
        }
    }

    pub fn is_downloadable(&self) -> bool {
        self.status == OrderStatus::Completed
    }
}

fn download_deadline(now: DateTime<Utc>, expiry_hours: u32) -> Result<DateTime<Utc>> {
    Duration::try_hours(i64::from(expiry_hours))
        .and_then(|window| now.checked_add_signed(window))
        .ok_or_else(|| {
            CheckoutError::ValidationError(format!("download window of {} hours is out of range", expiry_hours))
        })
}

fn generate_access_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ACCESS_TOKEN_LEN)
        .map(char::from)
        .collect()
}
