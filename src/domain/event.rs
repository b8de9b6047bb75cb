use super::order::OrderId;
use std::fmt;

/// A payment-provider callback, addressed to the order it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    /// `onReadyForServerApproval`
    ApprovalRequested { order_id: OrderId, payment_id: String },
    /// `onReadyForServerCompletion`
    CompletionReady {
        order_id: OrderId,
        payment_id: String,
        txid: String,
    },
    /// `onCancel`
    Cancelled { order_id: OrderId, payment_id: String },
    /// `onError`
    Failed {
        order_id: OrderId,
        payment_id: String,
        error: String,
    },
}

impl PaymentEvent {
    pub fn order_id(&self) -> &OrderId {
        match self {
            PaymentEvent::ApprovalRequested { order_id, .. }
            | PaymentEvent::CompletionReady { order_id, .. }
            | PaymentEvent::Cancelled { order_id, .. }
            | PaymentEvent::Failed { order_id, .. } => order_id,
        }
    }

    pub fn payment_id(&self) -> &str {
        match self {
            PaymentEvent::ApprovalRequested { payment_id, .. }
            | PaymentEvent::CompletionReady { payment_id, .. }
            | PaymentEvent::Cancelled { payment_id, .. }
            | PaymentEvent::Failed { payment_id, .. } => payment_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaymentEvent::ApprovalRequested { .. } => "approval",
            PaymentEvent::CompletionReady { .. } => "completion",
            PaymentEvent::Cancelled { .. } => "cancel",
            PaymentEvent::Failed { .. } => "error",
        }
    }
}

impl fmt::Display for PaymentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} for order {} (payment {})",
            self.name(),
            self.order_id(),
            self.payment_id()
        )
    }
}
