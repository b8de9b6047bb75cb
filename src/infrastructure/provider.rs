use crate::domain::event::PaymentEvent;
use crate::domain::order::OrderId;
use crate::domain::ports::{CallbackSender, PaymentProvider, PaymentRequest};
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// A callback the scripted provider will fire, minus the order it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedCallback {
    Approve { payment_id: String },
    Complete { payment_id: String, txid: String },
    Cancel { payment_id: String },
    Error { payment_id: String, error: String },
}

impl ScriptedCallback {
    fn into_event(self, order_id: OrderId) -> PaymentEvent {
        match self {
            ScriptedCallback::Approve { payment_id } => PaymentEvent::ApprovalRequested { order_id, payment_id },
            ScriptedCallback::Complete { payment_id, txid } => PaymentEvent::CompletionReady {
                order_id,
                payment_id,
                txid,
            },
            ScriptedCallback::Cancel { payment_id } => PaymentEvent::Cancelled { order_id, payment_id },
            ScriptedCallback::Error { payment_id, error } => PaymentEvent::Failed {
                order_id,
                payment_id,
                error,
            },
        }
    }
}

/// A payment provider that replays a fixed callback script for every payment.
///
/// The order a payment belongs to is read back from the request metadata,
/// the same way a real provider echoes metadata to its callbacks.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    script: Vec<ScriptedCallback>,
    refuse: Option<String>,
    requests: Arc<Mutex<Vec<PaymentRequest>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<ScriptedCallback>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// A provider that refuses to create any payment.
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            refuse: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Payment requests received so far.
    pub async fn requests(&self) -> Vec<PaymentRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    async fn create_payment(&self, request: PaymentRequest, callbacks: CallbackSender) -> Result<()> {
        if let Some(reason) = &self.refuse {
            return Err(CheckoutError::ProviderError(reason.clone()));
        }

        let order_id = request
            .metadata
            .get("order_id")
            .and_then(|v| v.as_str())
            .map(OrderId::new)
            .ok_or_else(|| CheckoutError::ProviderError("payment metadata lacks order_id".to_string()))?;
        self.requests.lock().await.push(request);

        for callback in self.script.iter().cloned() {
            let event = callback.into_event(order_id.clone());
            debug!(%event, "provider firing callback");
            callbacks
                .send(event)
                .await
                .map_err(|e| CheckoutError::ProviderError(format!("callback channel closed: {}", e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    fn request(order_id: &str) -> PaymentRequest {
        PaymentRequest {
            amount: dec!(5),
            memo: "Purchase: Preset pack".to_string(),
            metadata: serde_json::json!({ "order_id": order_id }),
        }
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_callbacks() {
        let provider = ScriptedProvider::new(vec![
            ScriptedCallback::Approve {
                payment_id: "pay-1".to_string(),
            },
            ScriptedCallback::Cancel {
                payment_id: "pay-1".to_string(),
            },
        ]);
        let (tx, mut rx) = mpsc::channel(8);

        provider.create_payment(request("o-1"), tx).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.name(), "approval");
        assert_eq!(first.order_id().as_str(), "o-1");
        assert_eq!(rx.recv().await.unwrap().name(), "cancel");
        assert!(rx.recv().await.is_none());
        assert_eq!(provider.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_refusing_provider() {
        let provider = ScriptedProvider::refusing("wallet unavailable");
        let (tx, _rx) = mpsc::channel(1);

        let result = provider.create_payment(request("o-1"), tx).await;
        assert!(matches!(result, Err(CheckoutError::ProviderError(_))));
    }
}
