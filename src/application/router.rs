use crate::application::engine::CheckoutEngine;
use crate::domain::event::PaymentEvent;
use crate::domain::order::{OrderId, Outcome};
use crate::domain::ports::CallbackSender;
use crate::error::{CheckoutError, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

/// Tally of what the router's workers did with the callbacks they consumed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouterStats {
    pub applied: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub errors: usize,
}

impl RouterStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Applied => self.applied += 1,
            Outcome::Duplicate => self.duplicates += 1,
            Outcome::Rejected => self.rejected += 1,
        }
    }
}

impl AddAssign for RouterStats {
    fn add_assign(&mut self, rhs: Self) {
        self.applied += rhs.applied;
        self.duplicates += rhs.duplicates;
        self.rejected += rhs.rejected;
        self.errors += rhs.errors;
    }
}

/// Fans provider callbacks out to a fixed set of shard workers.
///
/// Callbacks enter through one inbound channel. A dispatcher task hashes the
/// order id to pick a shard, so every callback for a given order is consumed,
/// in arrival order, by the same worker.
pub struct CallbackRouter {
    inbound: CallbackSender,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<RouterStats>>,
}

impl CallbackRouter {
    /// Spawns `shards` workers (at least one) over a shared engine.
    pub fn new(engine: Arc<CheckoutEngine>, shards: usize, buffer_size: usize) -> Self {
        let shards = shards.max(1);
        let (inbound, inbound_rx) = mpsc::channel(buffer_size);

        let mut senders = Vec::with_capacity(shards);
        let mut workers = Vec::with_capacity(shards);
        for shard in 0..shards {
            let (tx, rx) = mpsc::channel(buffer_size);
            senders.push(tx);
            workers.push(tokio::spawn(run_shard(shard, engine.clone(), rx)));
        }
        let dispatcher = tokio::spawn(dispatch(inbound_rx, senders));

        Self {
            inbound,
            dispatcher,
            workers,
        }
    }

    /// A sink to hand to a payment provider.
    pub fn sender(&self) -> CallbackSender {
        self.inbound.clone()
    }

    pub async fn submit(&self, event: PaymentEvent) -> Result<()> {
        self.inbound
            .send(event)
            .await
            .map_err(|e| CheckoutError::InternalError(Box::new(std::io::Error::other(format!(
                "callback router closed: {}",
                e
            )))))
    }

    /// Waits for every queued callback to be applied and stops the workers.
    ///
    /// Senders obtained through [`CallbackRouter::sender`] must be dropped
    /// first, otherwise this waits for them.
    pub async fn shutdown(self) -> Result<RouterStats> {
        drop(self.inbound);
        self.dispatcher.await.map_err(|e| CheckoutError::InternalError(Box::new(e)))?;

        let mut total = RouterStats::default();
        for worker in self.workers {
            total += worker.await.map_err(|e| CheckoutError::InternalError(Box::new(e)))?;
        }
        info!(?total, "callback router stopped");
        Ok(total)
    }
}

fn shard_for(order_id: &OrderId, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    order_id.hash(&mut hasher);
    (hasher.finish() % shards as u64) as usize
}

async fn dispatch(mut inbound: mpsc::Receiver<PaymentEvent>, shards: Vec<mpsc::Sender<PaymentEvent>>) {
    while let Some(event) = inbound.recv().await {
        let shard = shard_for(event.order_id(), shards.len());
        if let Err(e) = shards[shard].send(event).await {
            error!(shard, error = %e, "shard worker gone, dropping callback");
        }
    }
}

#[instrument(name = "callback_shard", skip(engine, rx))]
async fn run_shard(shard: usize, engine: Arc<CheckoutEngine>, mut rx: mpsc::Receiver<PaymentEvent>) -> RouterStats {
    let mut stats = RouterStats::default();
    while let Some(event) = rx.recv().await {
        match engine.handle_event(event).await {
            Ok(transition) => stats.record(transition.outcome),
            Err(e) => {
                error!(error = %e, notification = e.notification(), "callback failed");
                stats.errors += 1;
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutConfig;
    use crate::domain::money::Amount;
    use crate::domain::order::OrderStatus;
    use crate::domain::product::Product;
    use crate::domain::session::Session;
    use crate::infrastructure::in_memory::InMemoryStore;
    use rust_decimal_macros::dec;

    async fn engine() -> Arc<CheckoutEngine> {
        let store = InMemoryStore::new();
        let engine = CheckoutEngine::new(Box::new(store), CheckoutConfig::default());
        engine
            .add_product(Product::new("p-1", "seller-1", "Preset pack", Amount::new(dec!(5)).unwrap(), "PI"))
            .await
            .unwrap();
        Arc::new(engine)
    }

    #[test]
    fn test_shard_assignment_is_stable() {
        let id = OrderId::new("o-42");
        assert_eq!(shard_for(&id, 8), shard_for(&id, 8));
        assert!(shard_for(&id, 8) < 8);
        assert_eq!(shard_for(&id, 1), 0);
    }

    #[tokio::test]
    async fn test_router_applies_callbacks_per_order_in_order() {
        let engine = engine().await;
        let session = Session::new("buyer-1", "pioneer").unwrap();
        let mut ids = Vec::new();
        for _ in 0..20 {
            ids.push(engine.initiate(&session, "p-1", None).await.unwrap().id);
        }

        let router = CallbackRouter::new(engine.clone(), 4, 16);
        for id in &ids {
            router
                .submit(PaymentEvent::ApprovalRequested {
                    order_id: id.clone(),
                    payment_id: format!("pay-{id}"),
                })
                .await
                .unwrap();
            router
                .submit(PaymentEvent::CompletionReady {
                    order_id: id.clone(),
                    payment_id: format!("pay-{id}"),
                    txid: format!("tx-{id}"),
                })
                .await
                .unwrap();
            router
                .submit(PaymentEvent::Cancelled {
                    order_id: id.clone(),
                    payment_id: format!("pay-{id}"),
                })
                .await
                .unwrap();
        }
        let stats = router.shutdown().await.unwrap();

        assert_eq!(stats.applied, 40);
        assert_eq!(stats.rejected, 20);
        assert_eq!(stats.errors, 0);
        for id in &ids {
            let order = engine.order(id).await.unwrap().unwrap();
            assert_eq!(order.status, OrderStatus::Completed);
        }
        let product = engine.product("p-1").await.unwrap().unwrap();
        assert_eq!(product.download_count, 20);
    }

    #[tokio::test]
    async fn test_router_counts_unknown_orders_as_errors() {
        let router = CallbackRouter::new(engine().await, 2, 4);
        router
            .submit(PaymentEvent::Cancelled {
                order_id: OrderId::new("ghost"),
                payment_id: "pay-1".to_string(),
            })
            .await
            .unwrap();

        let stats = router.shutdown().await.unwrap();
        assert_eq!(stats.errors, 1);
    }
}
