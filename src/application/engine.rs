use crate::application::download::DownloadLink;
use crate::config::CheckoutConfig;
use crate::domain::event::PaymentEvent;
use crate::domain::order::{Order, OrderId, OrderStatus, Outcome};
use crate::domain::ports::{CallbackSender, CheckoutStoreBox, PaymentProvider, PaymentRequest};
use crate::domain::product::Product;
use crate::domain::session::Session;
use crate::error::{CheckoutError, Result};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, instrument, warn};

/// Result of handing one provider callback to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// The order as stored after the callback.
    pub order: Order,
    pub previous: OrderStatus,
    pub outcome: Outcome,
    pub download_link: Option<DownloadLink>,
}

type OrderLock = Arc<tokio::sync::Mutex<()>>;

/// One async mutex per order with callbacks in flight.
#[derive(Default)]
struct OrderLocks {
    locks: Mutex<HashMap<OrderId, OrderLock>>,
}

impl OrderLocks {
    fn acquire(&self, order_id: &OrderId) -> OrderLease<'_> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = locks.entry(order_id.clone()).or_default().clone();
        OrderLease {
            locks: self,
            order_id: order_id.clone(),
            lock,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// A claim on an order's mutex. Dropping it forgets the mutex once nobody
/// else is queued on it, even when the holder was cancelled mid-await.
struct OrderLease<'a> {
    locks: &'a OrderLocks,
    order_id: OrderId,
    lock: OrderLock,
}

impl Drop for OrderLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this lease hold it.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.order_id);
        }
    }
}

/// Drives digital product purchases from checkout to fulfilment.
///
/// `CheckoutEngine` owns the storage backend. Every mutation of an order is
/// serialized through a per-order lock, so callbacks racing on the same order
/// are applied one after the other and never lose an update.
pub struct CheckoutEngine {
    store: CheckoutStoreBox,
    config: CheckoutConfig,
    locks: OrderLocks,
}

impl CheckoutEngine {
    /// Creates a new `CheckoutEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `store` - Backend holding the `orders` and `digital_products` tables.
    /// * `config` - Download link origin, defaults and transition policy.
    pub fn new(store: CheckoutStoreBox, config: CheckoutConfig) -> Self {
        Self {
            store,
            config,
            locks: OrderLocks::default(),
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Lists a product for sale, or refreshes its catalog fields. Sales
    /// already recorded for it are kept.
    pub async fn add_product(&self, product: Product) -> Result<()> {
        self.store.store_product(product).await
    }

    pub async fn product(&self, product_id: &str) -> Result<Option<Product>> {
        self.store.get_product(product_id).await
    }

    pub async fn products(&self) -> Result<Vec<Product>> {
        self.store.all_products().await
    }

    /// Creates a pending order for `product_id` under a fresh id.
    pub async fn initiate(&self, session: &Session, product_id: &str, buyer_email: Option<String>) -> Result<Order> {
        self.initiate_with_id(OrderId::generate(), session, product_id, buyer_email)
            .await
    }

    /// Creates a pending order under a caller-chosen id.
    pub async fn initiate_with_id(
        &self,
        order_id: OrderId,
        session: &Session,
        product_id: &str,
        buyer_email: Option<String>,
    ) -> Result<Order> {
        let (order, _product) = self.create_order(order_id, session, product_id, buyer_email).await?;
        Ok(order)
    }

    #[instrument(skip(self, session, buyer_email), fields(buyer = session.uid()))]
    async fn create_order(
        &self,
        order_id: OrderId,
        session: &Session,
        product_id: &str,
        buyer_email: Option<String>,
    ) -> Result<(Order, Product)> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| CheckoutError::ProductNotFound(product_id.to_string()))?;
        if !product.is_active {
            return Err(CheckoutError::ProductInactive(product_id.to_string()));
        }

        let mut order = Order::new(order_id, session, &product, buyer_email);
        if order.max_downloads == 0 {
            order.max_downloads = self.config.default_max_downloads;
        }

        if let Err(e) = self.store.insert(order.clone()).await {
            error!(error = %e, "failed to create order");
            return Err(e);
        }
        info!(order_id = %order.id, amount = %order.amount, currency = %order.currency, "order created");
        Ok((order, product))
    }

    /// Creates the order and asks the provider to collect payment for it.
    ///
    /// Callbacks arrive on `callbacks` whenever the provider decides to send
    /// them. If the provider refuses, the order stays `pending`.
    pub async fn begin_purchase(
        &self,
        session: &Session,
        product_id: &str,
        buyer_email: Option<String>,
        provider: &dyn PaymentProvider,
        callbacks: CallbackSender,
    ) -> Result<Order> {
        let (order, product) = self
            .create_order(OrderId::generate(), session, product_id, buyer_email)
            .await?;

        let request = PaymentRequest {
            amount: order.amount,
            memo: format!("Purchase: {}", product.title),
            metadata: serde_json::json!({
                "order_id": order.id.as_str(),
                "product_id": order.product_id,
                "type": "digital_product",
            }),
        };

        if let Err(e) = provider.create_payment(request, callbacks).await {
            error!(order_id = %order.id, error = %e, "payment provider rejected the payment");
            return Err(e);
        }
        Ok(order)
    }

    /// `onReadyForServerApproval`
    pub async fn on_ready_for_server_approval(&self, order_id: OrderId, payment_id: impl Into<String>) -> Result<Transition> {
        self.handle_event(PaymentEvent::ApprovalRequested {
            order_id,
            payment_id: payment_id.into(),
        })
        .await
    }

    /// `onReadyForServerCompletion`
    pub async fn on_ready_for_server_completion(
        &self,
        order_id: OrderId,
        payment_id: impl Into<String>,
        txid: impl Into<String>,
    ) -> Result<Transition> {
        self.handle_event(PaymentEvent::CompletionReady {
            order_id,
            payment_id: payment_id.into(),
            txid: txid.into(),
        })
        .await
    }

    /// `onCancel`
    pub async fn on_cancel(&self, order_id: OrderId, payment_id: impl Into<String>) -> Result<Transition> {
        self.handle_event(PaymentEvent::Cancelled {
            order_id,
            payment_id: payment_id.into(),
        })
        .await
    }

    /// `onError`
    pub async fn on_error(
        &self,
        order_id: OrderId,
        payment_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Result<Transition> {
        self.handle_event(PaymentEvent::Failed {
            order_id,
            payment_id: payment_id.into(),
            error: error.into(),
        })
        .await
    }

    /// Applies a provider callback to its order under the order's lock.
    pub async fn handle_event(&self, event: PaymentEvent) -> Result<Transition> {
        let order_id = event.order_id().clone();
        let lease = self.locks.acquire(&order_id);
        let _guard = lease.lock.lock().await;
        self.apply_locked(event).await
    }

    #[instrument(skip(self, event), fields(order_id = %event.order_id(), event = event.name()))]
    async fn apply_locked(&self, event: PaymentEvent) -> Result<Transition> {
        let mut order = self
            .store
            .get(event.order_id())
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(event.order_id().to_string()))?;
        let previous = order.status;

        let expiry_hours = match event {
            PaymentEvent::CompletionReady { .. } => self.expiry_hours(&order.product_id).await?,
            _ => self.config.default_expiry_hours,
        };

        let outcome = order.apply(&event, expiry_hours, Utc::now(), self.config.policy)?;
        match outcome {
            Outcome::Applied => {
                let write = match event {
                    PaymentEvent::CompletionReady { .. } => {
                        self.store.store_completion(order.clone()).await.map(|product| {
                            info!(
                                product_id = %product.id,
                                downloads = product.download_count,
                                "product download counter incremented"
                            );
                        })
                    }
                    _ => self.store.store(order.clone()).await,
                };
                if let Err(e) = write {
                    error!(error = %e, "failed to update order");
                    return Err(e);
                }
                info!(from = %previous, to = %order.status, "order updated");
            }
            Outcome::Duplicate => debug!(status = %order.status, "repeated callback ignored"),
            Outcome::Rejected => warn!(status = %order.status, "callback rejected for order in terminal state"),
        }

        let download_link = DownloadLink::for_order(&self.config.origin, &order);
        Ok(Transition {
            order,
            previous,
            outcome,
            download_link,
        })
    }

    async fn expiry_hours(&self, product_id: &str) -> Result<u32> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| CheckoutError::ProductNotFound(product_id.to_string()))?;
        Ok(match product.download_expiry_hours {
            0 => self.config.default_expiry_hours,
            hours => hours,
        })
    }

    pub async fn order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.store.get(order_id).await
    }

    /// Orders placed by a buyer, newest first.
    pub async fn orders_for_buyer(&self, session: &Session) -> Result<Vec<Order>> {
        self.store.list_by_buyer(session.uid()).await
    }

    /// Orders received by a seller, newest first.
    pub async fn orders_for_seller(&self, seller_id: &str) -> Result<Vec<Order>> {
        self.store.list_by_seller(seller_id).await
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>> {
        self.store.all_orders().await
    }

    /// Orders still `pending` after `older_than`.
    ///
    /// Nothing reconciles these; a callback that never arrives leaves the
    /// order pending forever.
    pub async fn stale_pending(&self, older_than: Duration) -> Result<Vec<Order>> {
        let cutoff = Utc::now()
            .checked_sub_signed(older_than)
            .ok_or_else(|| CheckoutError::ValidationError(format!("staleness threshold {} is out of range", older_than)))?;
        let stale: Vec<Order> = self
            .store
            .all_orders()
            .await?
            .into_iter()
            .filter(|o| o.status == OrderStatus::Pending && o.created_at <= cutoff)
            .collect();
        for order in &stale {
            warn!(order_id = %order.id, created_at = %order.created_at, "order stuck in pending");
        }
        Ok(stale)
    }

    pub fn download_link(&self, order: &Order) -> Option<DownloadLink> {
        DownloadLink::for_order(&self.config.origin, order)
    }
}
