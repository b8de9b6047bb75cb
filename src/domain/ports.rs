use super::event::PaymentEvent;
use super::order::{Order, OrderId};
use super::product::Product;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

/// Persistence for the `orders` table.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order. Fails with `DuplicateOrder` if the id is taken.
    async fn insert(&self, order: Order) -> Result<()>;
    /// Overwrites an existing order row.
    async fn store(&self, order: Order) -> Result<()>;
    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>>;
    /// Orders placed by `buyer_id`, newest first.
    async fn list_by_buyer(&self, buyer_id: &str) -> Result<Vec<Order>>;
    /// Orders for products owned by `seller_id`, newest first.
    async fn list_by_seller(&self, seller_id: &str) -> Result<Vec<Order>>;
    async fn all_orders(&self) -> Result<Vec<Order>>;
}

/// Persistence for the `digital_products` table.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Lists a product or updates its catalog fields. An existing row keeps
    /// its `download_count` and `created_at`.
    async fn store_product(&self, product: Product) -> Result<()>;
    async fn get_product(&self, product_id: &str) -> Result<Option<Product>>;
    async fn all_products(&self) -> Result<Vec<Product>>;
}

/// Both tables behind one backend, so a completion can touch them together.
#[async_trait]
pub trait CheckoutStore: OrderStore + ProductStore {
    /// Persists a completed order and bumps its product's download counter
    /// as one write. Returns the product as stored afterwards.
    async fn store_completion(&self, order: Order) -> Result<Product>;
}

pub type OrderStoreBox = Box<dyn OrderStore>;
pub type ProductStoreBox = Box<dyn ProductStore>;
pub type CheckoutStoreBox = Box<dyn CheckoutStore>;

/// Sink the provider pushes its callbacks into.
pub type CallbackSender = mpsc::Sender<PaymentEvent>;

/// What the buyer is asked to pay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRequest {
    pub amount: rust_decimal::Decimal,
    pub memo: String,
    pub metadata: serde_json::Value,
}

/// The external payment provider.
///
/// The provider owns the timing of its callbacks; it may invoke any of them,
/// in any order, any number of times.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_payment(&self, request: PaymentRequest, callbacks: CallbackSender) -> Result<()>;
}

pub(crate) fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}
