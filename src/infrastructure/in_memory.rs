use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{CheckoutStore, OrderStore, ProductStore, newest_first};
use crate::domain::product::Product;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    products: HashMap<String, Product>,
}

/// A thread-safe in-memory store holding both the order and product tables.
///
/// Both tables sit behind one `RwLock`, which is what makes
/// `store_completion` a single write. `Clone` shares the tables.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.id) {
            return Err(CheckoutError::DuplicateOrder(order.id.to_string()));
        }
        tables.orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn store(&self, order: Order) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(order_id).cloned())
    }

    async fn list_by_buyer(&self, buyer_id: &str) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let orders = tables
            .orders
            .values()
            .filter(|o| o.buyer_id == buyer_id)
            .cloned()
            .collect();
        Ok(newest_first(orders))
    }

    async fn list_by_seller(&self, seller_id: &str) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let orders = tables
            .orders
            .values()
            .filter(|o| o.seller_id == seller_id)
            .cloned()
            .collect();
        Ok(newest_first(orders))
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.orders.values().cloned().collect()))
    }

}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn store_product(&self, mut product: Product) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.products.get(&product.id) {
            product.keep_history_of(existing);
        }
        tables.products.insert(product.id.clone(), product);
        Ok(())
    }

    async fn get_product(&self, product_id: &str) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.get(product_id).cloned())
    }

    async fn all_products(&self) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().cloned().collect())
    }
}

#[async_trait]
impl CheckoutStore for InMemoryStore {
    async fn store_completion(&self, order: Order) -> Result<Product> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(&order.product_id)
            .ok_or_else(|| CheckoutError::ProductNotFound(order.product_id.clone()))?;
        product.record_sale();
        let product = product.clone();
        tables.orders.insert(order.id.clone(), order);
        Ok(product)
    }
}
