use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{CheckoutStore, OrderStore, ProductStore, newest_first};
use crate::domain::product::Product;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for the `orders` table.
pub const CF_ORDERS: &str = "orders";
/// Column Family for the `digital_products` table.
pub const CF_PRODUCTS: &str = "digital_products";

/// A persistent store implementation using RocksDB.
///
/// Orders and products live in separate Column Families keyed by their ids.
/// Rows are JSON encoded.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    // Serializes read-modify-write of product counters.
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("orders" and "digital_products") exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let cf_products = ColumnFamilyDescriptor::new(CF_PRODUCTS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orders, cf_products])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            CheckoutError::InternalError(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                name
            ))))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, encode(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(decode(&value)?);
        }
        Ok(rows)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        CheckoutError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        CheckoutError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = order.id.as_str().as_bytes();
        if self.db.get_pinned_cf(self.cf(CF_ORDERS)?, key)?.is_some() {
            return Err(CheckoutError::DuplicateOrder(order.id.to_string()));
        }
        self.write(CF_ORDERS, key, &order)
    }

    async fn store(&self, order: Order) -> Result<()> {
        self.write(CF_ORDERS, order.id.as_str().as_bytes(), &order)
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.read(CF_ORDERS, order_id.as_str().as_bytes())
    }

    async fn list_by_buyer(&self, buyer_id: &str) -> Result<Vec<Order>> {
        let orders: Vec<Order> = self.scan(CF_ORDERS)?;
        Ok(newest_first(
            orders.into_iter().filter(|o| o.buyer_id == buyer_id).collect(),
        ))
    }

    async fn list_by_seller(&self, seller_id: &str) -> Result<Vec<Order>> {
        let orders: Vec<Order> = self.scan(CF_ORDERS)?;
        Ok(newest_first(
            orders.into_iter().filter(|o| o.seller_id == seller_id).collect(),
        ))
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        Ok(newest_first(self.scan(CF_ORDERS)?))
    }
}

#[async_trait]
impl ProductStore for RocksDBStore {
    async fn store_product(&self, mut product: Product) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self.read::<Product>(CF_PRODUCTS, product.id.as_bytes())? {
            product.keep_history_of(&existing);
        }
        self.write(CF_PRODUCTS, product.id.as_bytes(), &product)
    }

    async fn get_product(&self, product_id: &str) -> Result<Option<Product>> {
        self.read(CF_PRODUCTS, product_id.as_bytes())
    }

    async fn all_products(&self) -> Result<Vec<Product>> {
        self.scan(CF_PRODUCTS)
    }
}

#[async_trait]
impl CheckoutStore for RocksDBStore {
    async fn store_completion(&self, order: Order) -> Result<Product> {
        let _guard = self.write_lock.lock().await;
        let mut product: Product = self
            .read(CF_PRODUCTS, order.product_id.as_bytes())?
            .ok_or_else(|| CheckoutError::ProductNotFound(order.product_id.clone()))?;
        product.record_sale();

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_ORDERS)?, order.id.as_str().as_bytes(), encode(&order)?);
        batch.put_cf(self.cf(CF_PRODUCTS)?, product.id.as_bytes(), encode(&product)?);
        self.db.write(&batch)?;

        Ok(product)
    }
}
