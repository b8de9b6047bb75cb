use thiserror::Error;

/// The two kinds of failure a buyer is ever told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An insert or update against the data store failed.
    Storage,
    /// The payment provider reported an error.
    Provider,
}

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Product is not available for sale: {0}")]
    ProductInactive(String),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Order already exists: {0}")]
    DuplicateOrder(String),
    #[error("Payment provider error: {0}")]
    ProviderError(String),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::ProviderError(_) => ErrorKind::Provider,
            _ => ErrorKind::Storage,
        }
    }

    /// Short, dismissible message shown to the buyer.
    pub fn notification(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Storage => "Purchase failed. Please try again.",
            ErrorKind::Provider => "Payment failed. Please try again.",
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
