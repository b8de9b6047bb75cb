use super::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Download window granted when a product does not configure its own.
pub const DEFAULT_DOWNLOAD_EXPIRY_HOURS: u32 = 168;
/// Download allowance granted when a product does not configure its own.
pub const DEFAULT_MAX_DOWNLOADS: u32 = 5;

fn default_expiry_hours() -> u32 {
    DEFAULT_DOWNLOAD_EXPIRY_HOURS
}

fn default_max_downloads() -> u32 {
    DEFAULT_MAX_DOWNLOADS
}

fn default_active() -> bool {
    true
}

/// A sellable digital good (`digital_products` table).
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Product {
    pub id: String,
    /// Owner of the product, i.e. the seller on every order for it.
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Amount,
    pub currency: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub download_count: u32,
    #[serde(default = "default_max_downloads")]
    pub max_downloads: u32,
    #[serde(default = "default_expiry_hours")]
    pub download_expiry_hours: u32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        title: impl Into<String>,
        price: Amount,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: title.into(),
            description: String::new(),
            price,
            currency: currency.into(),
            category: None,
            tags: Vec::new(),
            is_active: true,
            download_count: 0,
            max_downloads: DEFAULT_MAX_DOWNLOADS,
            download_expiry_hours: DEFAULT_DOWNLOAD_EXPIRY_HOURS,
            created_at: Utc::now(),
        }
    }

    /// Records one fulfilled purchase against the product.
    pub fn record_sale(&mut self) {
        self.download_count = self.download_count.saturating_add(1);
    }

    /// Takes the sales history of an already stored row. Catalog fields
    /// come from `self`.
    pub fn keep_history_of(&mut self, existing: &Product) {
        self.download_count = existing.download_count;
        self.created_at = existing.created_at;
    }
}
