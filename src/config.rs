use crate::domain::order::TransitionPolicy;
use crate::domain::product::{DEFAULT_DOWNLOAD_EXPIRY_HOURS, DEFAULT_MAX_DOWNLOADS};

pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Runtime settings of the checkout flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Public origin download links are built against.
    pub origin: String,
    /// Download window for products that do not set one.
    pub default_expiry_hours: u32,
    /// Download allowance for products that do not set one.
    pub default_max_downloads: u32,
    pub policy: TransitionPolicy,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            default_expiry_hours: DEFAULT_DOWNLOAD_EXPIRY_HOURS,
            default_max_downloads: DEFAULT_MAX_DOWNLOADS,
            policy: TransitionPolicy::Strict,
        }
    }
}
