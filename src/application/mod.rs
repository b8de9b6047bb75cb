//! Application layer containing the checkout orchestration.
//!
//! This module defines the `CheckoutEngine`, which applies payment-provider
//! callbacks to orders, and the `CallbackRouter`, which feeds it through
//! `tokio` channels so each order has a single consumer.

pub mod download;
pub mod engine;
pub mod router;
