//! Domain model of a digital product purchase: orders, products, the buyer
//! session and the payment-provider callbacks that drive an order to its
//! terminal state.

pub mod event;
pub mod money;
pub mod order;
pub mod ports;
pub mod product;
pub mod session;
