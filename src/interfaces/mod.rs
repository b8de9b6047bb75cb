//! File formats the CLI speaks: callback logs and order tables as CSV, the
//! product catalog as JSON.

pub mod catalog;
pub mod csv;
