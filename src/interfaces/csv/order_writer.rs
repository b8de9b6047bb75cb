use crate::application::download::DownloadLink;
use crate::domain::order::{Order, OrderStatus};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct OrderRow<'a> {
    order: &'a str,
    product: &'a str,
    buyer: &'a str,
    amount: Decimal,
    currency: &'a str,
    status: OrderStatus,
    payment: Option<&'a str>,
    txid: Option<&'a str>,
    download_url: Option<String>,
}

/// Writes the final order table as CSV.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes one row per order, with a download link for completed ones.
    pub fn write_orders(&mut self, orders: &[Order], origin: &str) -> Result<()> {
        for order in orders {
            self.writer.serialize(OrderRow {
                order: order.id.as_str(),
                product: &order.product_id,
                buyer: &order.buyer_id,
                amount: order.amount.normalize(),
                currency: &order.currency,
                status: order.status,
                payment: order.payment_id.as_deref(),
                txid: order.txid.as_deref(),
                download_url: DownloadLink::for_order(origin, order).map(|link| link.to_string()),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
