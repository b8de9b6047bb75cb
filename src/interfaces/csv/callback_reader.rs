use crate::domain::event::PaymentEvent;
use crate::domain::order::OrderId;
use crate::error::{CheckoutError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Checkout,
    Approve,
    Complete,
    Cancel,
    Error,
}

/// One raw line of a callback log.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CallbackRecord {
    pub r#type: RecordType,
    pub order: String,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub buyer: Option<String>,
    #[serde(default)]
    pub payment: Option<String>,
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A validated callback-log entry.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    /// A buyer started checkout for a product.
    Checkout {
        order_id: OrderId,
        product_id: String,
        buyer_id: String,
    },
    /// The provider fired a callback.
    Callback(PaymentEvent),
}

fn required(value: Option<String>, field: &str, record: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CheckoutError::ValidationError(format!("{} record missing {}", record, field)))
}

impl TryFrom<CallbackRecord> for LogEntry {
    type Error = CheckoutError;

    fn try_from(record: CallbackRecord) -> Result<Self> {
        let order_id = OrderId::new(required(Some(record.order), "order", "callback")?);
        let entry = match record.r#type {
            RecordType::Checkout => LogEntry::Checkout {
                order_id,
                product_id: required(record.product, "product", "checkout")?,
                buyer_id: required(record.buyer, "buyer", "checkout")?,
            },
            RecordType::Approve => LogEntry::Callback(PaymentEvent::ApprovalRequested {
                order_id,
                payment_id: required(record.payment, "payment", "approve")?,
            }),
            RecordType::Complete => LogEntry::Callback(PaymentEvent::CompletionReady {
                order_id,
                payment_id: required(record.payment, "payment", "complete")?,
                txid: required(record.txid, "txid", "complete")?,
            }),
            RecordType::Cancel => LogEntry::Callback(PaymentEvent::Cancelled {
                order_id,
                payment_id: required(record.payment, "payment", "cancel")?,
            }),
            RecordType::Error => LogEntry::Callback(PaymentEvent::Failed {
                order_id,
                payment_id: required(record.payment, "payment", "error")?,
                error: record.error.unwrap_or_default(),
            }),
        };
        Ok(entry)
    }
}

/// Reads a payment-provider callback log from a CSV source.
///
/// Header: `type, order, product, buyer, payment, txid, error`. Whitespace is
/// trimmed and short rows are accepted.
pub struct CallbackReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CallbackReader<R> {
    /// Creates a new `CallbackReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates log entries.
    pub fn entries(self) -> impl Iterator<Item = Result<LogEntry>> {
        self.reader.into_deserialize().map(|result| {
            let record: CallbackRecord = result.map_err(CheckoutError::from)?;
            LogEntry::try_from(record)
        })
    }
}
