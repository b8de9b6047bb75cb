use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub const CATALOG: &str = "tests/fixtures/catalog.json";
pub const HEADER: &str = "type, order, product, buyer, payment, txid, error";

/// Writes a callback log with the given rows under the standard header.
pub fn callback_log(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file
}

/// Generates `orders` complete purchase flows (checkout, approve, complete).
#[allow(dead_code)]
pub fn generate_purchase_log(path: &Path, orders: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(["type", "order", "product", "buyer", "payment", "txid", "error"])?;

    for i in 1..=orders {
        let order = format!("o-{}", i);
        let payment = format!("pay-{}", i);
        let buyer = format!("buyer-{}", i % 50);
        wtr.write_record(["checkout", &order, "p-1", &buyer, "", "", ""])?;
        wtr.write_record(["approve", &order, "", "", &payment, "", ""])?;
        wtr.write_record(["complete", &order, "", "", &payment, &format!("tx-{}", i), ""])?;
    }

    wtr.flush()?;
    Ok(())
}
