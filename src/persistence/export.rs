//! CSV export of order and billing history

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::api::BillingEntry;
use crate::orders::OrderItem;

/// Flat order row for CSV storage
#[derive(Debug, Clone, Serialize)]
pub struct OrderRecord {
    pub id: String,
    pub created_at: String,
    pub pair: String,
    pub side: String,
    pub direction: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub result: String,
    pub price: Option<f64>,
    pub duration: String,
    pub settled_payout: Option<f64>,
    pub settled_loss_amount: Option<f64>,
    pub origin: String,
}

impl From<&OrderItem> for OrderRecord {
    fn from(order: &OrderItem) -> Self {
        Self {
            id: order.id.clone(),
            created_at: order.created_at.clone(),
            pair: order.pair.clone(),
            side: order.trade_type.to_string(),
            direction: order.direction.map(|d| d.to_string()).unwrap_or_default(),
            amount: order.amount,
            currency: order.currency.clone(),
            status: order.status.to_string(),
            result: order.result.map(|r| r.to_string()).unwrap_or_default(),
            price: order.price,
            duration: order.duration.clone().unwrap_or_default(),
            settled_payout: order.settled_payout,
            settled_loss_amount: order.settled_loss_amount,
            origin: order.origin.as_str().to_string(),
        }
    }
}

/// Billing row for CSV storage
#[derive(Debug, Clone, Serialize)]
pub struct BillingRecord {
    pub id: String,
    pub timestamp: String,
    pub kind: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
}

impl From<&BillingEntry> for BillingRecord {
    fn from(entry: &BillingEntry) -> Self {
        Self {
            id: entry.id.clone(),
            timestamp: entry.created_at.clone(),
            kind: entry.entry_type.clone(),
            amount: entry.amount,
            currency: entry.currency.clone(),
            status: entry.status.clone(),
        }
    }
}

fn write_rows<W: Write, R: Serialize>(out: W, rows: impl IntoIterator<Item = R>) -> Result<usize> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(out);
    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

fn create(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Failed to create export file {}", path.display()))
}

/// Export orders for analysis
pub fn export_orders(orders: &[OrderItem], output_path: impl AsRef<Path>) -> Result<usize> {
    let path = output_path.as_ref();
    let count = write_rows(create(path)?, orders.iter().map(OrderRecord::from))?;
    info!("Exported {} orders to {}", count, path.display());
    Ok(count)
}

/// Export billing history for analysis
pub fn export_billing(entries: &[BillingEntry], output_path: impl AsRef<Path>) -> Result<usize> {
    let path = output_path.as_ref();
    let count = write_rows(create(path)?, entries.iter().map(BillingRecord::from))?;
    info!("Exported {} billing entries to {}", count, path.display());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::normalize_order;
    use serde_json::json;

    #[test]
    fn orders_export_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        let orders = vec![
            normalize_order(&json!({"id": 1, "pair": "BTC/USDT", "amount": "600", "type": "buy", "status": "completed", "result": "WIN"})),
            normalize_order(&json!({"id": "b", "symbol": "ETH/USDT", "amount": 700, "type": "SELL", "direction": "DOWN"})),
        ];

        assert_eq!(export_orders(&orders, &path).unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("id,created_at,pair,side"));
        let first = lines.next().unwrap();
        assert!(first.starts_with("1,"));
        assert!(first.contains("BTC/USDT,BUY,,600"));
        assert!(first.contains("completed,WIN"));
        assert!(lines.next().unwrap().contains("ETH/USDT,SELL,DOWN"));
    }

    #[test]
    fn billing_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("billing.csv");
        let entries: Vec<BillingEntry> = serde_json::from_value(json!([
            {"id": 5, "type": "DEPOSIT", "amount": "100", "status": "APPROVED", "timestamp": "2024-01-01T00:00:00Z"}
        ]))
        .unwrap();

        assert_eq!(export_billing(&entries, &path).unwrap(), 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("5,2024-01-01T00:00:00Z,DEPOSIT,100.0,USDT,APPROVED"));
    }
}
