// Renderer-facing view of the notification state.
//
// Turns a snapshot into rows the bell dropdown can draw as-is. Drawing itself
// belongs to whoever implements `BellRenderer`.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::model::{Badge, ExpiringBatch, LowStockItem, NotificationState};
use crate::core::dismissals::model::AlertKind;
use crate::core::model::ApiAlert;

/// Number of rows in the dashboard's restock table.
pub const CRITICAL_ITEMS_LIMIT: usize = 5;

const UNKNOWN_ITEM: &str = "Unknown Item";
const DEFAULT_BRANCH: &str = "General";
const SYSTEM_BRANCH: &str = "Admin";

lazy_static! {
    static ref NON_ALPHANUMERIC: Regex = Regex::new("[^a-zA-Z0-9]").unwrap();
}

/// Receives a full snapshot whenever the aggregator state changes.
pub trait BellRenderer {
    fn redraw(&self, state: &NotificationState, badge: Badge);
}

/// Category tag shown on a bell row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    Expired,
    Expiring,
    LowStock,
    System,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Expired => "Expired",
            Self::Expiring => "Expiring",
            Self::LowStock => "Low Stock",
            Self::System => "System",
        }
    }
}

/// What the acknowledge button on a row does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EntryAction {
    /// Suppress locally through the dismissal set
    Dismiss { kind: AlertKind, id: String },
    /// Acknowledge on the backend
    AcknowledgeOnServer { alert_id: String },
}

/// One row of the bell dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BellEntry {
    pub kind: EntryKind,
    pub branch: String,
    pub item: String,
    pub detail: String,
    /// `None` when the row has no identifier to act on
    pub action: Option<EntryAction>,
}

impl BellEntry {
    /// Anchor id of the matching inventory card, for click-to-navigate.
    pub fn highlight_id(&self) -> String {
        highlight_id(&self.item, Some(&self.branch))
    }
}

/// Rows in display order: expiring batches, low-stock items, system alerts.
pub fn bell_entries(state: &NotificationState) -> Vec<BellEntry> {
    let mut entries = Vec::with_capacity(state.total_count());
    entries.extend(state.expiring.iter().map(expiry_entry));
    entries.extend(state.low_stock.iter().map(stock_entry));
    entries.extend(state.api_alerts.iter().map(system_entry));
    entries
}

fn expiry_entry(batch: &ExpiringBatch) -> BellEntry {
    let (kind, detail) = if batch.is_expired() {
        (
            EntryKind::Expired,
            format!("Expired {} days ago", batch.days_left.unsigned_abs()),
        )
    } else {
        (EntryKind::Expiring, format!("{} days left", batch.days_left))
    };

    BellEntry {
        kind,
        branch: batch.branch.clone().unwrap_or_else(|| DEFAULT_BRANCH.to_owned()),
        item: batch.item_name.clone().unwrap_or_else(|| UNKNOWN_ITEM.to_owned()),
        detail,
        action: Some(EntryAction::Dismiss {
            kind: AlertKind::Expiry,
            id: batch.id.clone(),
        }),
    }
}

fn stock_entry(item: &LowStockItem) -> BellEntry {
    BellEntry {
        kind: EntryKind::LowStock,
        branch: item.branch.clone().unwrap_or_else(|| DEFAULT_BRANCH.to_owned()),
        item: item.name.clone().unwrap_or_else(|| UNKNOWN_ITEM.to_owned()),
        detail: format!("{} units left", item.quantity),
        action: item
            .identifier()
            .filter(|id| !id.is_empty())
            .map(|id| EntryAction::Dismiss {
                kind: AlertKind::Stock,
                id: id.to_owned(),
            }),
    }
}

fn system_entry(alert: &ApiAlert) -> BellEntry {
    BellEntry {
        kind: EntryKind::System,
        branch: SYSTEM_BRANCH.to_owned(),
        item: alert.title.clone().unwrap_or_else(|| UNKNOWN_ITEM.to_owned()),
        detail: "Action required".to_owned(),
        action: alert
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .map(|alert_id| EntryAction::AcknowledgeOnServer { alert_id }),
    }
}

/// Most urgent low-stock items first, by how far they sit below reorder level.
///
/// The sort is stable, so ties keep their fetch order.
pub fn critical_items(items: &[LowStockItem], limit: usize) -> Vec<&LowStockItem> {
    let mut sorted: Vec<&LowStockItem> = items.iter().collect();
    sorted.sort_by(|a, b| a.shortfall().total_cmp(&b.shortfall()));
    sorted.truncate(limit);
    sorted
}

/// Inventory card anchor: `"{item}-{branch}"` stripped to lowercase alphanumerics.
pub fn highlight_id(item: &str, branch: Option<&str>) -> String {
    let branch = branch.filter(|b| !b.is_empty()).unwrap_or("general");
    let raw = format!("{item}-{branch}");
    NON_ALPHANUMERIC.replace_all(&raw, "").to_lowercase()
}
