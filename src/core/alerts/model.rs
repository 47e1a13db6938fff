// Notification state and the derived records it holds.
//
// Everything here is rebuilt from fetched inputs. Nothing is patched in place
// except by an acknowledgement.

use serde::Serialize;

use crate::core::model::{ApiAlert, Batch, InventoryItem};

/// Badge text shown once the count passes this value.
pub const BADGE_CAP: usize = 9;

/// Inventory item at or below its reorder level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowStockItem {
    pub name: Option<String>,
    pub branch: Option<String>,
    pub quantity: f64,
    pub reorder_level: f64,
}

impl LowStockItem {
    /// How far below (negative) or at the reorder level the item sits
    pub fn shortfall(&self) -> f64 {
        self.quantity - self.reorder_level
    }

    /// Identifier used for dismissals: the item name
    pub fn identifier(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl From<&InventoryItem> for LowStockItem {
    fn from(item: &InventoryItem) -> Self {
        Self {
            name: item.name.clone(),
            branch: item.branch.clone(),
            quantity: item.quantity,
            reorder_level: item.reorder_level,
        }
    }
}

/// Batch within the expiry window, including already expired ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiringBatch {
    pub id: String,
    pub item_name: Option<String>,
    pub branch: Option<String>,
    /// Whole days until expiration, rounded up. Negative once expired.
    pub days_left: i64,
}

impl ExpiringBatch {
    pub fn from_batch(batch: &Batch, days_left: i64) -> Self {
        Self {
            id: batch.id.clone(),
            item_name: batch.item_name.clone(),
            branch: batch.branch.clone(),
            days_left,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.days_left < 0
    }
}

/// The reconciled bell contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationState {
    pub low_stock: Vec<LowStockItem>,
    pub expiring: Vec<ExpiringBatch>,
    pub api_alerts: Vec<ApiAlert>,
}

impl NotificationState {
    /// Total outstanding alerts. Never capped.
    pub fn total_count(&self) -> usize {
        self.low_stock.len() + self.expiring.len() + self.api_alerts.len()
    }

    pub fn badge(&self) -> Badge {
        Badge {
            count: self.total_count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }
}

/// Bell badge, a display transform of the total count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub count: usize,
}

impl Badge {
    /// Text shown in the badge: the count, or "9+" above the cap.
    pub fn label(&self) -> String {
        if self.count > BADGE_CAP {
            format!("{BADGE_CAP}+")
        } else {
            self.count.to_string()
        }
    }

    /// The badge is hidden when there is nothing to show.
    pub fn is_visible(&self) -> bool {
        self.count > 0
    }
}
