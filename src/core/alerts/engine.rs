// Alert aggregator - derives the bell contents and applies dismissals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Badge, ExpiringBatch, LowStockItem, NotificationState};
use super::triggers::{
    days_left, is_expiring, is_low_stock, is_suppressed_type, DEFAULT_EXPIRY_WINDOW_DAYS,
    DEFAULT_SUPPRESSED_TYPES,
};
use super::view::BellRenderer;
use crate::core::dismissals::model::{AlertKind, DismissalScope, DismissalSet};
use crate::core::dismissals::store::DismissalStore;
use crate::core::model::{ApiAlert, Batch, InventoryItem};

/// Aggregator configuration - persisted in settings.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSettings {
    /// Batches expiring within this many days are shown (inclusive)
    #[serde(default = "default_expiry_window")]
    pub expiry_window_days: i64,
    /// Server alert types dropped because they are derived locally
    #[serde(default = "default_suppressed_types")]
    pub suppressed_alert_types: Vec<String>,
    #[serde(default)]
    pub dismissal_scope: DismissalScope,
}

fn default_expiry_window() -> i64 {
    DEFAULT_EXPIRY_WINDOW_DAYS
}

fn default_suppressed_types() -> Vec<String> {
    DEFAULT_SUPPRESSED_TYPES.iter().map(|t| (*t).to_owned()).collect()
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            expiry_window_days: default_expiry_window(),
            suppressed_alert_types: default_suppressed_types(),
            dismissal_scope: DismissalScope::default(),
        }
    }
}

/// Owns the notification state and the dismissal storage behind it.
///
/// Each ingest replaces its slice wholesale, so feeding the same inputs twice
/// yields the same state.
pub struct AlertAggregator<S> {
    settings: AlertSettings,
    store: S,
    /// Last set read from the store, plus anything still pending
    dismissed: DismissalSet,
    /// Dismissals made this session that the store has not accepted yet
    pending: DismissalSet,
    state: NotificationState,
    renderer: Option<Box<dyn BellRenderer + Send>>,
}

impl<S: DismissalStore> AlertAggregator<S> {
    pub fn new(store: S, settings: AlertSettings) -> Self {
        let mut aggregator = Self {
            settings,
            store,
            dismissed: DismissalSet::new(),
            pending: DismissalSet::new(),
            state: NotificationState::default(),
            renderer: None,
        };
        aggregator.reload_dismissed();
        aggregator
    }

    /// Attach the rendering collaborator. It is redrawn after every change.
    pub fn set_renderer(&mut self, renderer: Box<dyn BellRenderer + Send>) {
        self.renderer = Some(renderer);
    }

    /// Update the settings (hot-reload friendly). Takes effect on the next ingest.
    pub fn update_settings(&mut self, settings: AlertSettings) {
        self.settings = settings;
    }

    pub fn settings(&self) -> &AlertSettings {
        &self.settings
    }

    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    pub fn dismissed(&self) -> &DismissalSet {
        &self.dismissed
    }

    /// Dismissals that failed to persist and will be retried on the next write.
    pub fn pending(&self) -> &DismissalSet {
        &self.pending
    }

    pub fn total_count(&self) -> usize {
        self.state.total_count()
    }

    pub fn badge(&self) -> Badge {
        self.state.badge()
    }

    /// Replace the low-stock list from a fresh inventory fetch.
    pub fn ingest_inventory(&mut self, items: &[InventoryItem]) {
        self.reload_dismissed();
        self.state.low_stock = items
            .iter()
            .filter(|item| is_low_stock(item))
            .filter(|item| !self.is_dismissed(AlertKind::Stock, item.name.as_deref()))
            .map(LowStockItem::from)
            .collect();
        log::debug!(
            "Ingested {} inventory items, {} low on stock",
            items.len(),
            self.state.low_stock.len()
        );
        self.redraw();
    }

    /// Replace the expiring list from a fresh batch fetch.
    pub fn ingest_batches(&mut self, batches: &[Batch], now: DateTime<Utc>) {
        self.reload_dismissed();
        let window = self.settings.expiry_window_days;
        let mut expiring = Vec::new();

        for batch in batches {
            // Batches without a usable date never show up
            let Some(expires_at) = batch.expires_at else {
                continue;
            };
            let days = days_left(expires_at, now);
            if is_expiring(days, window) && !self.is_dismissed(AlertKind::Expiry, Some(&batch.id)) {
                expiring.push(ExpiringBatch::from_batch(batch, days));
            }
        }

        log::debug!(
            "Ingested {} batches, {} expiring within {window} days",
            batches.len(),
            expiring.len()
        );
        self.state.expiring = expiring;
        self.redraw();
    }

    /// Replace the system alert list from a fresh alerts fetch.
    pub fn ingest_api_alerts(&mut self, alerts: &[ApiAlert]) {
        let suppressed = &self.settings.suppressed_alert_types;
        self.state.api_alerts = alerts
            .iter()
            .filter(|alert| !is_suppressed_type(alert, suppressed))
            .cloned()
            .collect();
        log::debug!(
            "Ingested {} system alerts, {} kept",
            alerts.len(),
            self.state.api_alerts.len()
        );
        self.redraw();
    }

    /// Dismiss `id` locally and drop it from the matching list.
    ///
    /// Returns false if the id was already dismissed. No server call is made.
    pub fn acknowledge(&mut self, kind: AlertKind, id: &str) -> bool {
        // Read-modify-write the whole set
        self.reload_dismissed();
        let key = self.settings.dismissal_scope.key(kind, id);
        let inserted = self.dismissed.insert(key.clone());
        if inserted {
            self.pending.insert(key);
        }

        // Earlier failed writes are retried along with this one
        if !self.pending.is_empty() {
            match self.store.write(&self.dismissed) {
                Ok(()) => self.pending = DismissalSet::new(),
                Err(err) => log::warn!(
                    "Failed to persist dismissal of {kind} '{id}', {} pending: {err}",
                    self.pending.len()
                ),
            }
        }

        match kind {
            AlertKind::Stock => self
                .state
                .low_stock
                .retain(|item| item.identifier() != Some(id)),
            AlertKind::Expiry => self.state.expiring.retain(|batch| batch.id != id),
        }

        log::info!("Acknowledged {kind} alert '{id}'");
        self.redraw();
        inserted
    }

    fn is_dismissed(&self, kind: AlertKind, id: Option<&str>) -> bool {
        id.is_some_and(|id| {
            self.dismissed
                .contains(&self.settings.dismissal_scope.key(kind, id))
        })
    }

    fn reload_dismissed(&mut self) {
        match self.store.read() {
            Ok(set) => {
                self.dismissed = set;
                for key in self.pending.iter() {
                    self.dismissed.insert(key);
                }
            }
            Err(err) => log::warn!("Using cached dismissals, store read failed: {err}"),
        }
    }

    fn redraw(&self) {
        if let Some(renderer) = &self.renderer {
            renderer.redraw(&self.state, self.state.badge());
        }
    }
}
