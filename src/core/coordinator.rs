use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::alerts::engine::AlertAggregator;
use super::client::ApiClient;
use super::dismissals::model::AlertKind;
use super::dismissals::store::DismissalStore;
use super::model::{ApiAlert, Batch, InventoryItem};

/// One of the three independently fetched inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Inventory,
    Batches,
    Alerts,
}

impl Source {
    pub fn all() -> &'static [Source] {
        &[Self::Inventory, Self::Batches, Self::Alerts]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Batches => "batches",
            Self::Alerts => "alerts",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inventory" => Ok(Self::Inventory),
            "batches" => Ok(Self::Batches),
            "alerts" => Ok(Self::Alerts),
            other => Err(format!("unknown source '{other}'")),
        }
    }
}

/// Result of a successful fetch, waiting to be applied.
#[derive(Debug, Clone)]
pub enum SourceUpdate {
    Inventory(Vec<InventoryItem>),
    Batches(Vec<Batch>),
    Alerts(Vec<ApiAlert>),
}

impl SourceUpdate {
    pub fn source(&self) -> Source {
        match self {
            Self::Inventory(_) => Source::Inventory,
            Self::Batches(_) => Source::Batches,
            Self::Alerts(_) => Source::Alerts,
        }
    }
}

/// Runs one-shot fetch tasks and feeds their results to the aggregator.
///
/// Tasks run concurrently, but updates are only applied from the task that
/// owns the coordinator. A failed task sends nothing, so its slice keeps the
/// last good data.
pub struct Coordinator<S> {
    client: Arc<ApiClient>,
    aggregator: AlertAggregator<S>,
    tx: mpsc::UnboundedSender<SourceUpdate>,
    rx: mpsc::UnboundedReceiver<SourceUpdate>,
    tasks: JoinSet<()>,
}

impl<S: DismissalStore> Coordinator<S> {
    pub fn new(client: ApiClient, aggregator: AlertAggregator<S>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client: Arc::new(client),
            aggregator,
            tx,
            rx,
            tasks: JoinSet::new(),
        }
    }

    pub fn aggregator(&self) -> &AlertAggregator<S> {
        &self.aggregator
    }

    pub fn aggregator_mut(&mut self) -> &mut AlertAggregator<S> {
        &mut self.aggregator
    }

    /// Number of fetch tasks still running.
    pub fn in_flight(&mut self) -> usize {
        self.reap();
        self.tasks.len()
    }

    /// Start a fetch for one source. Must be called inside a Tokio runtime.
    pub fn refresh(&mut self, source: Source) {
        self.reap();
        let client = self.client.clone();
        let tx = self.tx.clone();
        self.tasks.spawn(async move {
            if let Some(update) = fetch(&client, source).await {
                // Receiver gone means the coordinator is shutting down
                let _ = tx.send(update);
            }
        });
    }

    pub fn refresh_all(&mut self) {
        for source in Source::all() {
            self.refresh(*source);
        }
    }

    /// Wait for the next fetched update.
    pub async fn next_update(&mut self) -> Option<SourceUpdate> {
        self.rx.recv().await
    }

    /// Apply a fetched update to its slice of the notification state.
    pub fn apply(&mut self, update: SourceUpdate) {
        log::info!("Applying {} update", update.source());
        match update {
            SourceUpdate::Inventory(items) => self.aggregator.ingest_inventory(&items),
            // Days are counted from when the data is processed
            SourceUpdate::Batches(batches) => self.aggregator.ingest_batches(&batches, Utc::now()),
            SourceUpdate::Alerts(alerts) => self.aggregator.ingest_api_alerts(&alerts),
        }
    }

    /// Dismiss a low-stock or expiry alert locally.
    pub fn acknowledge(&mut self, kind: AlertKind, id: &str) -> bool {
        self.aggregator.acknowledge(kind, id)
    }

    /// Acknowledge a system alert on the backend, then refetch alerts.
    pub fn acknowledge_system_alert(&mut self, alert_id: String) {
        self.reap();
        let client = self.client.clone();
        let tx = self.tx.clone();
        self.tasks.spawn(async move {
            if let Err(err) = client.acknowledge_alert(&alert_id).await {
                log::warn!("Failed to acknowledge alert '{alert_id}': {err}");
                return;
            }
            log::info!("Acknowledged system alert '{alert_id}'");
            if let Some(update) = fetch(&client, Source::Alerts).await {
                let _ = tx.send(update);
            }
        });
    }

    /// Abort every in-flight task. State stays as it is.
    pub fn shutdown(&mut self) {
        if !self.tasks.is_empty() {
            log::info!("Aborting {} in-flight fetches", self.tasks.len());
        }
        self.tasks.abort_all();
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(err) = result {
                if err.is_panic() {
                    log::error!("Fetch task panicked: {err}");
                }
            }
        }
    }
}

async fn fetch(client: &ApiClient, source: Source) -> Option<SourceUpdate> {
    let result = match source {
        Source::Inventory => client.fetch_inventory().await.map(SourceUpdate::Inventory),
        Source::Batches => client.fetch_batches().await.map(SourceUpdate::Batches),
        Source::Alerts => client.fetch_alerts().await.map(SourceUpdate::Alerts),
    };

    match result {
        Ok(update) => Some(update),
        Err(err) => {
            log::warn!("Fetching {source} failed, keeping previous data: {err}");
            None
        }
    }
}
