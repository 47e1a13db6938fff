use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval};

use crate::core::{
    alerts::{
        engine::AlertAggregator,
        model::{Badge, NotificationState},
        view::{bell_entries, critical_items, BellRenderer, CRITICAL_ITEMS_LIMIT},
    },
    client::ApiClient,
    config::{AppDirs, ConfigManager},
    coordinator::{Coordinator, Source},
    dismissals::{
        model::AlertKind,
        store::{DismissalStore, JsonFileDismissalStore},
    },
    error::Result,
};

const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Operator input read from stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopCommand {
    /// Local dismissal of a low-stock or expiry alert
    Acknowledge { kind: AlertKind, id: String },
    /// Backend acknowledgement of a system alert
    AcknowledgeSystem(String),
    /// Refetch one source, or all of them
    Refresh(Option<Source>),
    Show,
    Quit,
}

/// Parse one line of operator input.
///
/// `ack stock <name>`, `ack expiry <id>`, `ack alert <id>`,
/// `refresh [inventory|batches|alerts]`, `show`, `quit`.
pub fn parse_command(line: &str) -> std::result::Result<LoopCommand, String> {
    let mut parts = line.trim().splitn(3, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();

    match verb {
        "ack" => {
            let target = parts.next().ok_or("usage: ack <stock|expiry|alert> <id>")?;
            // Item names may contain spaces, keep the rest of the line intact
            let id = parts
                .next()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or("usage: ack <stock|expiry|alert> <id>")?
                .to_owned();
            if target == "alert" {
                return Ok(LoopCommand::AcknowledgeSystem(id));
            }
            Ok(LoopCommand::Acknowledge {
                kind: target.parse()?,
                id,
            })
        }
        "refresh" => match parts.next().map(str::trim).filter(|s| !s.is_empty()) {
            Some(source) => Ok(LoopCommand::Refresh(Some(source.parse()?))),
            None => Ok(LoopCommand::Refresh(None)),
        },
        "show" => Ok(LoopCommand::Show),
        "quit" | "exit" => Ok(LoopCommand::Quit),
        other => Err(format!("unknown command '{other}'")),
    }
}

/// Renders the bell into the log.
pub struct LogRenderer;

impl BellRenderer for LogRenderer {
    fn redraw(&self, state: &NotificationState, badge: Badge) {
        if !badge.is_visible() {
            log::info!("Bell: all caught up");
            return;
        }

        log::info!(
            "Bell [{}]: {} low stock, {} expiring, {} system",
            badge.label(),
            state.low_stock.len(),
            state.expiring.len(),
            state.api_alerts.len()
        );
        for entry in bell_entries(state) {
            log::info!(
                "  {:<9} {:<14} {} ({})",
                entry.kind.label(),
                entry.branch,
                entry.item,
                entry.detail
            );
        }
    }
}

/// Load settings, open storage and run the bell until quit or Ctrl-C.
pub fn run() -> Result<()> {
    let dirs = AppDirs::resolve()?;
    let config_manager = ConfigManager::new(dirs.config_dir.clone());
    let settings = config_manager.load();
    if !config_manager.config_path().exists() {
        // First run: leave an editable settings file behind
        if let Err(err) = config_manager.save(&settings) {
            log::warn!("Could not write default settings: {err}");
        }
    }
    log::info!("Using settings from {:?}", config_manager.config_path());

    let data_dir = settings.data_dir.clone().unwrap_or(dirs.data_dir);
    let store = JsonFileDismissalStore::new(&data_dir);
    log::info!("Dismissals stored in {:?}", store.path());

    let client = ApiClient::from_settings(&settings)?;
    log::info!("Backend at {}", client.base());

    let mut aggregator = AlertAggregator::new(store, settings.alert_settings.clone());
    aggregator.set_renderer(Box::new(LogRenderer));
    let coordinator = Coordinator::new(client, aggregator);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let refresh_interval = settings
        .refresh_interval_secs
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);
    runtime.block_on(event_loop(coordinator, refresh_interval));
    // Stdin reads block a worker thread, don't wait on them forever
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(())
}

async fn event_loop<S: DismissalStore>(
    mut coordinator: Coordinator<S>,
    refresh_interval: Option<Duration>,
) {
    let (tx, mut rx) = mpsc::channel(32);
    tokio::spawn(read_commands(tx));

    // The initial fetch happens right away, ticks start one period later
    let mut ticker =
        refresh_interval.map(|period| tokio::time::interval_at(Instant::now() + period, period));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    coordinator.refresh_all();

    loop {
        tokio::select! {
            Some(update) = coordinator.next_update() => coordinator.apply(update),
            Some(command) = rx.recv() => {
                if !handle_command(&mut coordinator, command) {
                    break;
                }
            }
            () = tick(&mut ticker) => {
                log::debug!("Periodic refresh");
                coordinator.refresh_all();
            }
            _ = &mut shutdown => {
                log::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    coordinator.shutdown();
}

/// Returns false when the loop should stop.
fn handle_command<S: DismissalStore>(
    coordinator: &mut Coordinator<S>,
    command: LoopCommand,
) -> bool {
    match command {
        LoopCommand::Acknowledge { kind, id } => {
            if !coordinator.acknowledge(kind, &id) {
                log::info!("{kind} alert '{id}' was already acknowledged");
            }
        }
        LoopCommand::AcknowledgeSystem(id) => coordinator.acknowledge_system_alert(id),
        LoopCommand::Refresh(Some(source)) => coordinator.refresh(source),
        LoopCommand::Refresh(None) => coordinator.refresh_all(),
        LoopCommand::Show => {
            let aggregator = coordinator.aggregator();
            LogRenderer.redraw(aggregator.state(), aggregator.badge());
            for item in critical_items(&aggregator.state().low_stock, CRITICAL_ITEMS_LIMIT) {
                log::info!(
                    "  critical: {} ({} of {})",
                    item.name.as_deref().unwrap_or("Unknown Item"),
                    item.quantity,
                    item.reorder_level
                );
            }
        }
        LoopCommand::Quit => return false,
    }
    true
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn read_commands(tx: mpsc::Sender<LoopCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match parse_command(&line) {
                Ok(command) => {
                    if tx.send(command).await.is_err() {
                        break;
                    }
                }
                Err(msg) => log::warn!("{msg}"),
            },
            Ok(None) => {
                log::debug!("stdin closed, no more commands");
                break;
            }
            Err(err) => {
                log::warn!("Failed to read command: {err}");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alerts::engine::AlertSettings;
    use crate::core::dismissals::store::MemoryDismissalStore;

    #[test]
    fn test_parse_ack_commands() {
        assert_eq!(
            parse_command("ack stock Gauze Pads 10cm"),
            Ok(LoopCommand::Acknowledge {
                kind: AlertKind::Stock,
                id: "Gauze Pads 10cm".into()
            })
        );
        assert_eq!(
            parse_command("  ack expiry B1 "),
            Ok(LoopCommand::Acknowledge {
                kind: AlertKind::Expiry,
                id: "B1".into()
            })
        );
        assert_eq!(
            parse_command("ack alert branch-low-Main"),
            Ok(LoopCommand::AcknowledgeSystem("branch-low-Main".into()))
        );
        assert!(parse_command("ack stock").is_err());
        assert!(parse_command("ack order 5").is_err());
    }

    #[test]
    fn test_parse_other_commands() {
        assert_eq!(parse_command("refresh"), Ok(LoopCommand::Refresh(None)));
        assert_eq!(
            parse_command("refresh batches"),
            Ok(LoopCommand::Refresh(Some(Source::Batches)))
        );
        assert!(parse_command("refresh orders").is_err());
        assert_eq!(parse_command("show"), Ok(LoopCommand::Show));
        assert_eq!(parse_command("quit"), Ok(LoopCommand::Quit));
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_handle_command_quit_and_ack() {
        let client = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let aggregator =
            AlertAggregator::new(MemoryDismissalStore::new(), AlertSettings::default());
        let mut coordinator = Coordinator::new(client, aggregator);

        assert!(handle_command(
            &mut coordinator,
            LoopCommand::Acknowledge {
                kind: AlertKind::Stock,
                id: "Gauze".into()
            }
        ));
        assert!(coordinator.aggregator().dismissed().contains("Gauze"));
        assert!(handle_command(&mut coordinator, LoopCommand::Show));
        assert!(!handle_command(&mut coordinator, LoopCommand::Quit));
    }
}
