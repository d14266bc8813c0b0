use colored::Colorize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, RwLock};

use crate::config::AppConfig;
use crate::logger::{Logger, RelayMetrics};

/// Snapshots queued per subscriber before the receiver is considered lagged.
const SNAPSHOT_CHANNEL_CAPACITY: usize = 256;

/// All shared state of one relay instance. Owned by the instance, never
/// ambient: a test harness can run several relays side by side.
pub struct RelayState {
    pub config: AppConfig,
    /// Bounded message history, oldest-first.
    history: RwLock<VecDeque<String>>,
    /// Live connections by id, holding their display labels.
    clients: RwLock<HashMap<u64, String>>,
    next_client_id: AtomicU64,
    snapshot_tx: broadcast::Sender<Vec<String>>,
    pub metrics: RwLock<RelayMetrics>,
    logger: Option<Logger>,
}

impl RelayState {
    pub fn new(config: AppConfig) -> Self {
        let logger = if config.log_to_file {
            match Logger::new(&config.log_dir) {
                Ok(logger) => Some(logger),
                Err(e) => {
                    eprintln!("Warning: session log disabled: {e}");
                    None
                }
            }
        } else {
            None
        };

        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);

        Self {
            config,
            history: RwLock::new(VecDeque::new()),
            clients: RwLock::new(HashMap::new()),
            next_client_id: AtomicU64::new(0),
            snapshot_tx,
            metrics: RwLock::new(RelayMetrics::new()),
            logger,
        }
    }

    /// Assign the next connection identity and register it. Labels count up
    /// from "Client 1"; ids are never reused.
    pub async fn register_client(&self) -> (u64, String) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed) + 1;
        let label = format!("Client {id}");
        self.clients.write().await.insert(id, label.clone());
        self.metrics.write().await.connections_opened += 1;
        println!("{}", format!("{label} connected").green());
        self.log(&format!("{label} connected"));
        (id, label)
    }

    /// Drop a connection from the registry. Disconnects trigger no broadcast.
    pub async fn deregister_client(&self, id: u64) {
        let removed = self.clients.write().await.remove(&id);
        if let Some(label) = removed {
            self.metrics.write().await.connections_closed += 1;
            println!("{}", format!("{label} disconnected").yellow());
            self.log(&format!("{label} disconnected"));
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Current history, oldest-first.
    pub async fn snapshot(&self) -> Vec<String> {
        self.history.read().await.iter().cloned().collect()
    }

    /// Subscribe to history snapshots; one receiver per connection.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<String>> {
        self.snapshot_tx.subscribe()
    }

    /// Append a message, trim to the configured bound (oldest entries go
    /// first) and fan the updated snapshot out to every subscriber.
    pub async fn append_and_broadcast(&self, message: String) -> Vec<String> {
        let mut history = self.history.write().await;
        history.push_back(message);
        while history.len() > self.config.max_history {
            history.pop_front();
        }
        let snapshot: Vec<String> = history.iter().cloned().collect();
        // The send happens under the write lock: concurrent appends serialize
        // here, so subscribers observe snapshots in append order.
        let _ = self.snapshot_tx.send(snapshot.clone());
        snapshot
    }

    // ── Session log wrappers: logging must never take the relay down ────

    pub fn log(&self, line: &str) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log(line) {
                eprintln!("Warning: failed to write session log: {e}");
            }
        }
    }

    pub fn log_inbound(&self, label: &str, raw: &str) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log_inbound(label, raw) {
                eprintln!("Warning: failed to write session log: {e}");
            }
        }
    }

    pub fn log_error(&self, error: &str) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log_error(error) {
                eprintln!("Warning: failed to write session log: {e}");
            }
        }
    }
}
