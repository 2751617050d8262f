//! Shared application state for the web server.

use std::sync::Arc;

use sciagg_common::AppConfig;
use sciagg_db::Database;
use sciagg_ingestion::HarvestProgress;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// Progress from a running harvest
    Harvest(HarvestProgress),
    /// A dashboard action moved to a new stage
    ActionStatus { action: String, stage: String, message: String },
    /// Shown as a notice on the dashboard
    Notification { level: String, message: String },
}

impl AppEvent {
    pub fn status(action: &str, stage: &str, message: impl Into<String>) -> Self {
        AppEvent::ActionStatus { action: action.into(), stage: stage.into(), message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        AppEvent::Notification { level: "error".into(), message: message.into() }
    }
}

/// Shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<AppConfig>,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
    /// Held while a collect/process/rebuild action runs.
    busy: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Arc<AppConfig>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self { db, config, event_tx, busy: Arc::new(Mutex::new(())) }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    pub fn emit(&self, event: AppEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    /// Claim the action slot; `None` while another action is running.
    pub fn try_begin_action(&self) -> Option<OwnedMutexGuard<()>> {
        self.busy.clone().try_lock_owned().ok()
    }

    pub fn action_running(&self) -> bool {
        self.busy.try_lock().is_err()
    }
}

pub type SharedState = Arc<AppState>;
