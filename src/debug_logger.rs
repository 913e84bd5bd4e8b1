// Debug logging module for asynchronous decision logging
//
// Fire-and-forget async logging so the request/response cycle never waits on
// disk. Each decided turn is appended to a JSONL file that the replay tool
// reads back.

use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::bot::MoveDecision;
use crate::types::GameState;

/// One logged turn: the full request and what the engine answered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub turn: i32,
    pub chosen_move: String,
    pub state: GameState,
    #[serde(default)]
    pub depth: u8,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub timestamp: String,
}

impl LogEntry {
    pub fn new(state: GameState, decision: &MoveDecision) -> Self {
        LogEntry {
            turn: state.turn,
            chosen_move: decision.direction.as_str().to_string(),
            state,
            depth: decision.depth,
            score: decision.score,
            rationale: decision.rationale.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Shared debug logger state
/// Uses Arc<Mutex<File>> to allow concurrent async writes from multiple tasks
#[derive(Clone)]
pub struct DebugLogger {
    file: Arc<Mutex<Option<File>>>,
    enabled: bool,
}

impl DebugLogger {
    /// Creates a new debug logger
    /// If enabled is true, initializes the log file (truncating if it exists)
    pub async fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return Self::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
            .await
        {
            Ok(file) => {
                log::info!("Debug logging enabled: {}", log_file_path);
                DebugLogger {
                    file: Arc::new(Mutex::new(Some(file))),
                    enabled: true,
                }
            }
            Err(e) => {
                error!("Failed to create debug log file '{}': {}", log_file_path, e);
                Self::disabled()
            }
        }
    }

    /// Creates a disabled debug logger (no-op)
    pub fn disabled() -> Self {
        DebugLogger {
            file: Arc::new(Mutex::new(None)),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logs a move decision asynchronously (fire-and-forget).
    /// Must be called from within a tokio runtime.
    pub fn log_move(&self, state: GameState, decision: &MoveDecision) {
        if !self.enabled {
            return;
        }

        let file_handle = self.file.clone();
        let entry = LogEntry::new(state, decision);

        tokio::spawn(async move {
            Self::write_entry(file_handle, entry).await;
        });
    }

    /// Writes one entry and flushes, awaiting completion
    pub async fn write_entry(file_handle: Arc<Mutex<Option<File>>>, entry: LogEntry) {
        let mut file_guard = file_handle.lock().await;

        if let Some(file) = file_guard.as_mut() {
            match serde_json::to_string(&entry) {
                Ok(json_line) => {
                    let line_with_newline = format!("{}\n", json_line);
                    if let Err(e) = file.write_all(line_with_newline.as_bytes()).await {
                        error!("Failed to write debug log entry: {}", e);
                    } else if let Err(e) = file.flush().await {
                        error!("Failed to flush debug log: {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to serialize debug log entry for turn {}: {}", entry.turn, e);
                }
            }
        }
    }

    /// Writes one entry in place, for callers that need it on disk before
    /// moving on
    pub async fn log_move_now(&self, state: GameState, decision: &MoveDecision) {
        if self.enabled {
            Self::write_entry(self.file.clone(), LogEntry::new(state, decision)).await;
        }
    }
}
