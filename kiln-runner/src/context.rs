//! Run context
//!
//! State owned by a single run: its id, its private workspace, its log and
//! the abort flag observed between stages. Nothing here is shared between
//! runs.

use kiln_core::domain::log::{LogEntry, LogLevel};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Coarse-grained cancellation flag
///
/// Setting it never interrupts a stage; the executor checks it before
/// starting the next stage.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Execution context of one run
pub struct RunContext {
    run_id: Uuid,

    /// `<workspace base>/<run id>`
    workspace: PathBuf,

    log_buffer: Mutex<Vec<LogEntry>>,

    abort: AbortHandle,
}

impl RunContext {
    pub fn new(run_id: Uuid, workspace_base: &Path, abort: AbortHandle) -> Self {
        Self {
            run_id,
            workspace: workspace_base.join(run_id.to_string()),
            log_buffer: Mutex::new(Vec::new()),
            abort,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Checkout directory; mounted into the build container
    pub fn source_dir(&self) -> PathBuf {
        self.workspace.join("src")
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Adds a log entry to the run log
    pub fn add_log(&self, entry: LogEntry) {
        let mut buffer = self.log_buffer.lock().unwrap();
        buffer.push(entry);
    }

    pub fn log_debug(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(run_id = %self.run_id, "{}", message);
        self.add_log(LogEntry::now(LogLevel::Debug, message));
    }

    pub fn log_info(&self, message: impl Into<String>) {
        let message = message.into();
        info!(run_id = %self.run_id, "{}", message);
        self.add_log(LogEntry::now(LogLevel::Info, message));
    }

    pub fn log_warning(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(run_id = %self.run_id, "{}", message);
        self.add_log(LogEntry::now(LogLevel::Warning, message));
    }

    pub fn log_error(&self, message: impl Into<String>) {
        let message = message.into();
        error!(run_id = %self.run_id, "{}", message);
        self.add_log(LogEntry::now(LogLevel::Error, message));
    }

    /// Drains all log entries from the buffer
    pub fn drain_logs(&self) -> Vec<LogEntry> {
        let mut buffer = self.log_buffer.lock().unwrap();
        buffer.drain(..).collect()
    }
}
