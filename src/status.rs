//! Worker status board
//!
//! A single thread owns the map from worker id to `{current_file, status}`.
//! Workers and the coordinator talk to it only through messages, and every
//! [`StatusReporter`] is bound to one worker id, so no two writers share a key.

use crossbeam::channel::{self, Receiver, Sender};
use std::collections::BTreeMap;
use std::thread;

/// Identity of a worker in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(pub usize);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// What a worker is doing right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStatus {
    Idle,
    Processing,
    Skipped,
    Error(String),
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerStatus::Idle => write!(f, "Idle"),
            WorkerStatus::Processing => write!(f, "Processing"),
            WorkerStatus::Skipped => write!(f, "Skipped (cached)"),
            WorkerStatus::Error(reason) => write!(f, "Error: {}", reason),
        }
    }
}

/// One entry of the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEntry {
    pub current_file: Option<String>,
    pub status: WorkerStatus,
}

impl WorkerEntry {
    fn idle() -> Self {
        Self {
            current_file: None,
            status: WorkerStatus::Idle,
        }
    }
}

pub type StatusSnapshot = BTreeMap<WorkerId, WorkerEntry>;

enum StatusCommand {
    Set { worker: WorkerId, entry: WorkerEntry },
    /// Mark idle, but only while the entry still names `file`
    Release { worker: WorkerId, file: String },
    Snapshot(Sender<StatusSnapshot>),
    Shutdown,
}

/// Owner of the status actor thread
pub struct StatusBoard {
    tx: Sender<StatusCommand>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StatusBoard {
    /// Start the actor with every worker registered as idle
    pub fn start(workers: usize) -> Self {
        let (tx, rx) = channel::unbounded::<StatusCommand>();
        let initial: StatusSnapshot = (0..workers).map(|i| (WorkerId(i), WorkerEntry::idle())).collect();

        let handle = thread::Builder::new()
            .name("status-board".into())
            .spawn(move || run_board(initial, rx))
            .map_err(|e| tracing::error!("Failed to start status board: {}", e))
            .ok();

        Self { tx, handle }
    }

    /// A writer bound to `worker`'s entry
    pub fn reporter(&self, worker: WorkerId) -> StatusReporter {
        StatusReporter {
            worker,
            tx: self.tx.clone(),
        }
    }

    /// A read-only handle for monitors
    pub fn viewer(&self) -> StatusViewer {
        StatusViewer { tx: self.tx.clone() }
    }

    /// Current view of all workers (empty if the actor is gone)
    pub fn snapshot(&self) -> StatusSnapshot {
        self.viewer().snapshot()
    }
}

impl Drop for StatusBoard {
    fn drop(&mut self) {
        // Reporters may outlive the board; their later sends are dropped
        let _ = self.tx.send(StatusCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_board(mut entries: StatusSnapshot, rx: Receiver<StatusCommand>) {
    for command in rx {
        match command {
            StatusCommand::Set { worker, entry } => {
                entries.insert(worker, entry);
            }
            StatusCommand::Release { worker, file } => {
                if let Some(entry) = entries.get_mut(&worker) {
                    if entry.current_file.as_deref() == Some(file.as_str()) {
                        *entry = WorkerEntry::idle();
                    }
                }
            }
            StatusCommand::Snapshot(reply) => {
                let _ = reply.send(entries.clone());
            }
            StatusCommand::Shutdown => break,
        }
    }
}

/// Writes the status of exactly one worker
#[derive(Clone)]
pub struct StatusReporter {
    worker: WorkerId,
    tx: Sender<StatusCommand>,
}

impl StatusReporter {
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    fn set(&self, file: Option<&str>, status: WorkerStatus) {
        let entry = WorkerEntry {
            current_file: file.map(str::to_string),
            status,
        };
        // A closed board only means nobody is watching
        let _ = self.tx.send(StatusCommand::Set { worker: self.worker, entry });
    }

    pub fn processing(&self, file: &str) {
        self.set(Some(file), WorkerStatus::Processing);
    }

    pub fn skipped(&self, file: &str) {
        self.set(Some(file), WorkerStatus::Skipped);
    }

    pub fn error(&self, file: &str, reason: impl Into<String>) {
        self.set(Some(file), WorkerStatus::Error(reason.into()));
    }

    pub fn idle(&self) {
        self.set(None, WorkerStatus::Idle);
    }

    /// Mark idle once `file` has been consumed, unless the worker already moved on
    pub fn release(&self, file: &str) {
        let _ = self.tx.send(StatusCommand::Release {
            worker: self.worker,
            file: file.to_string(),
        });
    }
}

/// Reads snapshots of the board
#[derive(Clone)]
pub struct StatusViewer {
    tx: Sender<StatusCommand>,
}

impl StatusViewer {
    pub fn snapshot(&self) -> StatusSnapshot {
        let (reply_tx, reply_rx) = channel::bounded(1);
        if self.tx.send(StatusCommand::Snapshot(reply_tx)).is_err() {
            return StatusSnapshot::new();
        }
        reply_rx.recv().unwrap_or_default()
    }
}
