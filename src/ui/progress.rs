use crate::status::{StatusViewer, WorkerStatus};
use crate::ui::theme;
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

/// How often worker lines are redrawn from a status snapshot
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(250);

/// Live view of the pool: one overall bar and one line per worker
pub struct Monitor {
    mp: MultiProgress,
    overall: ProgressBar,
    stop: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Monitor {
    pub fn start(total_files: usize, workers: usize, viewer: StatusViewer) -> Self {
        let mp = MultiProgress::new();
        let visible = console::Term::stderr().is_term();

        let overall = if visible {
            mp.add(ProgressBar::new(total_files as u64))
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} files {elapsed_precise}") {
            overall.set_style(style);
        }

        let lines: Vec<ProgressBar> = (0..workers)
            .map(|_| {
                if visible {
                    mp.add(ProgressBar::new_spinner())
                } else {
                    ProgressBar::hidden()
                }
            })
            .collect();

        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("monitor".into())
            .spawn(move || loop {
                for (worker, entry) in viewer.snapshot() {
                    if let Some(line) = lines.get(worker.0) {
                        let file = entry.current_file.as_deref().unwrap_or("-");
                        line.set_message(format!("{} {} {}", worker, status_label(&entry.status), file));
                    }
                }
                match stop_rx.recv_timeout(REFRESH_INTERVAL) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    _ => {
                        for line in &lines {
                            line.finish_and_clear();
                        }
                        break;
                    }
                }
            })
            .map_err(|e| tracing::warn!("Failed to start monitor: {}", e))
            .ok();

        Self {
            mp,
            overall,
            stop: Some(stop_tx),
            handle,
        }
    }

    /// One more file has been consumed
    pub fn advance(&self) {
        self.overall.inc(1);
    }

    pub fn finish(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender wakes the refresh loop
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.overall.finish_and_clear();
        self.mp.clear().ok();
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn status_label(status: &WorkerStatus) -> String {
    status.to_string().style(theme().worker(status)).to_string()
}
