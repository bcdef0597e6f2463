//! Indeterminate console spinner.

use std::io::{IsTerminal, Write};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];

/// Redraw interval.
pub const SPINNER_TICK: Duration = Duration::from_millis(200);

pub fn frame(tick: usize) -> char {
    FRAMES[tick % FRAMES.len()]
}

/// Spinner drawn on stderr by a background task until [`stop`](Spinner::stop).
///
/// Nothing is drawn when stderr is not a terminal.
pub struct Spinner {
    stop: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Spinner {
    pub fn start(tick: Duration) -> Self {
        let stop = CancellationToken::new();
        if !std::io::stderr().is_terminal() {
            return Self { stop, task: None };
        }

        let token = stop.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            let mut ticks = 0usize;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let mut stderr = std::io::stderr().lock();
                        let _ = write!(stderr, "\r{}", frame(ticks));
                        let _ = stderr.flush();
                        ticks = ticks.wrapping_add(1);
                    }
                }
            }
            let mut stderr = std::io::stderr().lock();
            let _ = write!(stderr, "\r \r");
            let _ = stderr.flush();
        });

        Self {
            stop,
            task: Some(task),
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.task.is_some()
    }

    /// Stop drawing and wait for the line to be cleared.
    pub async fn stop(self) {
        self.stop.cancel();
        if let Some(task) = self.task {
            let _ = task.await;
        }
    }
}
