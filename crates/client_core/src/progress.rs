//! Cosmetic progress indicator shown while media is being rendered or edited.
//!
//! The ticker only drives a number for the UI. It never decides when work is
//! done; the owning workflow snaps it to 100 or back to 0 when the call resolves.

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle};

pub const TICK_INTERVAL: Duration = Duration::from_millis(150);
pub const CEILING: f32 = 95.0;
pub const COMPLETE: f32 = 100.0;
const STEP_FRACTION: f32 = 0.04;

/// One tick: close a fixed fraction of the remaining gap to [`CEILING`].
pub fn advance(current: f32) -> f32 {
    if current >= CEILING {
        return CEILING;
    }
    (current + (CEILING - current) * STEP_FRACTION).min(CEILING)
}

pub struct ProgressTicker {
    handle: JoinHandle<()>,
    progress: Arc<watch::Sender<f32>>,
}

impl ProgressTicker {
    pub fn start(progress: Arc<watch::Sender<f32>>) -> Self {
        progress.send_replace(0.0);
        let tx = Arc::clone(&progress);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                let next = advance(*tx.borrow());
                tx.send_replace(next);
            }
        });
        Self { handle, progress }
    }

    pub fn complete(self) {
        self.handle.abort();
        self.progress.send_replace(COMPLETE);
    }

    pub fn cancel(self) {
        self.handle.abort();
        self.progress.send_replace(0.0);
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
