//! Periodic tick source.
//!
//! Emits one fixed event per interval, typically used as a heartbeat.

use super::{InputSource, SourceError};
use shrike_core::EventProcessor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

/// Sleep slice so stop() stays responsive under long intervals
const STOP_CHECK: Duration = Duration::from_millis(100);

pub struct TickSource {
    interval: Duration,
    event_type: String,
    message: String,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl TickSource {
    pub fn new(
        interval: Duration,
        event_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            interval,
            event_type: event_type.into(),
            message: message.into(),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl InputSource for TickSource {
    fn start(&mut self, processor: &EventProcessor) -> Result<(), SourceError> {
        if self.worker.is_some() {
            return Err(SourceError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);
        info!(event_type = %self.event_type, interval = ?self.interval, "tick source started");

        let interval = self.interval;
        let event_type = self.event_type.clone();
        let message = self.message.clone();
        let running = Arc::clone(&self.running);
        let processor = processor.clone();

        self.worker = Some(std::thread::spawn(move || {
            let source_id = format!("timer:{}", event_type);
            while running.load(Ordering::SeqCst) {
                if !interruptible_sleep(interval, &running) {
                    break;
                }
                let fed = processor.process_raw_data_with_key(
                    &source_id,
                    &event_type,
                    "message",
                    message.clone(),
                );
                if let Err(error) = fed {
                    warn!(%error, "tick event not normalized");
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        info!(event_type = %self.event_type, "tick source stopped");
    }
}

impl Drop for TickSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep for `total`, waking early when the flag clears. Returns false
/// when interrupted.
pub(crate) fn interruptible_sleep(total: Duration, running: &AtomicBool) -> bool {
    let mut remaining = total;
    while remaining > Duration::ZERO {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let slice = remaining.min(STOP_CHECK);
        std::thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
    running.load(Ordering::SeqCst)
}
