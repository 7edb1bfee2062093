//! Simulated sensor source for demos and load testing.
//!
//! Emits randomized `sensor_reading` events on an interval, exercising
//! the structured-record entry point end to end.

use super::timer::interruptible_sleep;
use super::{InputSource, SourceError};
use rand::Rng;
use serde::Serialize;
use shrike_core::EventProcessor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

const LOCATIONS: [&str; 4] = ["LivingRoom", "Kitchen", "Garage", "Bedroom"];

#[derive(Debug, Serialize)]
struct SensorReading {
    temperature: f64,
    humidity: i64,
    location: &'static str,
}

pub struct SensorSimulator {
    interval: Duration,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SensorSimulator {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl InputSource for SensorSimulator {
    fn start(&mut self, processor: &EventProcessor) -> Result<(), SourceError> {
        if self.worker.is_some() {
            return Err(SourceError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);
        info!(interval = ?self.interval, "sensor simulator started");

        let interval = self.interval;
        let running = Arc::clone(&self.running);
        let processor = processor.clone();

        self.worker = Some(std::thread::spawn(move || {
            let mut rng = rand::thread_rng();
            while running.load(Ordering::SeqCst) {
                if !interruptible_sleep(interval, &running) {
                    break;
                }
                let reading = SensorReading {
                    temperature: rng.gen_range(15.0..40.0),
                    humidity: rng.gen_range(20..80),
                    location: LOCATIONS[rng.gen_range(0..LOCATIONS.len())],
                };
                let fed =
                    processor.process_structured("simulator:sensors", "sensor_reading", &reading);
                if let Err(error) = fed {
                    warn!(%error, "simulated reading not normalized");
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
        info!("sensor simulator stopped");
    }
}

impl Drop for SensorSimulator {
    fn drop(&mut self) {
        self.stop();
    }
}
