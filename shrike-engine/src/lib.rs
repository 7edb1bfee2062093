//! Shrike Engine
//!
//! The evaluation loop and lifecycle orchestration: a dedicated thread
//! pulls events off the queue, asks the rule manager for matching action
//! configs, and hands matches to the dispatcher. Input sources run on
//! their own threads and feed the queue through the event processor.

use shrike_core::{ActionDispatcher, EventQueue};
use shrike_rules::RuleManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, trace};

pub mod sources;

pub use sources::{
    FileContent, FileWatcher, InputSource, SensorSimulator, SocketListener, SourceError,
    TickSource,
};

/// Engine loop configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Idle sleep between empty queue polls
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// The evaluation loop, running on its own OS thread.
///
/// Polling with `try_pop` rather than a blocking `pop` keeps shutdown
/// free of sentinel events: the loop observes the running flag between
/// polls and exits on its own.
pub struct Engine {
    queue: Arc<EventQueue>,
    rules: Arc<RuleManager>,
    dispatcher: Arc<ActionDispatcher>,
    config: EngineConfig,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn new(
        queue: Arc<EventQueue>,
        rules: Arc<RuleManager>,
        dispatcher: Arc<ActionDispatcher>,
        config: EngineConfig,
    ) -> Self {
        Self {
            queue,
            rules,
            dispatcher,
            config,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Spawn the evaluation thread. A second call is a no-op.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        let queue = Arc::clone(&self.queue);
        let rules = Arc::clone(&self.rules);
        let dispatcher = Arc::clone(&self.dispatcher);
        let running = Arc::clone(&self.running);
        let poll_interval = self.config.poll_interval;

        self.worker = Some(std::thread::spawn(move || {
            info!(rules = rules.rules_count(), "engine loop started");
            while running.load(Ordering::SeqCst) {
                match queue.try_pop() {
                    Some(event) => {
                        let actions = rules.evaluate(&event);
                        if actions.is_empty() {
                            trace!(event_id = %event.id, "no rules matched");
                            continue;
                        }
                        debug!(
                            event_id = %event.id,
                            actions = actions.len(),
                            "dispatching matched actions"
                        );
                        let event = Arc::new(event);
                        dispatcher.dispatch(&actions, &event);
                    }
                    None => std::thread::sleep(poll_interval),
                }
            }
            info!("engine loop stopped");
        }));
    }

    /// Signal the loop to stop and join it. In-flight action tasks keep
    /// running on the pool until the dispatcher itself is dropped.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
