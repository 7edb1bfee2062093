//! Action dispatcher and its bounded worker pool.
//!
//! The pool is a fixed set of OS threads draining one task FIFO guarded
//! by a mutex and a condition variable. Shutdown happens on drop: the
//! stop flag is set, every worker is woken, remaining tasks drain, and
//! the workers are joined.

use crate::factory::ActionFactory;
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use shrike_event::Event;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Default worker count for the action pool
pub const DEFAULT_WORKERS: usize = 4;

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool is shutting down")]
    ShuttingDown,
}

struct PoolState {
    tasks: VecDeque<Task>,
    stop: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    available: Condvar,
}

/// Fixed-size pool of worker threads draining a shared task FIFO
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(num_threads: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                tasks: VecDeque::new(),
                stop: false,
            }),
            available: Condvar::new(),
        });

        let workers = (0..num_threads.max(1))
            .map(|worker_id| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || worker_loop(worker_id, shared))
            })
            .collect();

        Self { shared, workers }
    }

    /// Queue a task for some worker to run later. Fails once shutdown
    /// has begun.
    pub fn enqueue(&self, task: impl FnOnce() + Send + 'static) -> Result<(), PoolError> {
        {
            let mut state = self.shared.state.lock();
            if state.stop {
                return Err(PoolError::ShuttingDown);
            }
            state.tasks.push_back(Box::new(task));
        }
        self.shared.available.notify_one();
        Ok(())
    }

    /// Advisory count of tasks not yet claimed by a worker
    pub fn backlog(&self) -> usize {
        self.shared.state.lock().tasks.len()
    }
}

fn worker_loop(worker_id: usize, shared: Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.state.lock();
            loop {
                if let Some(task) = state.tasks.pop_front() {
                    break task;
                }
                // Workers exit only once stopped *and* drained.
                if state.stop {
                    debug!(worker_id, "worker exiting");
                    return;
                }
                shared.available.wait(&mut state);
            }
        };
        task();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shared.state.lock().stop = true;
        self.shared.available.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Façade submitting matched action configs to the worker pool
pub struct ActionDispatcher {
    factory: Arc<ActionFactory>,
    pool: ThreadPool,
}

impl ActionDispatcher {
    pub fn new(factory: Arc<ActionFactory>, workers: usize) -> Self {
        Self {
            factory,
            pool: ThreadPool::new(workers),
        }
    }

    pub fn with_default_workers(factory: Arc<ActionFactory>) -> Self {
        Self::new(factory, DEFAULT_WORKERS)
    }

    /// Construct each action config and submit its execution to the pool,
    /// in declaration order. Construction failures are isolated per
    /// action. The event is shared into every task, so it stays live
    /// until all of them finish. Returns the number of tasks submitted.
    pub fn dispatch(&self, actions: &[Value], event: &Arc<Event>) -> usize {
        let mut submitted = 0;
        for config in actions {
            let action = match self.factory.create(config) {
                Ok(action) => action,
                Err(error) => {
                    error!(%error, event_id = %event.id, "could not construct action, skipping");
                    continue;
                }
            };

            let task_event = Arc::clone(event);
            let queued = self.pool.enqueue(move || {
                if let Err(error) = action.execute(&task_event) {
                    error!(
                        kind = action.kind(),
                        %error,
                        event_id = %task_event.id,
                        "action execution failed"
                    );
                }
            });

            match queued {
                Ok(()) => submitted += 1,
                Err(error) => warn!(%error, event_id = %event.id, "dropping action task"),
            }
        }
        submitted
    }
}
