//! Thread-safe event queue decoupling producers from the evaluator.
//!
//! An unbounded FIFO guarded by one mutex and one condition variable.
//! `push` never blocks and wakes at most one waiting consumer; `pop`
//! blocks until an event arrives; `try_pop` never waits. Overload is
//! handled by unbounded growth, so the queue itself never fails.

use parking_lot::{Condvar, Mutex};
use shrike_event::Event;
use std::collections::VecDeque;

#[derive(Default)]
pub struct EventQueue {
    events: Mutex<VecDeque<Event>>,
    available: Condvar,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transfer an event into the queue and wake one waiting consumer
    pub fn push(&self, event: Event) {
        self.events.lock().push_back(event);
        self.available.notify_one();
    }

    /// Remove and return the oldest event, blocking while the queue is
    /// empty. Each event is delivered to exactly one caller.
    pub fn pop(&self) -> Event {
        let mut events = self.events.lock();
        loop {
            if let Some(event) = events.pop_front() {
                return event;
            }
            self.available.wait(&mut events);
        }
    }

    /// Remove and return the oldest event if one is present
    pub fn try_pop(&self) -> Option<Event> {
        self.events.lock().pop_front()
    }

    /// Advisory snapshot of the queue depth
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Advisory emptiness check
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
