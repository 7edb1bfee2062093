//! Shrike Core
//!
//! The in-process pipeline around the event queue: normalization of raw
//! input into events, the queue itself, and the action side — factory,
//! built-in actions, and the dispatcher with its worker pool.

pub mod action;
pub mod dispatcher;
pub mod factory;
pub mod processor;
pub mod queue;
pub mod template;

pub use action::{Action, ActionError, HttpAction, LogAction, ShellAction};
pub use dispatcher::{ActionDispatcher, PoolError, ThreadPool, DEFAULT_WORKERS};
pub use factory::{ActionFactory, FactoryError};
pub use processor::{EventProcessor, ProcessError};
pub use queue::EventQueue;
