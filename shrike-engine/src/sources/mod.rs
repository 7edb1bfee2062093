//! Input sources.
//!
//! Each source owns one OS thread that normalizes its raw input through
//! the [`EventProcessor`](shrike_core::EventProcessor). Sources stop via
//! an atomic flag and join their thread, so shutdown is graceful.

use thiserror::Error;

mod file_watcher;
mod simulator;
mod socket;
mod timer;

pub use file_watcher::{FileContent, FileWatcher};
pub use simulator::SensorSimulator;
pub use socket::SocketListener;
pub use timer::TickSource;

/// Failure starting an input source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not bind socket listener on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("source is already running")]
    AlreadyRunning,
}

/// One producer feeding the event pipeline from its own thread
pub trait InputSource {
    /// Spawn the producer thread
    fn start(&mut self, processor: &shrike_core::EventProcessor) -> Result<(), SourceError>;

    /// Signal the producer to stop and join its thread
    fn stop(&mut self);
}
