//! TCP socket input source.
//!
//! Accepts connections on a configured port and reads newline-delimited
//! JSON objects, one event per line. Each connection gets a handler
//! thread; handlers exit on EOF, on a read error, or when the source
//! stops.

use super::{InputSource, SourceError};
use shrike_core::EventProcessor;
use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

const ACCEPT_POLL: Duration = Duration::from_millis(100);
const READ_TIMEOUT: Duration = Duration::from_millis(500);

pub struct SocketListener {
    port: u16,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SocketListener {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Port actually bound; useful when constructed with port 0
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl InputSource for SocketListener {
    fn start(&mut self, processor: &EventProcessor) -> Result<(), SourceError> {
        if self.worker.is_some() {
            return Err(SourceError::AlreadyRunning);
        }

        let listener =
            TcpListener::bind(("0.0.0.0", self.port)).map_err(|source| SourceError::Bind {
                port: self.port,
                source,
            })?;
        // Record the kernel-assigned port when bound with 0.
        if let Ok(addr) = listener.local_addr() {
            self.port = addr.port();
        }
        listener
            .set_nonblocking(true)
            .map_err(|source| SourceError::Bind {
                port: self.port,
                source,
            })?;

        self.running.store(true, Ordering::SeqCst);
        info!(port = self.port, "socket listener started");

        let running = Arc::clone(&self.running);
        let processor = processor.clone();
        let port = self.port;

        self.worker = Some(std::thread::spawn(move || {
            accept_loop(listener, port, &running, &processor);
        }));
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        info!(port = self.port, "socket listener stopped");
    }
}

impl Drop for SocketListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: TcpListener,
    port: u16,
    running: &Arc<AtomicBool>,
    processor: &EventProcessor,
) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(port, %peer, "connection accepted");
                let running = Arc::clone(running);
                let processor = processor.clone();
                std::thread::spawn(move || {
                    handle_connection(stream, port, &running, &processor);
                });
            }
            Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL);
            }
            Err(error) => {
                warn!(port, %error, "accept failed");
                std::thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn handle_connection(
    stream: TcpStream,
    port: u16,
    running: &AtomicBool,
    processor: &EventProcessor,
) {
    let source_id = format!("socket:{}", port);
    if let Err(error) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
        warn!(%error, "could not set read timeout, dropping connection");
        return;
    }

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    while running.load(Ordering::SeqCst) {
        match reader.read_line(&mut line) {
            // EOF: client closed the connection.
            Ok(0) => break,
            Ok(_) => {
                let raw = line.trim();
                if !raw.is_empty() {
                    if let Err(error) = processor.process_raw_json(&source_id, raw) {
                        warn!(%error, "dropping malformed socket input");
                    }
                }
                line.clear();
            }
            Err(error)
                if matches!(
                    error.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                // Timeout while waiting for the rest of a line; the
                // partial read stays buffered in `line`.
                continue;
            }
            Err(error) => {
                debug!(%error, "connection closed with error");
                break;
            }
        }
    }
}
