//! File watcher input source.
//!
//! Polls a file's modified time and re-reads it on change. Content that
//! actually differs from the last observation is fed to the processor,
//! either as raw JSON or as a single string value.

use super::{InputSource, SourceError};
use shrike_core::EventProcessor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// How the watched file's content is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileContent {
    /// Each change is one JSON object
    Json,
    /// Each change is a single string value under the `content` key
    Text,
}

pub struct FileWatcher {
    path: PathBuf,
    content: FileContent,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl FileWatcher {
    pub fn new(path: impl Into<PathBuf>, content: FileContent) -> Self {
        Self {
            path: path.into(),
            content,
            poll_interval: Duration::from_millis(500),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl InputSource for FileWatcher {
    fn start(&mut self, processor: &EventProcessor) -> Result<(), SourceError> {
        if self.worker.is_some() {
            return Err(SourceError::AlreadyRunning);
        }
        self.running.store(true, Ordering::SeqCst);
        info!(path = %self.path.display(), kind = ?self.content, "file watcher started");

        let path = self.path.clone();
        let content = self.content;
        let poll_interval = self.poll_interval;
        let running = Arc::clone(&self.running);
        let processor = processor.clone();

        self.worker = Some(std::thread::spawn(move || {
            watch_loop(&path, content, poll_interval, &running, &processor);
        }));
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        info!(path = %self.path.display(), "file watcher stopped");
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch_loop(
    path: &Path,
    content: FileContent,
    poll_interval: Duration,
    running: &AtomicBool,
    processor: &EventProcessor,
) {
    let source_id = format!("file:{}", path.display());

    // Prime from the current state so startup does not replay content
    // that was already present.
    let mut last_modified = modified_time(path);
    let mut last_content = std::fs::read_to_string(path).ok();

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(poll_interval);

        let modified = modified_time(path);
        if modified.is_none() || modified == last_modified {
            continue;
        }
        last_modified = modified;

        let current = match std::fs::read_to_string(path) {
            Ok(current) => current,
            Err(error) => {
                warn!(path = %path.display(), %error, "could not read watched file");
                continue;
            }
        };
        if last_content.as_deref() == Some(current.as_str()) {
            continue;
        }

        debug!(path = %path.display(), "watched file changed");
        let fed = match content {
            FileContent::Json => processor.process_raw_json(&source_id, &current),
            FileContent::Text => processor.process_raw_data_with_key(
                &source_id,
                "file_content_update",
                "content",
                current.clone(),
            ),
        };
        if let Err(error) = fed {
            warn!(path = %path.display(), %error, "watched file content not normalized");
        }
        last_content = Some(current);
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrike_core::EventQueue;

    fn wait_for_event(queue: &EventQueue, timeout: Duration) -> Option<shrike_event::Event> {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if let Some(event) = queue.try_pop() {
                return Some(event);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[test]
    fn test_watcher_emits_on_json_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensor_data.json");
        std::fs::write(&path, r#"{"type": "sensor_reading", "temperature": 25.0}"#).unwrap();

        let queue = Arc::new(EventQueue::new());
        let processor = EventProcessor::new(Arc::clone(&queue));
        let mut watcher = FileWatcher::new(&path, FileContent::Json)
            .with_poll_interval(Duration::from_millis(20));
        watcher.start(&processor).unwrap();

        // The primed content must not replay at startup.
        std::thread::sleep(Duration::from_millis(100));
        assert!(queue.is_empty());

        std::fs::write(&path, r#"{"type": "sensor_reading", "temperature": 35.0}"#).unwrap();
        let event = wait_for_event(&queue, Duration::from_secs(2)).expect("change event");
        assert_eq!(event.event_type, "sensor_reading");
        assert_eq!(event.source, format!("file:{}", path.display()));

        watcher.stop();
    }

    #[test]
    fn test_watcher_emits_text_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.txt");
        std::fs::write(&path, "STATUS:OK").unwrap();

        let queue = Arc::new(EventQueue::new());
        let processor = EventProcessor::new(Arc::clone(&queue));
        let mut watcher = FileWatcher::new(&path, FileContent::Text)
            .with_poll_interval(Duration::from_millis(20));
        watcher.start(&processor).unwrap();

        std::thread::sleep(Duration::from_millis(50));
        std::fs::write(&path, "STATUS:ERROR").unwrap();

        let event = wait_for_event(&queue, Duration::from_secs(2)).expect("change event");
        assert_eq!(event.event_type, "file_content_update");
        assert_eq!(
            event.get("content").and_then(|v| v.as_str()),
            Some("STATUS:ERROR")
        );

        watcher.stop();
    }

    #[test]
    fn test_double_start_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "x").unwrap();

        let queue = Arc::new(EventQueue::new());
        let processor = EventProcessor::new(queue);
        let mut watcher = FileWatcher::new(&path, FileContent::Text);
        watcher.start(&processor).unwrap();
        assert!(matches!(
            watcher.start(&processor),
            Err(SourceError::AlreadyRunning)
        ));
        watcher.stop();
    }
}
