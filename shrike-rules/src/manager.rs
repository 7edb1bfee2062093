//! Rule manager: the process-wide owner of the loaded rule set.
//!
//! Loading parses the whole document outside the lock and swaps the rule
//! set atomically, so evaluators never observe a partial mix of old and
//! new rules. Evaluation runs under the shared side of a reader-writer
//! lock because it is the hot path and loads are rare.

use crate::{parser, Rule};
use ahash::AHashSet;
use parking_lot::RwLock;
use serde_json::Value;
use shrike_event::Event;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Counts reported by one load
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadStats {
    pub loaded: usize,
    pub skipped: usize,
}

/// Failure loading a rules document. Per-rule parse failures are not
/// errors; they skip the rule and surface in [`LoadStats::skipped`].
#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("could not read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rules document {path}: {message}")]
    Document { path: PathBuf, message: String },

    #[error("rules document {path} must be an array of rule objects")]
    NotAnArray { path: PathBuf },
}

/// Registry of loaded rules
#[derive(Default)]
pub struct RuleManager {
    rules: RwLock<Vec<Rule>>,
}

impl RuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a rules document and atomically replace the current rule set.
    ///
    /// The document is a JSON array of rule objects; `.yaml`/`.yml` files
    /// carry the same structure in YAML. Rules that fail to parse are
    /// skipped with a warning. If the file cannot be read or the document
    /// is not an array, the previous rule set is preserved.
    pub fn load_rules(&self, path: &Path) -> Result<LoadStats, RuleLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let document = parse_document(path, &content)?;
        let items = document
            .as_array()
            .ok_or_else(|| RuleLoadError::NotAnArray {
                path: path.to_path_buf(),
            })?;

        let mut new_rules = Vec::with_capacity(items.len());
        let mut seen_ids = AHashSet::new();
        let mut skipped = 0usize;

        for (index, rule_json) in items.iter().enumerate() {
            match parser::parse_rule(rule_json) {
                Ok(rule) => {
                    if !seen_ids.insert(rule.id.clone()) {
                        warn!(rule_id = %rule.id, index, "duplicate rule id");
                    }
                    debug!(rule_id = %rule.id, index, actions = rule.actions.len(), "loaded rule");
                    new_rules.push(rule);
                }
                Err(error) => {
                    skipped += 1;
                    warn!(
                        path = %path.display(),
                        index,
                        %error,
                        "skipping rule that failed to parse"
                    );
                }
            }
        }

        let stats = LoadStats {
            loaded: new_rules.len(),
            skipped,
        };

        *self.rules.write() = new_rules;

        info!(
            path = %path.display(),
            loaded = stats.loaded,
            skipped = stats.skipped,
            "rule set replaced"
        );
        Ok(stats)
    }

    /// Evaluate an event against every loaded rule, in load order.
    ///
    /// Returns the action configs of all matching rules as one flat
    /// sequence preserving rule order, then in-rule action order.
    pub fn evaluate(&self, event: &Event) -> Vec<Value> {
        let rules = self.rules.read();
        let mut triggered = Vec::new();
        for rule in rules.iter() {
            if rule.matches(event) {
                debug!(rule_id = %rule.id, event_id = %event.id, "rule matched");
                triggered.extend(rule.actions.iter().cloned());
            }
        }
        triggered
    }

    /// Advisory snapshot of the current rule count
    pub fn rules_count(&self) -> usize {
        self.rules.read().len()
    }

    /// Snapshot of (rule id, action count) pairs, in load order
    pub fn summaries(&self) -> Vec<(String, usize)> {
        self.rules
            .read()
            .iter()
            .map(|r| (r.id.clone(), r.actions.len()))
            .collect()
    }
}

fn parse_document(path: &Path, content: &str) -> Result<Value, RuleLoadError> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    if is_yaml {
        serde_yaml::from_str(content).map_err(|e| RuleLoadError::Document {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    } else {
        serde_json::from_str(content).map_err(|e| RuleLoadError::Document {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn write_rules(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    const TWO_RULES: &str = r#"[
        {
            "id": "high_temp_alert",
            "condition": {
                "and": [
                    {"key": "temperature", "operator": ">", "value": 30.0},
                    {"key": "location", "operator": "==", "value": "LivingRoom"}
                ]
            },
            "actions": [
                {"type": "log", "message": "hot: {temperature}"},
                {"type": "http", "url": "http://localhost:8080/alerts", "method": "POST"}
            ]
        },
        {
            "id": "status_ok",
            "condition": {"key": "status", "operator": "==", "value": "OK"},
            "actions": [{"type": "log", "message": "ok"}]
        }
    ]"#;

    #[test]
    fn test_load_and_evaluate_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_rules(&dir, "rules.json", TWO_RULES);

        let manager = RuleManager::new();
        let stats = manager.load_rules(&path).unwrap();
        assert_eq!(stats.loaded, 2);
        assert_eq!(stats.skipped, 0);
        assert_eq!(manager.rules_count(), 2);

        let event = Event::record("unittest", "sensor_reading")
            .with_value("temperature", 35.0)
            .with_value("location", "LivingRoom");
        let actions = manager.evaluate(&event);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0]["type"], "log");
        assert_eq!(actions[1]["type"], "http");

        let mild = Event::record("unittest", "sensor_reading")
            .with_value("temperature", 25.0)
            .with_value("location", "LivingRoom");
        assert!(manager.evaluate(&mild).is_empty());
    }

    #[test]
    fn test_bad_rules_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_rules(
            &dir,
            "rules.json",
            r#"[
                {"id": "ok", "condition": {"key": "a", "operator": "==", "value": 1}},
                {"id": "broken", "condition": {"and": {}}},
                {"id": "no_condition"}
            ]"#,
        );

        let manager = RuleManager::new();
        let stats = manager.load_rules(&path).unwrap();
        assert_eq!(stats.loaded, 1);
        assert_eq!(stats.skipped, 2);
    }

    #[test]
    fn test_failed_load_preserves_previous_set() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_rules(&dir, "good.json", TWO_RULES);
        let not_array = write_rules(&dir, "bad.json", r#"{"id": "oops"}"#);
        let garbled = write_rules(&dir, "garbled.json", "not json at all");

        let manager = RuleManager::new();
        manager.load_rules(&good).unwrap();
        assert_eq!(manager.rules_count(), 2);

        let err = manager.load_rules(&not_array).unwrap_err();
        assert!(matches!(err, RuleLoadError::NotAnArray { .. }));
        assert_eq!(manager.rules_count(), 2);

        let err = manager.load_rules(&garbled).unwrap_err();
        assert!(matches!(err, RuleLoadError::Document { .. }));
        assert_eq!(manager.rules_count(), 2);

        let err = manager.load_rules(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, RuleLoadError::Io { .. }));
        assert_eq!(manager.rules_count(), 2);
    }

    #[test]
    fn test_yaml_rules_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_rules(
            &dir,
            "rules.yaml",
            r#"
- id: yaml_rule
  condition:
    key: status
    operator: "=="
    value: OK
  actions:
    - type: log
      message: "status ok"
"#,
        );

        let manager = RuleManager::new();
        let stats = manager.load_rules(&path).unwrap();
        assert_eq!(stats.loaded, 1);

        let event = Event::record("unittest", "t").with_value("status", "OK");
        assert_eq!(manager.evaluate(&event).len(), 1);
    }

    #[test]
    fn test_reload_is_atomic_under_concurrent_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        // R1: two rules that both match the probe event, one action each.
        let r1 = write_rules(
            &dir,
            "r1.json",
            r#"[
                {"id": "a", "condition": {"key": "probe", "operator": "==", "value": true},
                 "actions": [{"type": "log", "message": "a"}]},
                {"id": "b", "condition": {"key": "probe", "operator": "==", "value": true},
                 "actions": [{"type": "log", "message": "b"}]}
            ]"#,
        );
        // R2: no rule matches the probe event.
        let r2 = write_rules(
            &dir,
            "r2.json",
            r#"[
                {"id": "c", "condition": {"key": "probe", "operator": "==", "value": false},
                 "actions": [{"type": "log", "message": "c"}]}
            ]"#,
        );

        let manager = Arc::new(RuleManager::new());
        manager.load_rules(&r1).unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let evaluator = {
            let manager = Arc::clone(&manager);
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let event = Event::record("unittest", "t").with_value("probe", true);
                while !stop.load(Ordering::Relaxed) {
                    let n = manager.evaluate(&event).len();
                    // Either the full old set or the full new set, never a mix.
                    assert!(n == 2 || n == 0, "observed partial rule set: {} actions", n);
                }
            })
        };

        for _ in 0..50 {
            manager.load_rules(&r2).unwrap();
            manager.load_rules(&r1).unwrap();
        }
        manager.load_rules(&r2).unwrap();
        stop.store(true, Ordering::Relaxed);
        evaluator.join().unwrap();

        // After the final load returns, evaluation reflects R2.
        let event = Event::record("unittest", "t").with_value("probe", true);
        assert!(manager.evaluate(&event).is_empty());
    }

    #[test]
    fn test_duplicate_ids_both_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_rules(
            &dir,
            "rules.json",
            r#"[
                {"id": "dup", "condition": {"key": "a", "operator": "==", "value": 1},
                 "actions": [{"type": "log", "message": "first"}]},
                {"id": "dup", "condition": {"key": "a", "operator": "==", "value": 1},
                 "actions": [{"type": "log", "message": "second"}]}
            ]"#,
        );

        let manager = RuleManager::new();
        let stats = manager.load_rules(&path).unwrap();
        assert_eq!(stats.loaded, 2);

        let event = Event::record("unittest", "t").with_value("a", 1);
        let actions = manager.evaluate(&event);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0]["message"], "first");
        assert_eq!(actions[1]["message"], "second");
    }
}
