//! Action factory: a registry from action type names to constructors.
//!
//! The registry is populated once during startup and read-mostly
//! afterwards, so it lives on a concurrent map and needs no external
//! locking. Registration is last-writer-wins.

use crate::action::{Action, HttpAction, LogAction, ShellAction};
use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Failure constructing an action from its config. Isolated to the
/// offending action; the rest of a dispatch batch proceeds.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("action config must contain a 'type' string: {snippet}")]
    MissingType { snippet: String },

    #[error("unknown action type: {0}")]
    UnknownType(String),

    #[error("invalid {kind} action config: {message}")]
    InvalidConfig { kind: &'static str, message: String },
}

type Constructor = Box<dyn Fn(&Value) -> Result<Box<dyn Action>, FactoryError> + Send + Sync>;

#[derive(Default)]
pub struct ActionFactory {
    constructors: DashMap<String, Constructor>,
}

impl ActionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for an action type name. The last writer
    /// for a name wins.
    pub fn register<F>(&self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn(&Value) -> Result<Box<dyn Action>, FactoryError> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        debug!(action_type = %type_name, "registered action type");
        self.constructors.insert(type_name, Box::new(constructor));
    }

    /// Construct an action from its config, dispatching on `config["type"]`
    pub fn create(&self, config: &Value) -> Result<Box<dyn Action>, FactoryError> {
        let action_type = config
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| FactoryError::MissingType {
                snippet: config.to_string(),
            })?;

        let constructor = self
            .constructors
            .get(action_type)
            .ok_or_else(|| FactoryError::UnknownType(action_type.to_string()))?;
        (constructor.value())(config)
    }

    /// Install the built-in action kinds. Called once during startup.
    pub fn register_defaults(&self) {
        self.register("log", |config| {
            LogAction::from_config(config).map(|a| Box::new(a) as Box<dyn Action>)
        });
        self.register("http", |config| {
            HttpAction::from_config(config).map(|a| Box::new(a) as Box<dyn Action>)
        });
        self.register("shell", |config| {
            ShellAction::from_config(config).map(|a| Box::new(a) as Box<dyn Action>)
        });
    }

    /// Number of registered action types
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_defaults_installs_builtins() {
        let factory = ActionFactory::new();
        factory.register_defaults();
        assert_eq!(factory.len(), 3);

        let action = factory
            .create(&json!({"type": "log", "message": "m"}))
            .unwrap();
        assert_eq!(action.kind(), "log");

        let action = factory
            .create(&json!({"type": "http", "url": "u", "method": "POST"}))
            .unwrap();
        assert_eq!(action.kind(), "http");

        let action = factory
            .create(&json!({"type": "shell", "command": "true"}))
            .unwrap();
        assert_eq!(action.kind(), "shell");
    }

    #[test]
    fn test_create_requires_type_string() {
        let factory = ActionFactory::new();
        factory.register_defaults();

        let err = factory.create(&json!({"message": "m"})).unwrap_err();
        assert!(matches!(err, FactoryError::MissingType { .. }));

        let err = factory.create(&json!({"type": 7})).unwrap_err();
        assert!(matches!(err, FactoryError::MissingType { .. }));
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let factory = ActionFactory::new();
        factory.register_defaults();
        let err = factory.create(&json!({"type": "email"})).unwrap_err();
        assert!(matches!(err, FactoryError::UnknownType(t) if t == "email"));
    }

    #[test]
    fn test_bad_config_surfaces_constructor_error() {
        let factory = ActionFactory::new();
        factory.register_defaults();
        let err = factory.create(&json!({"type": "log"})).unwrap_err();
        assert!(matches!(err, FactoryError::InvalidConfig { kind: "log", .. }));
    }

    #[test]
    fn test_last_writer_wins() {
        let factory = ActionFactory::new();
        factory.register_defaults();
        // Re-register "shell" to construct a log action instead.
        factory.register("shell", |config| {
            LogAction::from_config(config).map(|a| Box::new(a) as Box<dyn Action>)
        });

        let action = factory
            .create(&json!({"type": "shell", "message": "m"}))
            .unwrap();
        assert_eq!(action.kind(), "log");
        assert_eq!(factory.len(), 3);
    }
}
