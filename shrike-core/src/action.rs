//! Built-in action kinds.
//!
//! An action is a narrow object with a single `execute` method, so
//! user-defined kinds can be registered without touching the core. The
//! built-ins cover structured log output, an outbound HTTP request, and a
//! shell command.

use crate::factory::FactoryError;
use crate::template;
use serde_json::Value;
use shrike_event::Event;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info};

/// Failure inside an action's execution. Owned by the action; never
/// propagated past the worker that ran it.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("refusing shell command: substituted value for '{key}' contains shell metacharacters")]
    UnsafeSubstitution { key: String },

    #[error("shell command exited with status {status}")]
    CommandFailed { status: i32 },

    #[error("could not run shell command: {0}")]
    Spawn(#[from] std::io::Error),
}

/// One executable action, constructed from an opaque action config
pub trait Action: Send + Sync + fmt::Debug {
    /// Action kind name, used in worker logs
    fn kind(&self) -> &'static str;

    /// Run the action against the event that triggered it
    fn execute(&self, event: &Event) -> Result<(), ActionError>;
}

/// Emits a rendered message through the log
#[derive(Debug)]
pub struct LogAction {
    message_template: String,
}

impl LogAction {
    pub fn from_config(config: &Value) -> Result<Self, FactoryError> {
        let message_template = config
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| FactoryError::InvalidConfig {
                kind: "log",
                message: "config must contain a 'message' string".into(),
            })?
            .to_string();
        Ok(Self { message_template })
    }
}

impl Action for LogAction {
    fn kind(&self) -> &'static str {
        "log"
    }

    fn execute(&self, event: &Event) -> Result<(), ActionError> {
        let message = template::render(&self.message_template, event);
        info!(event_id = %event.id, source = %event.source, "{}", message);
        Ok(())
    }
}

/// Renders an HTTP request from a payload template. The request is
/// emitted through the log rather than a network client; wiring a real
/// client in means replacing `execute` only.
#[derive(Debug)]
pub struct HttpAction {
    url: String,
    method: String,
    payload_template: Value,
}

impl HttpAction {
    pub fn from_config(config: &Value) -> Result<Self, FactoryError> {
        let url = config.get("url").and_then(Value::as_str);
        let method = config.get("method").and_then(Value::as_str);
        let (Some(url), Some(method)) = (url, method) else {
            return Err(FactoryError::InvalidConfig {
                kind: "http",
                message: "config must contain 'url' and 'method' strings".into(),
            });
        };
        let payload_template = config
            .get("payload")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        Ok(Self {
            url: url.to_string(),
            method: method.to_string(),
            payload_template,
        })
    }

    /// Fill placeholders in the payload template's top-level string
    /// fields with the shared substitution rule; non-string fields pass
    /// through untouched.
    fn render_payload(&self, event: &Event) -> Value {
        let mut payload = self.payload_template.clone();
        if let Value::Object(fields) = &mut payload {
            for (_, field) in fields.iter_mut() {
                if let Some(text) = field.as_str() {
                    if text.contains('{') {
                        *field = Value::String(template::render(text, event));
                    }
                }
            }
        }
        payload
    }
}

impl Action for HttpAction {
    fn kind(&self) -> &'static str {
        "http"
    }

    fn execute(&self, event: &Event) -> Result<(), ActionError> {
        let payload = self.render_payload(event);
        info!(
            method = %self.method,
            url = %self.url,
            payload = %payload,
            event_id = %event.id,
            "http request (simulated)"
        );
        Ok(())
    }
}

/// Runs a shell command rendered from the event.
///
/// Substituted values are checked before rendering: any value containing
/// shell metacharacters aborts the action. Untrusted event data must not
/// reach the command line.
#[derive(Debug)]
pub struct ShellAction {
    command_template: String,
}

const SHELL_METACHARACTERS: &[char] = &[
    ';', '|', '&', '$', '`', '>', '<', '(', ')', '\n', '\'', '"', '\\',
];

impl ShellAction {
    pub fn from_config(config: &Value) -> Result<Self, FactoryError> {
        let command_template = config
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| FactoryError::InvalidConfig {
                kind: "shell",
                message: "config must contain a 'command' string".into(),
            })?
            .to_string();
        Ok(Self { command_template })
    }

    fn check_substitutions(&self, event: &Event) -> Result<(), ActionError> {
        for key in template::placeholder_keys(&self.command_template) {
            if let Some(value) = event.get(key) {
                let text = value.to_string();
                if text.contains(SHELL_METACHARACTERS) {
                    error!(key, "rejecting unsafe shell substitution");
                    return Err(ActionError::UnsafeSubstitution {
                        key: key.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Action for ShellAction {
    fn kind(&self) -> &'static str {
        "shell"
    }

    fn execute(&self, event: &Event) -> Result<(), ActionError> {
        self.check_substitutions(event)?;
        let command = template::render(&self.command_template, event);
        debug!(command = %command, event_id = %event.id, "running shell command");

        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(&command)
            .status()?;
        if !status.success() {
            return Err(ActionError::CommandFailed {
                status: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}
