//! Declarative rule parser.
//!
//! Consumes the JSON shape described in the rule configuration format and
//! produces [`Rule`]s. The parser is strict about types; every error carries
//! the offending sub-object so misconfigured rules are easy to locate.

use crate::condition::{Children, CompareOp, Condition};
use crate::Rule;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Rule parse failure, scoped to one rule definition
#[derive(Debug, Error)]
pub enum RuleParseError {
    #[error("rule definition must be a JSON object, got: {snippet}")]
    RuleNotObject { snippet: String },

    #[error("rule 'id' must be a string, got: {snippet}")]
    IdNotString { snippet: String },

    #[error("rule '{rule_id}' is missing a 'condition' object")]
    MissingCondition { rule_id: String },

    #[error("condition must be a JSON object, got: {snippet}")]
    ConditionNotObject { snippet: String },

    #[error("'and' condition must be an array in: {snippet}")]
    AndNotArray { snippet: String },

    #[error("'or' condition must be an array in: {snippet}")]
    OrNotArray { snippet: String },

    #[error("'not' condition must be an object in: {snippet}")]
    NotNotObject { snippet: String },

    #[error("condition 'key' must be a string in: {snippet}")]
    KeyNotString { snippet: String },

    #[error("condition 'operator' must be a string in: {snippet}")]
    OperatorNotString { snippet: String },

    #[error("unknown operator '{op}' in: {snippet}")]
    UnknownOperator { op: String, snippet: String },

    #[error("unsupported literal type for key '{key}' in: {snippet}")]
    UnsupportedLiteral { key: String, snippet: String },

    #[error("unknown condition shape: {snippet}")]
    UnknownShape { snippet: String },
}

const SNIPPET_MAX: usize = 160;

/// Compact rendering of the offending JSON for error messages
fn snippet(value: &Value) -> String {
    let mut text = value.to_string();
    if text.len() > SNIPPET_MAX {
        let mut cut = SNIPPET_MAX;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

/// Parse one rule definition
pub fn parse_rule(value: &Value) -> Result<Rule, RuleParseError> {
    let obj = value.as_object().ok_or_else(|| RuleParseError::RuleNotObject {
        snippet: snippet(value),
    })?;

    let id = match obj.get("id") {
        None => {
            warn!("rule definition missing 'id' field, assigning 'unknown_rule'");
            "unknown_rule".to_string()
        }
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(RuleParseError::IdNotString {
                snippet: snippet(other),
            })
        }
    };

    let condition = match obj.get("condition") {
        Some(cond @ Value::Object(_)) => parse_condition(cond)?,
        _ => return Err(RuleParseError::MissingCondition { rule_id: id }),
    };

    let actions = match obj.get("actions") {
        Some(Value::Array(items)) => {
            let mut actions = Vec::with_capacity(items.len());
            for item in items {
                if item.is_object() {
                    actions.push(item.clone());
                } else {
                    warn!(rule_id = %id, action = %snippet(item), "action is not an object, skipping");
                }
            }
            actions
        }
        _ => {
            warn!(rule_id = %id, "rule has no 'actions' array, no actions will be configured");
            Vec::new()
        }
    };

    Ok(Rule {
        id,
        condition,
        actions,
    })
}

/// Recursively parse a condition object.
///
/// Dispatch is structural, checked in the order `and`, `or`, `not`, leaf;
/// the first matching shape wins.
pub fn parse_condition(value: &Value) -> Result<Condition, RuleParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| RuleParseError::ConditionNotObject {
            snippet: snippet(value),
        })?;

    if let Some(and) = obj.get("and") {
        let items = and.as_array().ok_or_else(|| RuleParseError::AndNotArray {
            snippet: snippet(value),
        })?;
        let mut children = Children::with_capacity(items.len());
        for item in items {
            children.push(parse_condition(item)?);
        }
        return Ok(Condition::And(Box::new(children)));
    }

    if let Some(or) = obj.get("or") {
        let items = or.as_array().ok_or_else(|| RuleParseError::OrNotArray {
            snippet: snippet(value),
        })?;
        let mut children = Children::with_capacity(items.len());
        for item in items {
            children.push(parse_condition(item)?);
        }
        return Ok(Condition::Or(Box::new(children)));
    }

    if let Some(not) = obj.get("not") {
        if !not.is_object() {
            return Err(RuleParseError::NotNotObject {
                snippet: snippet(value),
            });
        }
        return Ok(Condition::Not(Box::new(parse_condition(not)?)));
    }

    if obj.contains_key("key") && obj.contains_key("operator") && obj.contains_key("value") {
        let key = obj
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| RuleParseError::KeyNotString {
                snippet: snippet(value),
            })?
            .to_string();

        let op_text = obj.get("operator").and_then(Value::as_str).ok_or_else(|| {
            RuleParseError::OperatorNotString {
                snippet: snippet(value),
            }
        })?;
        let op = CompareOp::parse(op_text).ok_or_else(|| RuleParseError::UnknownOperator {
            op: op_text.to_string(),
            snippet: snippet(value),
        })?;

        let literal = shrike_schema::ScalarValue::from_json(&obj["value"]).ok_or_else(|| {
            RuleParseError::UnsupportedLiteral {
                key: key.clone(),
                snippet: snippet(value),
            }
        })?;

        return Ok(Condition::Value { key, op, literal });
    }

    Err(RuleParseError::UnknownShape {
        snippet: snippet(value),
    })
}
