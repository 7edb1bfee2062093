//! Boolean condition tree evaluated against one event.
//!
//! Conditions form a finite, owned tree built by the parser and never
//! mutated afterwards. Evaluation is pure and recursive with short-circuit
//! semantics for the composite variants.

use ahash::AHashSet;
use parking_lot::Mutex;
use shrike_event::Event;
use shrike_schema::ScalarValue;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

/// Comparison operator of a value leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    /// Parse the operator's JSON spelling
    pub fn parse(op: &str) -> Option<CompareOp> {
        match op {
            "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            ">" => Some(CompareOp::Gt),
            "<" => Some(CompareOp::Lt),
            ">=" => Some(CompareOp::Ge),
            "<=" => Some(CompareOp::Le),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }

    fn matches_ordering(&self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Ge => ord != Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Inline storage for composite children; most rules stay this small
pub type Children = SmallVec<[Condition; 4]>;

/// Recursive boolean expression over one event's data
#[derive(Debug, Clone)]
pub enum Condition {
    /// Leaf: compare `event.data[key]` against a literal
    Value {
        key: String,
        op: CompareOp,
        literal: ScalarValue,
    },

    /// All children must hold; empty evaluates to true
    And(Box<Children>),

    /// At least one child must hold; empty evaluates to false
    Or(Box<Children>),

    /// Negation of exactly one child
    Not(Box<Condition>),
}

impl Condition {
    /// Evaluate the tree against an event. Pure; reads only the event.
    pub fn evaluate(&self, event: &Event) -> bool {
        match self {
            Condition::Value { key, op, literal } => match event.get(key) {
                // Absence is not a match, regardless of operator.
                None => false,
                Some(lhs) => compare(key, lhs, *op, literal),
            },
            Condition::And(children) => children.iter().all(|c| c.evaluate(event)),
            Condition::Or(children) => children.iter().any(|c| c.evaluate(event)),
            Condition::Not(child) => !child.evaluate(event),
        }
    }
}

/// Apply the leaf type matrix: same-tag comparison, integer/float promotion,
/// everything else undefined (false, warned once per tuple).
fn compare(key: &str, lhs: &ScalarValue, op: CompareOp, rhs: &ScalarValue) -> bool {
    use ScalarValue::*;

    match (lhs, rhs) {
        (I64(a), I64(b)) => op.matches_ordering(a.cmp(b)),
        // Byte-lexicographic, which is what str's Ord gives us.
        (String(a), String(b)) => op.matches_ordering(a.as_str().cmp(b.as_str())),
        // Relational operators on booleans are undefined.
        (Bool(a), Bool(b)) => match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            _ => {
                warn_undefined(key, op, lhs, rhs);
                false
            }
        },
        _ if lhs.is_numeric() && rhs.is_numeric() => {
            // Mixed integer/float promotes to float.
            let a = lhs.as_f64().unwrap_or_default();
            let b = rhs.as_f64().unwrap_or_default();
            match op {
                CompareOp::Eq => a == b,
                CompareOp::Ne => a != b,
                CompareOp::Gt => a > b,
                CompareOp::Lt => a < b,
                CompareOp::Ge => a >= b,
                CompareOp::Le => a <= b,
            }
        }
        _ => {
            warn_undefined(key, op, lhs, rhs);
            false
        }
    }
}

/// Warn about an undefined comparison, once per (key, lhs-tag, rhs-tag)
/// tuple so a hot rule cannot flood the log.
fn warn_undefined(key: &str, op: CompareOp, lhs: &ScalarValue, rhs: &ScalarValue) {
    static WARNED: OnceLock<Mutex<AHashSet<(String, &'static str, &'static str)>>> =
        OnceLock::new();

    let warned = WARNED.get_or_init(|| Mutex::new(AHashSet::new()));
    let fresh = warned
        .lock()
        .insert((key.to_string(), lhs.tag(), rhs.tag()));
    if fresh {
        warn!(
            key,
            op = %op,
            lhs = lhs.tag(),
            rhs = rhs.tag(),
            "undefined comparison, condition evaluates to false"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn leaf(key: &str, op: CompareOp, literal: impl Into<ScalarValue>) -> Condition {
        Condition::Value {
            key: key.to_string(),
            op,
            literal: literal.into(),
        }
    }

    fn sensor_event() -> Event {
        Event::record("unittest", "sensor_reading")
            .with_value("temperature", 35.0)
            .with_value("location", "LivingRoom")
            .with_value("online", true)
            .with_value("count", 3)
    }

    #[test]
    fn test_value_leaf_same_tag() {
        let event = sensor_event();
        assert!(leaf("temperature", CompareOp::Gt, 30.0).evaluate(&event));
        assert!(!leaf("temperature", CompareOp::Lt, 30.0).evaluate(&event));
        assert!(leaf("location", CompareOp::Eq, "LivingRoom").evaluate(&event));
        assert!(leaf("location", CompareOp::Ne, "Kitchen").evaluate(&event));
        assert!(leaf("online", CompareOp::Eq, true).evaluate(&event));
        assert!(leaf("count", CompareOp::Ge, 3).evaluate(&event));
    }

    #[test]
    fn test_missing_key_is_never_a_match() {
        let event = sensor_event();
        assert!(!leaf("humidity", CompareOp::Lt, 50).evaluate(&event));
        assert!(!leaf("humidity", CompareOp::Ne, 50).evaluate(&event));
        assert!(!leaf("humidity", CompareOp::Eq, 50).evaluate(&event));
    }

    #[test]
    fn test_integer_float_promotion() {
        // Rule literal is an integer, event value a float.
        let event = Event::record("unittest", "t").with_value("temperature", 30.5);
        assert!(leaf("temperature", CompareOp::Gt, 30).evaluate(&event));

        let event = Event::record("unittest", "t").with_value("temperature", 30);
        assert!(!leaf("temperature", CompareOp::Gt, 30).evaluate(&event));
        assert!(leaf("temperature", CompareOp::Eq, 30.0).evaluate(&event));
    }

    #[test]
    fn test_mixed_incompatible_tags_are_false() {
        let event = sensor_event();
        assert!(!leaf("location", CompareOp::Eq, 42).evaluate(&event));
        assert!(!leaf("online", CompareOp::Eq, "true").evaluate(&event));
        assert!(!leaf("temperature", CompareOp::Gt, true).evaluate(&event));
    }

    #[test]
    fn test_boolean_relational_is_false() {
        let event = sensor_event();
        assert!(!leaf("online", CompareOp::Gt, false).evaluate(&event));
        assert!(!leaf("online", CompareOp::Le, true).evaluate(&event));
        // Equality stays defined.
        assert!(leaf("online", CompareOp::Ne, false).evaluate(&event));
    }

    #[test]
    fn test_string_ordering_is_lexicographic() {
        let event = Event::record("unittest", "t").with_value("name", "beta");
        assert!(leaf("name", CompareOp::Gt, "alpha").evaluate(&event));
        assert!(leaf("name", CompareOp::Lt, "gamma").evaluate(&event));
        // Capital letters sort before lowercase in byte order.
        assert!(leaf("name", CompareOp::Gt, "Zeta").evaluate(&event));
    }

    #[test]
    fn test_empty_and_is_true_empty_or_is_false() {
        let event = sensor_event();
        assert!(Condition::And(Box::new(Children::new())).evaluate(&event));
        assert!(!Condition::Or(Box::new(Children::new())).evaluate(&event));
    }

    #[test]
    fn test_and_or_composition() {
        let event = sensor_event();
        let both = Condition::And(Box::new(smallvec![
            leaf("temperature", CompareOp::Gt, 30.0),
            leaf("location", CompareOp::Eq, "LivingRoom"),
        ]));
        assert!(both.evaluate(&event));

        let one_false = Condition::And(Box::new(smallvec![
            leaf("temperature", CompareOp::Gt, 30.0),
            leaf("location", CompareOp::Eq, "Kitchen"),
        ]));
        assert!(!one_false.evaluate(&event));

        let either = Condition::Or(Box::new(smallvec![
            leaf("location", CompareOp::Eq, "Kitchen"),
            leaf("temperature", CompareOp::Gt, 30.0),
        ]));
        assert!(either.evaluate(&event));
    }

    #[test]
    fn test_not_over_absent_key() {
        // The inner leaf is false because the key is absent, so Not holds.
        let event = Event::record("unittest", "t");
        let cond = Condition::Not(Box::new(leaf("alert_sent", CompareOp::Eq, true)));
        assert!(cond.evaluate(&event));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let event = sensor_event();
        let cond = Condition::And(Box::new(smallvec![
            leaf("temperature", CompareOp::Gt, 30),
            Condition::Not(Box::new(leaf("alert_sent", CompareOp::Eq, true))),
        ]));
        let first = cond.evaluate(&event);
        for _ in 0..100 {
            assert_eq!(cond.evaluate(&event), first);
        }
    }

    #[test]
    fn test_compare_op_parse() {
        assert_eq!(CompareOp::parse("=="), Some(CompareOp::Eq));
        assert_eq!(CompareOp::parse(">="), Some(CompareOp::Ge));
        assert_eq!(CompareOp::parse("=>"), None);
        assert_eq!(CompareOp::parse("contains"), None);
    }
}
