//! Placeholder substitution shared by the built-in actions.
//!
//! A placeholder runs from a `{` to the next `}`. Known keys substitute
//! the scalar's textual form, unknown keys substitute `[MISSING_<key>]`,
//! and a `{` with no closing brace ends substitution for the rest of the
//! template.

use shrike_event::Event;

/// Render a template against one event's data
pub fn render(template: &str, event: &Event) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            // Unmatched brace: emit the tail verbatim.
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match event.get(key) {
            Some(value) => out.push_str(&value.to_string()),
            None => {
                out.push_str("[MISSING_");
                out.push_str(key);
                out.push(']');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// The placeholder keys of a template, in order of appearance
pub fn placeholder_keys(template: &str) -> Vec<&str> {
    let mut keys = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        keys.push(&after[..end]);
        rest = &after[end + 1..];
    }
    keys
}
