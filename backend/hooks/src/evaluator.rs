//! Gate evaluator: decides whether a condition holds for a cycle's arguments.

use serde_json::Value;
use tracing::warn;

use crate::types::GateCondition;

/// Evaluate `cond` against the argument sequence.
pub fn evaluate(cond: &GateCondition, args: &[Value]) -> bool {
    match cond {
        GateCondition::FieldEquals { field, value } => {
            extract_field(args, field).is_some_and(|v| v == value)
        }

        GateCondition::FieldContains { field, substring } => extract_field(args, field)
            .and_then(Value::as_str)
            .is_some_and(|s| s.contains(substring.as_str())),

        GateCondition::FieldMatches { field, regex } => {
            let Some(text) = extract_field(args, field).and_then(Value::as_str) else {
                return false;
            };
            match regex::Regex::new(regex) {
                Ok(re) => re.is_match(text),
                Err(e) => {
                    warn!(pattern = %regex, "invalid gate regex: {}", e);
                    false
                }
            }
        }

        GateCondition::Exists { field } => extract_field(args, field).is_some(),

        GateCondition::And { conditions } => conditions.iter().all(|c| evaluate(c, args)),

        GateCondition::Or { conditions } => conditions.iter().any(|c| evaluate(c, args)),

        GateCondition::Not { condition } => !evaluate(condition, args),
    }
}

/// Resolve a dotted path (e.g. `0.order.id`) inside the argument list.
///
/// Numeric segments index arrays; other segments look up object keys.
fn extract_field<'a>(args: &'a [Value], field: &str) -> Option<&'a Value> {
    let mut parts = field.split('.');
    let first: usize = parts.next()?.parse().ok()?;
    let mut current = args.get(first)?;
    for part in parts {
        current = match current {
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            Value::Object(map) => map.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}
