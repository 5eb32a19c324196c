//! `$input` reference resolution.
//!
//! Splices upstream outputs into a node's configured parameters:
//!
//! | Expression          | Resolves to                                                  |
//! |---------------------|--------------------------------------------------------------|
//! | `$input`            | first upstream output, stringified                           |
//! | `$input[n]`         | output `n`, stringified; the literal string if out of range  |
//! | `$input[n].a.b[0]`  | the value at that path, or `undefined` if any step is absent |
//!
//! Only top-level string parameters are inspected. Nested objects and arrays
//! pass through untouched. Any other shape is returned unchanged.

use serde_json::{Map, Value};

const PREFIX: &str = "$input";

/// A single step of a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

/// A parsed `$input` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `$input`
    First,
    /// `$input[n]`
    Index(usize),
    /// `$input[n].path`
    Path { index: usize, steps: Vec<PathStep> },
}

impl Reference {
    /// Parse a reference. Returns `None` for any string that is not one of
    /// the three recognised shapes.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(PREFIX)?;
        if rest.is_empty() {
            return Some(Self::First);
        }

        let rest = rest.strip_prefix('[')?;
        let close = rest.find(']')?;
        let index = parse_index(&rest[..close])?;
        let rest = &rest[close + 1..];

        if rest.is_empty() {
            return Some(Self::Index(index));
        }

        let path = rest.strip_prefix('.')?;
        if path.is_empty() {
            return None;
        }

        let steps = path.split('.').flat_map(parse_segment).collect();
        Some(Self::Path { index, steps })
    }

    /// Evaluate against upstream outputs. `None` is `undefined`.
    ///
    /// `raw` is the original expression; it is what an out-of-range
    /// `$input[n]` evaluates to.
    fn evaluate(&self, raw: &str, inputs: &[Value]) -> Option<Value> {
        match self {
            Self::First => inputs.first().map(stringify),
            Self::Index(n) => Some(
                inputs
                    .get(*n)
                    .map(stringify)
                    .unwrap_or_else(|| Value::String(raw.to_string())),
            ),
            Self::Path { index, steps } => {
                let mut current = inputs.get(*index)?;
                for step in steps {
                    current = descend(current, step)?;
                }
                Some(current.clone())
            }
        }
    }
}

/// Resolve one parameter value. `None` is `undefined`.
pub fn resolve(value: &Value, inputs: &[Value]) -> Option<Value> {
    match value {
        Value::String(s) if s.starts_with(PREFIX) => match Reference::parse(s) {
            Some(reference) => reference.evaluate(s, inputs),
            None => Some(value.clone()),
        },
        other => Some(other.clone()),
    }
}

/// Resolve every top-level parameter. Parameters that resolve to `undefined`
/// are dropped, since there is no JSON encoding for them.
pub fn resolve_parameters(params: &Map<String, Value>, inputs: &[Value]) -> Map<String, Value> {
    params
        .iter()
        .filter_map(|(key, value)| {
            let resolved = resolve(value, inputs);
            if resolved.is_none() {
                tracing::debug!(parameter = %key, "reference resolved to undefined; dropping");
            }
            resolved.map(|v| (key.clone(), v))
        })
        .collect()
}

fn stringify(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        other => Value::String(other.to_string()),
    }
}

fn parse_index(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// `items`, `items[0]`, `[0]` or `grid[1][2]`. A segment with malformed
/// brackets is taken as a literal key.
fn parse_segment(segment: &str) -> Vec<PathStep> {
    let Some(open) = segment.find('[') else {
        return vec![PathStep::Key(segment.to_string())];
    };

    let mut steps = Vec::new();
    if open > 0 {
        steps.push(PathStep::Key(segment[..open].to_string()));
    }

    let mut rest = &segment[open..];
    while !rest.is_empty() {
        let parsed = rest
            .strip_prefix('[')
            .and_then(|r| r.find(']').map(|close| (&r[..close], &r[close + 1..])))
            .and_then(|(digits, tail)| parse_index(digits).map(|i| (i, tail)));

        match parsed {
            Some((index, tail)) => {
                steps.push(PathStep::Index(index));
                rest = tail;
            }
            None => return vec![PathStep::Key(segment.to_string())],
        }
    }
    steps
}

fn descend<'a>(value: &'a Value, step: &PathStep) -> Option<&'a Value> {
    match (value, step) {
        (Value::Object(map), PathStep::Key(key)) => map.get(key),
        (Value::Object(map), PathStep::Index(i)) => map.get(&i.to_string()),
        (Value::Array(items), PathStep::Index(i)) => items.get(*i),
        (Value::Array(items), PathStep::Key(key)) => {
            key.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => None,
    }
}
