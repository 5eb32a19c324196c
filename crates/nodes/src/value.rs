//! Comparison and coercion rules shared by the filter, merge and conditional nodes.
//!
//! Workflow configs are authored against JSON-script semantics, so a missing
//! field is `undefined` (modelled here as `None`) and is distinct from `null`.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// `false`, `0`, `NaN`, `""`, `null` and `undefined` are falsy; everything else is truthy.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Strict equality: same type and same value. Numbers compare by magnitude,
/// so `1` and `1.0` are equal; arrays and objects compare structurally.
pub fn strict_equals(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => same_value(x, y),
        _ => false,
    }
}

fn same_value(x: &Value, y: &Value) -> bool {
    match (x, y) {
        (Value::Number(m), Value::Number(n)) => m.as_f64() == n.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, v)| ym.get(k).map_or(false, |w| same_value(v, w)))
        }
        _ => x == y,
    }
}

/// Loose equality: `null` equals `undefined`, and a number equals a string or
/// boolean that coerces to the same number.
pub fn loose_equals(a: Option<&Value>, b: Option<&Value>) -> bool {
    let nullish = |v: Option<&Value>| matches!(v, None | Some(Value::Null));
    if nullish(a) || nullish(b) {
        return nullish(a) && nullish(b);
    }
    match (a, b) {
        (Some(Value::Number(_)), Some(Value::String(_) | Value::Bool(_)))
        | (Some(Value::String(_) | Value::Bool(_)), Some(Value::Number(_)))
        | (Some(Value::Bool(_)), Some(Value::String(_)))
        | (Some(Value::String(_)), Some(Value::Bool(_))) => {
            match (to_number(a), to_number(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        _ => strict_equals(a, b),
    }
}

/// Ordering used by `<`, `>` and friends. Two strings compare lexically;
/// anything else compares numerically after coercion. `None` means the
/// comparison is undefined and every relational operator yields false.
pub fn compare(a: Option<&Value>, b: Option<&Value>) -> Option<Ordering> {
    if let (Some(Value::String(x)), Some(Value::String(y))) = (a, b) {
        return Some(x.cmp(y));
    }
    let x = to_number(a)?;
    let y = to_number(b)?;
    x.partial_cmp(&y)
}

/// Numeric coercion. Objects, arrays, `undefined` and unparsable strings
/// have no numeric value.
pub fn to_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// String coercion, matching how a script runtime stringifies values:
/// arrays join their elements with `,` (`null` and `undefined` elements
/// become empty), objects become `[object Object]`, integral numbers have no
/// fractional part and `undefined` becomes `"undefined"`.
pub fn coerce_string(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => number_string(n),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_string(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

fn number_string(n: &Number) -> String {
    if n.is_f64() {
        match n.as_f64() {
            Some(f) if f == 0.0 => "0".to_string(),
            Some(f) => f.to_string(),
            None => n.to_string(),
        }
    } else {
        n.to_string()
    }
}

/// Canonical text of a value such that two values share a key exactly when
/// [`strict_equals`] holds between them. Numbers are keyed by their `f64`
/// magnitude and object keys are sorted.
pub fn strict_key(value: Option<&Value>) -> String {
    let mut key = String::new();
    match value {
        // JSON text never starts with a NUL byte.
        None => key.push('\0'),
        Some(v) => write_key(v, &mut key),
    }
    key
}

fn write_key(value: &Value, out: &mut String) {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => out.push('0'),
            Some(f) => out.push_str(&f.to_string()),
            None => out.push_str(&n.to_string()),
        },
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_key(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_key(v, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
