use std::sync::Arc;

use serde_json::Value;

use super::state::{Field, State};

/// One-level equality between two state snapshots.
///
/// This is the gate that decides whether a write commits: field counts must
/// match and every field of `a` must exist on `b` with a strictly equal
/// value. Strict equality means `Arc` identity for actions and composite
/// data, value equality for primitives. Nested structures are never
/// re-entered, so a changed nested object behind an unchanged `Arc` counts
/// as unchanged.
pub fn shallow_eq(a: &State, b: &State) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, fa)| b.get(key).is_some_and(|fb| field_strict_eq(fa, fb)))
}

/// One-level equality between two individual fields.
///
/// Unlike the per-field strictness used by [`shallow_eq`], this descends one
/// level into the field's own value: arrays compare length plus per-index
/// elements, objects compare field counts plus per-key entries. Elements are
/// compared strictly (primitives by value, composites by identity), never
/// recursively.
pub fn shallow_eq_fields(a: &Field, b: &Field) -> bool {
    match (a, b) {
        (Field::Action(x), Field::Action(y)) => Arc::ptr_eq(x, y),
        (Field::Value(x), Field::Value(y)) => shallow_eq_values(x, y),
        _ => false,
    }
}

fn shallow_eq_values(a: &Arc<Value>, b: &Arc<Value>) -> bool {
    if Arc::ptr_eq(a, b) {
        return true;
    }
    match (a.as_ref(), b.as_ref()) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| element_eq(p, q))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, p)| y.get(key).is_some_and(|q| element_eq(p, q)))
        }
        (x, y) => element_eq(x, y),
    }
}

fn field_strict_eq(a: &Field, b: &Field) -> bool {
    match (a, b) {
        (Field::Action(x), Field::Action(y)) => Arc::ptr_eq(x, y),
        (Field::Value(x), Field::Value(y)) => Arc::ptr_eq(x, y) || element_eq(x, y),
        _ => false,
    }
}

// Strict comparison of owned values: primitives by value. Owned composites
// carry no identity, so they always compare unequal here (the conservative
// reading of reference equality).
fn element_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        _ => false,
    }
}
