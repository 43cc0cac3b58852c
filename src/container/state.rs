use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// An action: a shared callable stored as a state field.
///
/// Actions typically close over a [`Writer`](crate::Writer) so they can feed
/// new values back into the container that owns them.
pub type ActionFn = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// A single state field: either plain data or an action.
///
/// Data fields are stored behind an `Arc` so that a merge write which leaves
/// a field untouched preserves its identity, and the shallow-equality gate
/// can treat it as unchanged without inspecting its contents.
#[derive(Clone)]
pub enum Field {
    /// A JSON-representable data value.
    Value(Arc<Value>),
    /// A callable promoted to the container handle when present on the
    /// initial state.
    Action(ActionFn),
}

impl Field {
    /// Create a data field from anything convertible to a JSON value.
    pub fn value(data: impl Into<Value>) -> Self {
        Field::Value(Arc::new(data.into()))
    }

    /// Create a data field from a serializable value.
    ///
    /// Fails only if the value cannot be represented as JSON (for example a
    /// map with non-string keys).
    pub fn json(data: impl Serialize) -> serde_json::Result<Self> {
        Ok(Field::Value(Arc::new(serde_json::to_value(data)?)))
    }

    /// Create an action field.
    pub fn action(f: impl Fn(&[Value]) + Send + Sync + 'static) -> Self {
        Field::Action(Arc::new(f))
    }

    /// The data value, if this field holds one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value.as_ref()),
            Field::Action(_) => None,
        }
    }

    /// The action, if this field holds one.
    pub fn as_action(&self) -> Option<&ActionFn> {
        match self {
            Field::Value(_) => None,
            Field::Action(action) => Some(action),
        }
    }

    /// Whether this field is an action.
    pub fn is_action(&self) -> bool {
        matches!(self, Field::Action(_))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Value(value) => fmt::Debug::fmt(value, f),
            Field::Action(_) => f.write_str("<action>"),
        }
    }
}

macro_rules! impl_field_from {
    ($($ty:ty),* $(,)?) => {$(
        impl From<$ty> for Field {
            fn from(data: $ty) -> Self {
                Field::value(data)
            }
        }
    )*};
}

impl_field_from!(bool, i32, i64, u32, u64, f64, &str, String, Value);

/// An immutable-by-replacement snapshot of container state.
///
/// A `State` is a string-keyed field mapping. It is only ever replaced
/// wholesale by the container's write path, never mutated in place once
/// committed, so snapshots handed to listeners stay consistent.
#[derive(Clone, Default)]
pub struct State(BTreeMap<String, Field>);

impl State {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, for assembling a state inline.
    pub fn set(mut self, key: impl Into<String>, field: impl Into<Field>) -> Self {
        self.0.insert(key.into(), field.into());
        self
    }

    /// Insert a field into an existing state.
    pub fn insert(&mut self, key: impl Into<String>, field: impl Into<Field>) {
        self.0.insert(key.into(), field.into());
    }

    /// Look up a field by name.
    pub fn get(&self, key: &str) -> Option<&Field> {
        self.0.get(key)
    }

    /// Look up a data field by name, skipping actions.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.0.get(key).and_then(Field::as_value)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the state has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a field with the given name exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate over all fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.0.iter()
    }

    /// The data fields of this state as a JSON object.
    ///
    /// Actions are not representable in JSON and are skipped.
    pub fn to_json(&self) -> Value {
        let entries = self
            .0
            .iter()
            .filter_map(|(key, field)| {
                field.as_value().map(|value| (key.clone(), value.clone()))
            })
            .collect();
        Value::Object(entries)
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<K: Into<String>, F: Into<Field>> FromIterator<(K, F)> for State {
    fn from_iter<I: IntoIterator<Item = (K, F)>>(iter: I) -> Self {
        State(
            iter.into_iter()
                .map(|(key, field)| (key.into(), field.into()))
                .collect(),
        )
    }
}

impl IntoIterator for State {
    type Item = (String, Field);
    type IntoIter = std::collections::btree_map::IntoIter<String, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data: Vec<_> = self
            .0
            .iter()
            .filter_map(|(key, field)| field.as_value().map(|value| (key, value)))
            .collect();
        let mut map = serializer.serialize_map(Some(data.len()))?;
        for (key, value) in data {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
