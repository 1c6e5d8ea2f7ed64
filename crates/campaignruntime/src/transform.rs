//! Value transformations between wired module fields
//!
//! An upstream output rarely has exactly the shape a downstream input
//! expects: a copy generator yields a list of copy records while an image
//! prompt is a bare string. Each reshaping is a small pure function
//! registered under the `(source type, output field, target type, input
//! field)` tuple it applies to. Tuples without an entry pass values through
//! unchanged.

use campaigncore::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type TransformFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformKey {
    pub source_type: String,
    pub source_field: String,
    pub target_type: String,
    pub target_field: String,
}

impl TransformKey {
    pub fn new(
        source_type: impl Into<String>,
        source_field: impl Into<String>,
        target_type: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            source_field: source_field.into(),
            target_type: target_type.into(),
            target_field: target_field.into(),
        }
    }
}

impl fmt::Display for TransformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source_type, self.source_field, self.target_type, self.target_field
        )
    }
}

/// Lookup table of transformations
#[derive(Clone, Default)]
pub struct TransformerRegistry {
    transforms: HashMap<TransformKey, TransformFn>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, key: TransformKey, transform: F)
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        tracing::debug!("Registering transformer: {}", key);
        self.transforms.insert(key, Arc::new(transform));
    }

    /// Reshape `value` for the given wire. Unregistered tuples return the
    /// value unchanged.
    pub fn apply(&self, key: &TransformKey, value: &Value) -> Value {
        match self.transforms.get(key) {
            Some(transform) => transform(value),
            None => value.clone(),
        }
    }

    pub fn contains(&self, key: &TransformKey) -> bool {
        self.transforms.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TransformKey> {
        self.transforms.keys()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

/// How one property of an output record is filled from an input record
#[derive(Debug, Clone)]
pub struct PropertyMap {
    pub target: String,
    pub source: String,
    pub default: Value,
}

pub fn prop(target: &str, source: &str, default: impl Into<Value>) -> PropertyMap {
    PropertyMap {
        target: target.to_string(),
        source: source.to_string(),
        default: default.into(),
    }
}

fn items(value: &Value) -> Vec<&Value> {
    match value {
        Value::List(items) => items.iter().filter(|v| v.is_defined()).collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn text_of(item: &Value, field: &str) -> Option<Value> {
    match item {
        Value::String(_) | Value::Integer(_) | Value::Float(_) | Value::Bool(_) => {
            Some(item.clone())
        }
        Value::Object(_) => item.get(field).cloned(),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(n) => Some(n.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn build_record(record: Option<&Value>, mapping: &[PropertyMap]) -> Value {
    let mut out = HashMap::with_capacity(mapping.len());
    for (i, p) in mapping.iter().enumerate() {
        let value = match record {
            Some(Value::String(s)) if i == 0 => Some(Value::String(s.clone())),
            Some(r @ Value::Object(_)) => r.get(&p.source).cloned(),
            _ => None,
        };
        out.insert(p.target.clone(), value.unwrap_or_else(|| p.default.clone()));
    }
    Value::Object(out)
}

/// First record's `field` as a bare value. Bare strings pass through;
/// nothing usable yields `""`.
pub fn extract_first(field: &str) -> impl Fn(&Value) -> Value + Send + Sync + 'static {
    let field = field.to_string();
    move |value| {
        items(value)
            .into_iter()
            .next()
            .and_then(|first| text_of(first, &field))
            .unwrap_or_else(|| Value::String(String::new()))
    }
}

/// `field` of every record, as a list. Bare strings are kept, records
/// without the field are skipped.
pub fn pluck(field: &str) -> impl Fn(&Value) -> Value + Send + Sync + 'static {
    let field = field.to_string();
    move |value| {
        Value::List(
            items(value)
                .into_iter()
                .filter_map(|item| text_of(item, &field))
                .collect(),
        )
    }
}

/// A single object built from the first record, property by property,
/// with a default for anything the record lacks.
pub fn first_record_as(mapping: Vec<PropertyMap>) -> impl Fn(&Value) -> Value + Send + Sync + 'static {
    move |value| {
        let first = items(value).into_iter().next();
        build_record(first, &mapping)
    }
}

/// Every record rebuilt with renamed and defaulted properties. A bare
/// string fills the first mapped property.
pub fn map_records(mapping: Vec<PropertyMap>) -> impl Fn(&Value) -> Value + Send + Sync + 'static {
    move |value| {
        Value::List(
            items(value)
                .into_iter()
                .map(|item| build_record(Some(item), &mapping))
                .collect(),
        )
    }
}

/// Normalize a mix of bare strings and partial records into complete
/// records carrying `id_field`, `value_field` and `metadata`.
///
/// Missing identifiers are synthesized as `<prefix>_<position>` (1-based).
pub fn normalize_records(
    id_field: &str,
    value_field: &str,
    prefix: &str,
) -> impl Fn(&Value) -> Value + Send + Sync + 'static {
    let id_field = id_field.to_string();
    let value_field = value_field.to_string();
    let prefix = prefix.to_string();
    move |value| {
        let records = items(value)
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| {
                let synthetic_id = Value::String(format!("{}_{}", prefix, i + 1));
                match item {
                    Value::String(s) => Some(Value::object([
                        (id_field.clone(), synthetic_id),
                        (value_field.clone(), Value::String(s.clone())),
                        ("metadata".to_string(), Value::empty_object()),
                    ])),
                    Value::Object(map) => {
                        let mut record = map.clone();
                        let has_id = record
                            .get(&id_field)
                            .and_then(scalar_to_string)
                            .is_some_and(|id| !id.is_empty());
                        if !has_id {
                            record.insert(id_field.clone(), synthetic_id);
                        }
                        if record.get(&value_field).map_or(true, Value::is_null) {
                            record.insert(value_field.clone(), Value::String(String::new()));
                        }
                        if record.get("metadata").map_or(true, Value::is_null) {
                            record.insert("metadata".to_string(), Value::empty_object());
                        }
                        Some(Value::Object(record))
                    }
                    _ => None,
                }
            })
            .collect();
        Value::List(records)
    }
}

/// Count-based description of a list, for fields expecting prose
pub fn summarize(singular: &str, plural: &str) -> impl Fn(&Value) -> Value + Send + Sync + 'static {
    let singular = singular.to_string();
    let plural = plural.to_string();
    move |value| {
        let text = match value {
            Value::String(s) => s.clone(),
            other => match items(other).len() {
                0 => format!("No {}", plural),
                1 => format!("1 {}", singular),
                n => format!("{} {}", n, plural),
            },
        };
        Value::String(text)
    }
}

/// Text joined from `field` of every record
pub fn join_text(field: &str, separator: &str) -> impl Fn(&Value) -> Value + Send + Sync + 'static {
    let field = field.to_string();
    let separator = separator.to_string();
    move |value| {
        let parts: Vec<String> = items(value)
            .into_iter()
            .filter_map(|item| text_of(item, &field))
            .filter_map(|v| scalar_to_string(&v))
            .filter(|s| !s.is_empty())
            .collect();
        Value::String(parts.join(&separator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn copies() -> Value {
        Value::list([
            Value::object([("copy_id", "c1"), ("copy_text", "Fresh roast, every morning")]),
            Value::object([("copy_id", "c2"), ("copy_text", "Second take")]),
        ])
    }

    #[test]
    fn unregistered_key_is_identity() {
        let registry = TransformerRegistry::new();
        let key = TransformKey::new("a", "x", "b", "y");
        let value = copies();
        assert_eq!(registry.apply(&key, &value), value);
    }

    #[test]
    fn registered_key_applies() {
        let mut registry = TransformerRegistry::new();
        let key = TransformKey::new("copy", "generated_copies", "visual", "prompt");
        registry.register(key.clone(), extract_first("copy_text"));

        assert!(registry.contains(&key));
        assert_eq!(registry.apply(&key, &copies()), Value::from("Fresh roast, every morning"));
    }

    #[test]
    fn extract_first_handles_degenerate_input() {
        let extract = extract_first("copy_text");
        assert_eq!(extract(&Value::empty_list()), Value::from(""));
        assert_eq!(extract(&Value::from("already text")), Value::from("already text"));
        assert_eq!(extract(&Value::list([Value::empty_object()])), Value::from(""));
    }

    #[test]
    fn pluck_names() {
        let segments = Value::list([
            Value::object([("segment_name", "Students")]),
            Value::object([("estimated_reach", Value::from(10))]),
            Value::from("Parents"),
        ]);
        assert_eq!(
            pluck("segment_name")(&segments),
            Value::list(["Students", "Parents"])
        );
    }

    #[test]
    fn first_record_with_defaults() {
        let times = Value::list([Value::object([("platform", "instagram")])]);
        let shape = first_record_as(vec![
            prop("platform", "platform", "instagram"),
            prop("time_slots", "time_slots", Value::empty_list()),
        ]);
        assert_eq!(
            shape(&times),
            Value::object([
                ("platform", Value::from("instagram")),
                ("time_slots", Value::empty_list()),
            ])
        );
        assert_eq!(
            shape(&Value::empty_list()),
            Value::object([
                ("platform", Value::from("instagram")),
                ("time_slots", Value::empty_list()),
            ])
        );
    }

    #[test]
    fn normalize_mixed_items() {
        let images = Value::list([
            Value::from("https://img/1.png"),
            Value::object([("image_url", "https://img/2.png")]),
            Value::object([
                ("image_id", Value::from("hero")),
                ("image_url", Value::from("https://img/3.png")),
                ("metadata", Value::object([("style", "minimal")])),
            ]),
        ]);

        let normalized = normalize_records("image_id", "image_url", "image")(&images);
        assert_eq!(
            normalized,
            Value::list([
                Value::object([
                    ("image_id", Value::from("image_1")),
                    ("image_url", Value::from("https://img/1.png")),
                    ("metadata", Value::empty_object()),
                ]),
                Value::object([
                    ("image_id", Value::from("image_2")),
                    ("image_url", Value::from("https://img/2.png")),
                    ("metadata", Value::empty_object()),
                ]),
                Value::object([
                    ("image_id", Value::from("hero")),
                    ("image_url", Value::from("https://img/3.png")),
                    ("metadata", Value::object([("style", "minimal")])),
                ]),
            ])
        );
    }

    #[test]
    fn summarize_counts() {
        let summary = summarize("scheduled post", "scheduled posts");
        assert_eq!(summary(&Value::empty_list()), Value::from("No scheduled posts"));
        assert_eq!(summary(&Value::list(["a"])), Value::from("1 scheduled post"));
        assert_eq!(summary(&Value::list(["a", "b", "c"])), Value::from("3 scheduled posts"));
    }

    #[test]
    fn map_and_join() {
        let leads = Value::list([Value::object([
            ("contact_name", "Ada"),
            ("email", "ada@example.com"),
        ])]);
        let recipients = map_records(vec![
            prop("name", "contact_name", ""),
            prop("email", "email", ""),
            prop("personal_description", "notes", ""),
        ])(&leads);
        assert_eq!(
            recipients,
            Value::list([Value::object([
                ("name", "Ada"),
                ("email", "ada@example.com"),
                ("personal_description", ""),
            ])])
        );

        let names = join_text("segment_name", ", ")(&Value::list([
            Value::object([("segment_name", "Students")]),
            Value::object([("segment_name", "Parents")]),
        ]));
        assert_eq!(names, Value::from("Students, Parents"));
    }
}
