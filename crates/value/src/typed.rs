use crate::{MimeValue, RawValue};
use serde_json::{Map, Number, Value};

/// The result of resolving a [`MimeValue`] against a declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Map(Map<String, Value>),
    List(Vec<TypedValue>),
    /// A raw value passed through untyped, e.g. the element of a list declared without generics.
    Raw(RawValue),
    /// A value whose type has no registered resolver.
    Unresolved(TypeDescriptor),
}

/// Describes a value the engine could not type: the declared class, its generic parameters and
/// the original value, untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub class: String,
    pub generic: Vec<String>,
    pub value: MimeValue,
}

impl TypedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        match self {
            TypedValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Renders the value as JSON, for logging or for backends that speak JSON.
    ///
    /// Non finite floats become `null`, bytes are rendered as (lossy) UTF-8 text and streams are
    /// rendered as `null` since reading them here would consume them.
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::String(s) => Value::String(s.clone()),
            TypedValue::Integer(i) => Value::from(*i),
            TypedValue::Long(l) => Value::from(*l),
            TypedValue::Float(f) => Number::from_f64(f64::from(*f)).map_or(Value::Null, Value::Number),
            TypedValue::Double(d) => Number::from_f64(*d).map_or(Value::Null, Value::Number),
            TypedValue::Boolean(b) => Value::Bool(*b),
            TypedValue::Map(map) => Value::Object(map.clone()),
            TypedValue::List(items) => Value::Array(items.iter().map(TypedValue::to_json).collect()),
            TypedValue::Raw(raw) => raw_to_json(raw),
            TypedValue::Unresolved(descriptor) => {
                let mut object = Map::new();
                object.insert("class".into(), Value::String(descriptor.class.clone()));
                object.insert(
                    "generic".into(),
                    Value::Array(descriptor.generic.iter().cloned().map(Value::String).collect()),
                );
                object.insert("value".into(), raw_to_json(descriptor.value.value()));
                Value::Object(object)
            }
        }
    }
}

fn raw_to_json(raw: &RawValue) -> Value {
    match raw {
        RawValue::Text(text) => Value::String(text.clone()),
        RawValue::Bytes(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        RawValue::Json(value) => value.clone(),
        RawValue::Stream(_) => Value::Null,
    }
}
