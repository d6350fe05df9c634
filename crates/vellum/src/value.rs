//! Runtime values shared by state, expressions and the document.
//!
//! Aggregates are reference types: cloning a `Value::List` or `Value::Map`
//! clones the handle, not the items, the same way two JavaScript variables can
//! point at one array. `Value::State` is the observed form of a map or list.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::document::{Event, NodeId};
use crate::error::Result;
use crate::expression::Arrow;
use crate::state::State;

/// Longest list or string that a count taken from a number may produce.
pub const MAX_LENGTH: usize = 1 << 24;

/// `number` as a count, if it is a non-negative integer no larger than
/// [`MAX_LENGTH`].
pub(crate) fn bounded_count(number: f64) -> Option<usize> {
    (number >= 0.0 && number.fract() == 0.0 && number <= MAX_LENGTH as f64)
        .then(|| number as usize)
}

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type MapRef = Rc<RefCell<IndexMap<String, Value>>>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Text(Rc<str>),
    List(ListRef),
    Map(MapRef),
    /// Observed map or list; reads wrap nested aggregates, writes notify the root.
    State(State),
    Function(Function),
    Node(NodeId),
    Event(Rc<Event>),
}

/// The storage behind a map or list, observed or not.
#[derive(Clone)]
pub enum Container {
    Map(MapRef),
    List(ListRef),
}

impl Container {
    pub fn ptr_eq(&self, other: &Container) -> bool {
        match (self, other) {
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b),
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Map(map) => Value::Map(map),
            Self::List(list) => Value::List(list),
        }
    }
}

#[derive(Clone)]
pub enum Function {
    Native(Rc<NativeFunction>),
    Arrow(Rc<Arrow>),
}

pub struct NativeFunction {
    pub name: String,
    pub call: Box<dyn Fn(&[Value]) -> Result<Value>>,
}

impl Function {
    pub fn native(
        name: impl Into<String>,
        call: impl Fn(&[Value]) -> Result<Value> + 'static,
    ) -> Self {
        Self::Native(Rc::new(NativeFunction {
            name: name.into(),
            call: Box::new(call),
        }))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Native(native) => &native.name,
            Self::Arrow(_) => "anonymous",
        }
    }

    fn ptr_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Self::Native(a), Self::Native(b)) => Rc::ptr_eq(a, b),
            (Self::Arrow(a), Self::Arrow(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    pub fn text(text: impl AsRef<str>) -> Self {
        Self::Text(text.as_ref().into())
    }

    pub fn number(number: impl Into<f64>) -> Self {
        Self::Number(number.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn map(fields: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Self {
        Self::Map(Rc::new(RefCell::new(
            fields
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )))
    }

    pub fn empty_map() -> Self {
        Self::Map(Rc::default())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_state(&self) -> Option<&State> {
        match self {
            Self::State(state) => Some(state),
            _ => None,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Map or list storage, seen through an observer if there is one.
    pub fn container(&self) -> Option<Container> {
        match self {
            Self::Map(map) => Some(Container::Map(map.clone())),
            Self::List(list) => Some(Container::List(list.clone())),
            Self::State(state) => Some(state.container().clone()),
            _ => None,
        }
    }

    /// JavaScript truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(value) => *value,
            Self::Number(number) => *number != 0.0 && !number.is_nan(),
            Self::Text(text) => !text.is_empty(),
            _ => true,
        }
    }

    /// Numeric conversion as done by arithmetic operators.
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(value) => f64::from(u8::from(*value)),
            Self::Number(number) => *number,
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Self::List(_) | Self::State(_) | Self::Map(_) => {
                let text = self.to_string();
                if text.is_empty() {
                    0.0
                } else {
                    text.trim().parse().unwrap_or(f64::NAN)
                }
            }
            Self::Function(_) | Self::Node(_) | Self::Event(_) => f64::NAN,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "string",
            Self::Function(_) => "function",
            Self::Null | Self::List(_) | Self::Map(_) | Self::State(_) | Self::Node(_) | Self::Event(_) => {
                "object"
            }
        }
    }

    /// `===`: identity for aggregates, value equality for primitives.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            (Self::Node(a), Self::Node(b)) => a == b,
            (Self::Event(a), Self::Event(b)) => Rc::ptr_eq(a, b),
            _ => match (self.container(), other.container()) {
                (Some(a), Some(b)) => a.ptr_eq(&b),
                _ => false,
            },
        }
    }

    /// `==`: `null == undefined`, and primitives compare numerically when
    /// their types differ.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (
                Self::Number(_) | Self::Text(_) | Self::Bool(_),
                Self::Number(_) | Self::Text(_) | Self::Bool(_),
            ) => self.to_number() == other.to_number(),
            _ => self.strict_eq(other),
        }
    }

    /// Snapshot of the items a `v-for` iterates over.
    ///
    /// Lists yield their items, strings their characters, maps their values
    /// and a number `n` up to [`MAX_LENGTH`] the indices `0..n`. Items of
    /// observed lists are read through the observer so nested aggregates come
    /// back wrapped.
    pub fn iterate(&self) -> Option<Vec<Value>> {
        match self {
            Self::State(state) => Some(state.items()),
            Self::List(list) => Some(list.borrow().clone()),
            Self::Map(map) => Some(map.borrow().values().cloned().collect()),
            Self::Text(text) => Some(text.chars().map(|character| Value::text(character.to_string())).collect()),
            Self::Number(number) => bounded_count(*number)
                .map(|count| (0..count).map(|index| Value::Number(index as f64)).collect()),
            _ => None,
        }
    }

    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(value) => Self::Bool(*value),
            serde_json::Value::Number(number) => Self::Number(number.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(text) => Self::text(text),
            serde_json::Value::Array(items) => Self::list(items.iter().map(Self::from_json)),
            serde_json::Value::Object(fields) => Self::map(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), Self::from_json(value))),
            ),
        }
    }

    /// JSON view of plain data; functions, nodes and events become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Undefined | Self::Null | Self::Function(_) | Self::Node(_) | Self::Event(_) => {
                serde_json::Value::Null
            }
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Number(number) => {
                if number.fract() == 0.0 && number.abs() < 9.0e15 {
                    serde_json::Value::from(*number as i64)
                } else {
                    serde_json::Number::from_f64(*number)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                }
            }
            Self::Text(text) => serde_json::Value::String(text.to_string()),
            _ => match self.container() {
                Some(Container::List(list)) => {
                    serde_json::Value::Array(list.borrow().iter().map(Value::to_json).collect())
                }
                Some(Container::Map(map)) => serde_json::Value::Object(
                    map.borrow()
                        .iter()
                        .map(|(key, value)| (key.clone(), value.to_json()))
                        .collect(),
                ),
                None => serde_json::Value::Null,
            },
        }
    }
}

pub(crate) fn format_number(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_owned()
    } else if number.is_infinite() {
        if number > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
    } else if number == 0.0 {
        "0".to_owned()
    } else {
        number.to_string()
    }
}

/// The string conversion applied by template interpolation.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(number) => write!(f, "{}", format_number(*number)),
            Self::Text(text) => write!(f, "{text}"),
            Self::Function(function) => write!(f, "function {}() {{ [native code] }}", function.name()),
            Self::Node(_) => write!(f, "[object HTMLElement]"),
            Self::Event(_) => write!(f, "[object Event]"),
            _ => match self.container() {
                Some(Container::List(list)) => {
                    let list = list.borrow();
                    for (index, item) in list.iter().enumerate() {
                        if index > 0 {
                            write!(f, ",")?;
                        }
                        if !item.is_nullish() {
                            write!(f, "{item}")?;
                        }
                    }
                    Ok(())
                }
                _ => write!(f, "[object Object]"),
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Function(function) => write!(f, "Function({})", function.name()),
            Self::Node(node) => write!(f, "Node({node})"),
            Self::Event(event) => write!(f, "Event({})", event.name),
            Self::State(_) | Self::List(_) | Self::Map(_) => {
                let prefix = if matches!(self, Self::State(_)) { "State " } else { "" };
                write!(f, "{prefix}{}", self.to_json())
            }
            other => write!(f, "{other}"),
        }
    }
}

/// Structural equality, used by tests and the CLI to compare plain data.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Function(_), _) | (_, Self::Function(_)) => self.strict_eq(other),
            (Self::Node(a), Self::Node(b)) => a == b,
            (Self::Event(a), Self::Event(b)) => a == b,
            (Self::Node(_) | Self::Event(_), _) | (_, Self::Node(_) | Self::Event(_)) => false,
            (Self::Number(a), Self::Number(b)) => a == b,
            _ => match (self.container(), other.container()) {
                (Some(_), Some(_)) | (None, None) => self.to_json() == other.to_json() && self.type_of() == other.type_of(),
                _ => false,
            },
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_display_like_javascript() {
        assert_eq!(Value::from(5).to_string(), "5");
        assert_eq!(Value::from(0.5).to_string(), "0.5");
        assert_eq!(Value::from(-0.0).to_string(), "0");
        assert_eq!(Value::from(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::from(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn lists_join_with_commas() {
        let list = Value::list([Value::from(1), Value::Null, Value::from("a")]);
        assert_eq!(list.to_string(), "1,,a");
        assert_eq!(Value::empty_map().to_string(), "[object Object]");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::Undefined.is_truthy());
        assert!(Value::list([]).is_truthy());
        assert!(Value::from("0").is_truthy());
    }

    #[test]
    fn loose_and_strict_equality() {
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(!Value::Null.strict_eq(&Value::Undefined));
        assert!(Value::from("5").loose_eq(&Value::from(5)));
        assert!(!Value::from("5").strict_eq(&Value::from(5)));
        let list = Value::list([]);
        assert!(list.strict_eq(&list.clone()));
        assert!(!list.strict_eq(&Value::list([])));
    }

    #[test]
    fn iterate_materializes_sources() {
        assert_eq!(Value::from(3).iterate().unwrap().len(), 3);
        assert_eq!(Value::from("ab").iterate().unwrap(), vec![Value::from("a"), Value::from("b")]);
        assert!(Value::from(true).iterate().is_none());
    }

    #[test]
    fn json_round_trip_keeps_field_order() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"b": 1, "a": [true, null, "x"], "c": 1.5}"#).unwrap();
        let value = Value::from_json(&json);
        assert_eq!(value.to_json(), json);
        let keys: Vec<String> = match &value {
            Value::Map(map) => map.borrow().keys().cloned().collect(),
            _ => unreachable!(),
        };
        assert_eq!(keys, ["b", "a", "c"]);
    }
}
