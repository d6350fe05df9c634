use indexmap::IndexMap;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::value::{Container, Function, Value};

/// Host-provided global names, the last step of name resolution.
#[derive(Clone, Default)]
pub struct Ambient {
    self_name: String,
    globals: IndexMap<String, Value>,
}

impl Ambient {
    pub fn new(config: &Config) -> Self {
        Self {
            self_name: config.self_name.clone(),
            globals: IndexMap::new(),
        }
    }

    /// `Math`, `JSON`, `console` and friends.
    pub fn standard(config: &Config) -> Self {
        let mut ambient = Self::new(config);
        for (name, value) in standard_globals() {
            ambient.insert(name, value);
        }
        ambient
    }

    /// Names starting with a digit or equal to the self name can never be
    /// referenced and are skipped.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        let starts_with_digit = name.chars().next().is_some_and(|first| first.is_ascii_digit());
        if name.is_empty() || starts_with_digit || name == self.self_name {
            tracing::debug!(name, "ambient name skipped");
            return false;
        }
        self.globals.insert(name, value);
        true
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.globals.keys().map(String::as_str)
    }
}

fn argument(arguments: &[Value], index: usize) -> Value {
    arguments.get(index).cloned().unwrap_or_default()
}

fn number_argument(arguments: &[Value], index: usize) -> f64 {
    argument(arguments, index).to_number()
}

fn math_unary(name: &str, operation: fn(f64) -> f64) -> (String, Value) {
    (
        name.to_owned(),
        Value::Function(Function::native(name, move |arguments| {
            Ok(Value::Number(operation(number_argument(arguments, 0))))
        })),
    )
}

fn math() -> Value {
    let mut fields = vec![
        ("PI".to_owned(), Value::Number(std::f64::consts::PI)),
        ("E".to_owned(), Value::Number(std::f64::consts::E)),
        math_unary("floor", f64::floor),
        math_unary("ceil", f64::ceil),
        math_unary("round", |number| (number + 0.5).floor()),
        math_unary("trunc", f64::trunc),
        math_unary("abs", f64::abs),
        math_unary("sqrt", f64::sqrt),
        math_unary("sign", |number| {
            if number.is_nan() || number == 0.0 {
                number
            } else {
                number.signum()
            }
        }),
    ];
    fields.push((
        "pow".to_owned(),
        Value::Function(Function::native("pow", |arguments| {
            Ok(Value::Number(
                number_argument(arguments, 0).powf(number_argument(arguments, 1)),
            ))
        })),
    ));
    fields.push((
        "min".to_owned(),
        Value::Function(Function::native("min", |arguments| {
            Ok(Value::Number(arguments.iter().map(Value::to_number).fold(
                f64::INFINITY,
                |min, number| if number.is_nan() || min.is_nan() { f64::NAN } else { min.min(number) },
            )))
        })),
    ));
    fields.push((
        "max".to_owned(),
        Value::Function(Function::native("max", |arguments| {
            Ok(Value::Number(arguments.iter().map(Value::to_number).fold(
                f64::NEG_INFINITY,
                |max, number| if number.is_nan() || max.is_nan() { f64::NAN } else { max.max(number) },
            )))
        })),
    ));
    Value::map(fields)
}

fn parse_int(arguments: &[Value]) -> Result<Value> {
    let text = argument(arguments, 0).to_string();
    let text = text.trim();
    let radix = match argument(arguments, 1) {
        Value::Undefined => 10,
        radix => radix.to_number() as u32,
    };
    if !(2..=36).contains(&radix) {
        return Ok(Value::Number(f64::NAN));
    }
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };
    let digits: String = digits
        .chars()
        .take_while(|character| character.is_digit(radix))
        .collect();
    if digits.is_empty() {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(match i64::from_str_radix(&digits, radix) {
        Ok(number) => Value::Number(sign * number as f64),
        Err(_) => Value::Number(f64::NAN),
    })
}

fn parse_float(arguments: &[Value]) -> Result<Value> {
    let text = argument(arguments, 0).to_string();
    let text = text.trim_start();
    // Longest prefix that still parses, `parseFloat('1.5px')` is 1.5
    let number = (1..=text.len())
        .rev()
        .filter(|end| text.is_char_boundary(*end))
        .find_map(|end| text[..end].parse::<f64>().ok())
        .filter(|_| !text.starts_with(|character: char| character.is_ascii_alphabetic()))
        .unwrap_or(f64::NAN);
    Ok(Value::Number(number))
}

fn console_method(name: &'static str) -> (String, Value) {
    (
        name.to_owned(),
        Value::Function(Function::native(name, move |arguments| {
            let message = arguments
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            match name {
                "error" => tracing::error!(target: "vellum::console", "{message}"),
                "warn" => tracing::warn!(target: "vellum::console", "{message}"),
                _ => tracing::info!(target: "vellum::console", "{message}"),
            }
            Ok(Value::Undefined)
        })),
    )
}

fn object_fields(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::State(state) => state.entries(),
        _ => match value.container() {
            Some(Container::Map(map)) => map
                .borrow()
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            Some(Container::List(list)) => list
                .borrow()
                .iter()
                .enumerate()
                .map(|(index, value)| (index.to_string(), value.clone()))
                .collect(),
            None => Vec::new(),
        },
    }
}

fn standard_globals() -> Vec<(String, Value)> {
    let native = |name: &str, call: fn(&[Value]) -> Result<Value>| {
        (name.to_owned(), Value::Function(Function::native(name, call)))
    };
    vec![
        ("Math".to_owned(), math()),
        ("NaN".to_owned(), Value::Number(f64::NAN)),
        ("Infinity".to_owned(), Value::Number(f64::INFINITY)),
        native("String", |arguments| {
            Ok(Value::text(arguments.first().map(Value::to_string).unwrap_or_default()))
        }),
        native("Number", |arguments| {
            Ok(Value::Number(arguments.first().map_or(0.0, Value::to_number)))
        }),
        native("Boolean", |arguments| {
            Ok(Value::Bool(argument(arguments, 0).is_truthy()))
        }),
        native("parseInt", parse_int),
        native("parseFloat", parse_float),
        native("isNaN", |arguments| {
            Ok(Value::Bool(number_argument(arguments, 0).is_nan()))
        }),
        (
            "JSON".to_owned(),
            Value::map([
                (
                    "stringify",
                    Value::Function(Function::native("stringify", |arguments| {
                        serde_json::to_string(&argument(arguments, 0).to_json())
                            .map(Value::from)
                            .map_err(|error| Error::evaluation("", error.to_string()))
                    })),
                ),
                (
                    "parse",
                    Value::Function(Function::native("parse", |arguments| {
                        serde_json::from_str::<serde_json::Value>(&argument(arguments, 0).to_string())
                            .map(|json| Value::from_json(&json))
                            .map_err(|error| Error::evaluation("", error.to_string()))
                    })),
                ),
            ]),
        ),
        (
            "console".to_owned(),
            Value::map([
                console_method("log"),
                console_method("info"),
                console_method("warn"),
                console_method("error"),
            ]),
        ),
        (
            "Array".to_owned(),
            Value::map([(
                "isArray",
                Value::Function(Function::native("isArray", |arguments| {
                    Ok(Value::Bool(matches!(
                        argument(arguments, 0).container(),
                        Some(Container::List(_))
                    )))
                })),
            )]),
        ),
        (
            "Object".to_owned(),
            Value::map([
                (
                    "keys",
                    Value::Function(Function::native("keys", |arguments| {
                        Ok(Value::list(
                            object_fields(&argument(arguments, 0))
                                .into_iter()
                                .map(|(key, _)| Value::from(key)),
                        ))
                    })),
                ),
                (
                    "values",
                    Value::Function(Function::native("values", |arguments| {
                        Ok(Value::list(
                            object_fields(&argument(arguments, 0))
                                .into_iter()
                                .map(|(_, value)| value),
                        ))
                    })),
                ),
            ]),
        ),
    ]
}
