//! Named components resolved by `v-mount`.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Markup plus initial fields for the component scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Component {
    pub markup: String,
    pub fields: Vec<(String, Value)>,
}

impl Component {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// Where `v-mount` looks a component up before falling back to the
/// document's templates.
pub trait ComponentSource {
    fn component(&self, name: &str) -> Option<Component>;
}

#[derive(Debug, Clone, Default)]
pub struct Components {
    components: IndexMap<String, Component>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, component: Component) {
        self.components.insert(name.into(), component);
    }

    pub fn with(mut self, name: impl Into<String>, component: Component) -> Self {
        self.insert(name, component);
        self
    }

    /// `{"name": {"$html": "<p>..</p>", "field": 1}}`. `markup_key` names
    /// the entry holding the markup, every other entry becomes a field.
    pub fn from_json(json: &serde_json::Value, markup_key: &str) -> Result<Self> {
        let serde_json::Value::Object(entries) = json else {
            return Err(Error::structural("components must be a JSON object"));
        };
        let mut components = Self::new();
        for (name, entry) in entries {
            let serde_json::Value::Object(fields) = entry else {
                return Err(Error::structural(format!(
                    "component `{name}` must be a JSON object"
                )));
            };
            let markup = fields
                .get(markup_key)
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| {
                    Error::structural(format!("component `{name}` has no `{markup_key}` markup"))
                })?;
            let mut component = Component::new(markup);
            for (field, value) in fields {
                if field != markup_key {
                    component.fields.push((field.clone(), Value::from_json(value)));
                }
            }
            components.insert(name.clone(), component);
        }
        Ok(components)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl ComponentSource for Components {
    fn component(&self, name: &str) -> Option<Component> {
        self.components.get(name).cloned()
    }
}
