use std::rc::Rc;

use super::{
    AssignOperator, BinaryOperator, Env, Expr, Literal, LogicalOperator, Spanned, Statement,
    TemplatePart, UnaryOperator, UpdateOperator,
};
use crate::document::{self, Event};
use crate::error::{Error, Result};
use crate::state::State;
use crate::value::{
    Container, Function, ListRef, MAX_LENGTH, Value, bounded_count, format_number,
};

type Locals = Vec<(String, Value)>;

/// A function literal together with everything it closed over.
pub struct Arrow {
    parameters: Vec<String>,
    body: Rc<Spanned<Expr>>,
    env: Rc<Env>,
    locals: Locals,
}

fn fail(message: impl Into<String>) -> Error {
    Error::evaluation("", message)
}

pub(crate) fn run(env: &Rc<Env>, statements: &[Spanned<Statement>]) -> Result<Value> {
    Interpreter {
        env,
        locals: Locals::new(),
    }
    .statements(statements)
}

pub(crate) fn call_function(function: &Function, arguments: Vec<Value>) -> Result<Value> {
    match function {
        Function::Native(native) => (native.call)(&arguments),
        Function::Arrow(arrow) => {
            let mut locals = arrow.locals.clone();
            let mut arguments = arguments.into_iter();
            for parameter in &arrow.parameters {
                locals.push((parameter.clone(), arguments.next().unwrap_or_default()));
            }
            let mut interpreter = Interpreter {
                env: &arrow.env,
                locals,
            };
            interpreter.evaluate(&arrow.body)
        }
    }
}

/// Where an assignment writes to.
enum Place {
    Local(usize),
    Member(Value, String),
}

struct Interpreter<'env> {
    env: &'env Rc<Env>,
    locals: Locals,
}

impl Interpreter<'_> {
    fn scope(&self) -> &State {
        &self.env.scope
    }

    fn statements(&mut self, statements: &[Spanned<Statement>]) -> Result<Value> {
        let mut last = Value::Undefined;
        for statement in statements {
            match &statement.node {
                Statement::Expression(expression) => last = self.evaluate(expression)?,
                Statement::Return(expression) => return self.evaluate(expression),
            }
        }
        Ok(last)
    }

    fn evaluate(&mut self, expression: &Spanned<Expr>) -> Result<Value> {
        match &expression.node {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Number(number) => Value::Number(*number),
                Literal::Text(text) => Value::Text(text.clone()),
                Literal::Bool(value) => Value::Bool(*value),
                Literal::Null => Value::Null,
                Literal::Undefined => Value::Undefined,
            }),
            Expr::Template(template) => {
                let mut rendered = String::new();
                for part in template.parts() {
                    match part {
                        TemplatePart::Literal(text) => rendered.push_str(text),
                        TemplatePart::Substitution(code) => {
                            let value = self.statements(code.statements())?;
                            rendered.push_str(&value.to_string());
                        }
                    }
                }
                Ok(Value::from(rendered))
            }
            Expr::Identifier(name) => self.lookup(name),
            Expr::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.evaluate(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::list(items))
            }
            Expr::Object(entries) => {
                let mut fields = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    fields.push((key.clone(), self.evaluate(value)?));
                }
                Ok(Value::map(fields))
            }
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let object = self.evaluate(object)?;
                if *optional && object.is_nullish() {
                    return Ok(Value::Undefined);
                }
                self.get_member(&object, property)
            }
            Expr::Index { object, index } => {
                let object = self.evaluate(object)?;
                let key = property_key(&self.evaluate(index)?);
                self.get_member(&object, &key)
            }
            Expr::Call { callee, arguments } => self.call(callee, arguments),
            Expr::Arrow { parameters, body } => Ok(Value::Function(Function::Arrow(Rc::new(
                Arrow {
                    parameters: parameters.clone(),
                    body: body.clone(),
                    env: self.env.clone(),
                    locals: self.locals.clone(),
                },
            )))),
            Expr::Unary { operator, operand } => {
                if let (UnaryOperator::Typeof, Expr::Identifier(name)) = (operator, &operand.node) {
                    // `typeof missing` is "undefined", not an error
                    let value = self.lookup(name).unwrap_or_default();
                    return Ok(Value::from(value.type_of()));
                }
                let operand = self.evaluate(operand)?;
                Ok(match operator {
                    UnaryOperator::Not => Value::Bool(!operand.is_truthy()),
                    UnaryOperator::Negate => Value::Number(-operand.to_number()),
                    UnaryOperator::Plus => Value::Number(operand.to_number()),
                    UnaryOperator::Typeof => Value::from(operand.type_of()),
                })
            }
            Expr::Binary {
                operator,
                operand_a,
                operand_b,
            } => {
                let operand_a = self.evaluate(operand_a)?;
                let operand_b = self.evaluate(operand_b)?;
                Ok(binary(*operator, &operand_a, &operand_b))
            }
            Expr::Logical {
                operator,
                operand_a,
                operand_b,
            } => {
                let operand_a = self.evaluate(operand_a)?;
                let short_circuit = match operator {
                    LogicalOperator::And => !operand_a.is_truthy(),
                    LogicalOperator::Or => operand_a.is_truthy(),
                    LogicalOperator::Nullish => !operand_a.is_nullish(),
                };
                if short_circuit {
                    Ok(operand_a)
                } else {
                    self.evaluate(operand_b)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.evaluate(test)?.is_truthy() {
                    self.evaluate(consequent)
                } else {
                    self.evaluate(alternate)
                }
            }
            Expr::Assign {
                operator,
                target,
                value,
            } => {
                let place = self.place(target)?;
                let value = match operator {
                    AssignOperator::Assign => self.evaluate(value)?,
                    operator => {
                        let current = self.read(&place)?;
                        let operand = self.evaluate(value)?;
                        let operator = match operator {
                            AssignOperator::Add => BinaryOperator::Add,
                            AssignOperator::Subtract => BinaryOperator::Subtract,
                            AssignOperator::Multiply => BinaryOperator::Multiply,
                            AssignOperator::Divide | AssignOperator::Assign => {
                                BinaryOperator::Divide
                            }
                        };
                        binary(operator, &current, &operand)
                    }
                };
                self.write(place, value.clone())?;
                Ok(value)
            }
            Expr::Update {
                operator,
                prefix,
                target,
            } => {
                let place = self.place(target)?;
                let old = self.read(&place)?.to_number();
                let new = match operator {
                    UpdateOperator::Increment => old + 1.0,
                    UpdateOperator::Decrement => old - 1.0,
                };
                self.write(place, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
        }
    }

    /// Locals, then extra parameters, then the self name, `this`, fields of
    /// the scope and finally ambient globals.
    fn lookup(&self, name: &str) -> Result<Value> {
        if let Some((_, value)) = self.locals.iter().rev().find(|(local, _)| local == name) {
            return Ok(value.clone());
        }
        if let Some((_, value)) = self.env.parameters.iter().find(|(parameter, _)| parameter == name) {
            return Ok(value.clone());
        }
        let scope = self.scope();
        if name == scope.config().self_name {
            return Ok(Value::State(scope.clone()));
        }
        if name == "this" {
            return Ok(self.env.this.clone());
        }
        if scope.has(name) {
            return Ok(scope.get(name));
        }
        scope
            .ambient()
            .get(name)
            .ok_or_else(|| fail(format!("{name} is not defined")))
    }

    fn place(&mut self, target: &Spanned<Expr>) -> Result<Place> {
        match &target.node {
            Expr::Identifier(name) => self
                .locals
                .iter()
                .rposition(|(local, _)| local == name)
                .map(Place::Local)
                .ok_or_else(|| {
                    fail(format!(
                        "cannot assign to `{name}`, assign to a field like `{}.{name}` instead",
                        self.scope().config().self_name
                    ))
                }),
            Expr::Member {
                object, property, ..
            } => Ok(Place::Member(self.evaluate(object)?, property.clone())),
            Expr::Index { object, index } => {
                let object = self.evaluate(object)?;
                let key = property_key(&self.evaluate(index)?);
                Ok(Place::Member(object, key))
            }
            _ => Err(fail("invalid assignment target")),
        }
    }

    fn read(&self, place: &Place) -> Result<Value> {
        match place {
            Place::Local(index) => Ok(self.locals[*index].1.clone()),
            Place::Member(object, key) => self.get_member(object, key),
        }
    }

    fn write(&mut self, place: Place, value: Value) -> Result<()> {
        match place {
            Place::Local(index) => {
                self.locals[index].1 = value;
                Ok(())
            }
            Place::Member(object, key) => self.set_member(&object, &key, value),
        }
    }

    fn get_member(&self, object: &Value, key: &str) -> Result<Value> {
        Ok(match object {
            Value::Undefined | Value::Null => {
                return Err(fail(format!(
                    "cannot read properties of {object} (reading '{key}')"
                )));
            }
            Value::State(state) => state.get(key),
            Value::Map(map) => map.borrow().get(key).cloned().unwrap_or_default(),
            Value::List(list) => {
                let list = list.borrow();
                match key {
                    "length" => Value::from(list.len()),
                    key => key
                        .parse::<usize>()
                        .ok()
                        .and_then(|index| list.get(index).cloned())
                        .unwrap_or_default(),
                }
            }
            Value::Text(text) => match key {
                "length" => Value::from(text.chars().count()),
                key => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| text.chars().nth(index))
                    .map(|character| Value::from(character.to_string()))
                    .unwrap_or_default(),
            },
            Value::Node(node) => {
                let document = self.scope().document();
                let document = document.borrow();
                match key {
                    "value" | "checked" => document.property(*node, key),
                    "tagName" => document
                        .tag_name(*node)
                        .map(|tag| Value::from(tag.to_uppercase()))
                        .unwrap_or_default(),
                    "textContent" => document.text(*node).map(Value::from).unwrap_or_default(),
                    key => document
                        .attribute(*node, key)
                        .map(Value::from)
                        .unwrap_or_default(),
                }
            }
            Value::Event(event) => match key {
                "type" => Value::from(event.name.as_str()),
                "target" => Value::Node(event.target),
                "detail" => event.detail.clone(),
                _ => Value::Undefined,
            },
            Value::Function(function) if key == "name" => Value::from(function.name()),
            _ => Value::Undefined,
        })
    }

    fn set_member(&self, object: &Value, key: &str, value: Value) -> Result<()> {
        match object {
            Value::State(state) => state.set(key, value),
            Value::Map(map) => {
                map.borrow_mut().insert(key.to_owned(), value);
                Ok(())
            }
            Value::List(list) => {
                let index = key
                    .parse::<usize>()
                    .map_err(|_| fail(format!("cannot set property '{key}' of a list")))?;
                if index >= MAX_LENGTH {
                    return Err(fail(format!("invalid list index {key}")));
                }
                let mut list = list.borrow_mut();
                if index >= list.len() {
                    list.resize(index + 1, Value::Undefined);
                }
                list[index] = value;
                Ok(())
            }
            Value::Node(node) => {
                let document = self.scope().document();
                document::set_attribute_or_property(&mut *document.borrow_mut(), *node, key, value);
                Ok(())
            }
            _ => Err(fail(format!(
                "cannot set properties of {object} (setting '{key}')"
            ))),
        }
    }

    fn call(&mut self, callee: &Spanned<Expr>, arguments: &[Spanned<Expr>]) -> Result<Value> {
        let (receiver, name) = match &callee.node {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let receiver = self.evaluate(object)?;
                if *optional && receiver.is_nullish() {
                    return Ok(Value::Undefined);
                }
                (receiver, property.clone())
            }
            Expr::Index { object, index } => {
                let receiver = self.evaluate(object)?;
                let key = property_key(&self.evaluate(index)?);
                (receiver, key)
            }
            _ => {
                let function = self.evaluate(callee)?;
                let arguments = self.arguments(arguments)?;
                return match function {
                    Value::Function(function) => call_function(&function, arguments),
                    other => Err(fail(format!("{} is not a function", other.type_of()))),
                };
            }
        };

        let member = self.get_member(&receiver, &name)?;
        let arguments = self.arguments(arguments)?;
        if let Value::Function(function) = member {
            return call_function(&function, arguments);
        }
        self.call_method(&receiver, &name, arguments)
    }

    fn arguments(&mut self, arguments: &[Spanned<Expr>]) -> Result<Vec<Value>> {
        arguments
            .iter()
            .map(|argument| self.evaluate(argument))
            .collect()
    }

    fn call_method(&mut self, receiver: &Value, name: &str, arguments: Vec<Value>) -> Result<Value> {
        let handled = match receiver {
            Value::Text(text) => text_method(text, name, &arguments)?,
            Value::Number(number) => number_method(*number, name, &arguments),
            Value::Node(node) => self.node_method(*node, name, &arguments)?,
            _ => match receiver.container() {
                Some(Container::List(list)) => {
                    let target = match receiver {
                        Value::State(state) => ListTarget::Observed(state.clone()),
                        _ => ListTarget::Plain(list),
                    };
                    self.list_method(&target, name, &arguments)?
                }
                _ => None,
            },
        };
        match handled {
            Some(value) => Ok(value),
            None if name == "toString" => Ok(Value::from(receiver.to_string())),
            None => Err(fail(format!("{}.{name} is not a function", receiver.type_of()))),
        }
    }

    fn node_method(
        &self,
        node: crate::document::NodeId,
        name: &str,
        arguments: &[Value],
    ) -> Result<Option<Value>> {
        let document = self.scope().document();
        let argument = |index: usize| arguments.get(index).cloned().unwrap_or_default();
        Ok(match name {
            "getAttribute" => Some(
                document
                    .borrow()
                    .attribute(node, &argument(0).to_string())
                    .map(Value::from)
                    .unwrap_or(Value::Null),
            ),
            "setAttribute" => {
                document
                    .borrow_mut()
                    .set_attribute(node, &argument(0).to_string(), &argument(1).to_string());
                Some(Value::Undefined)
            }
            "removeAttribute" => {
                document
                    .borrow_mut()
                    .remove_attribute(node, &argument(0).to_string());
                Some(Value::Undefined)
            }
            "dispatchEvent" => {
                let event = match argument(0) {
                    Value::Event(event) => Event::new(event.name.clone(), node).with_detail(event.detail.clone()),
                    name => Event::new(name.to_string(), node).with_detail(argument(1)),
                };
                document::dispatch(&document, event)?;
                Some(Value::Bool(true))
            }
            _ => None,
        })
    }

    fn list_method(
        &mut self,
        target: &ListTarget,
        name: &str,
        arguments: &[Value],
    ) -> Result<Option<Value>> {
        let argument = |index: usize| arguments.get(index).cloned().unwrap_or_default();
        let callback = || match arguments.first() {
            Some(Value::Function(function)) => Ok(function.clone()),
            _ => Err(fail(format!("{name} expects a function"))),
        };

        Ok(Some(match name {
            "push" => Value::from(target.push(arguments.to_vec())?),
            "pop" => target.pop()?,
            "shift" => target.splice(0, 1, Vec::new())?.into_iter().next().unwrap_or_default(),
            "unshift" => {
                target.splice(0, 0, arguments.to_vec())?;
                Value::from(target.len())
            }
            "splice" => {
                let length = target.len();
                let start = relative_index(argument(0).to_number(), length);
                let count = match arguments.get(1) {
                    Some(count) => (count.to_number().max(0.0) as usize).min(length - start),
                    None => length - start,
                };
                let inserted = arguments.iter().skip(2).cloned().collect();
                Value::list(target.splice(start, count, inserted)?)
            }
            "reverse" => {
                let mut items = target.items();
                items.reverse();
                target.splice(0, items.len(), items)?;
                target.value()
            }
            "includes" => {
                let needle = argument(0);
                Value::Bool(target.items().iter().any(|item| same_value_zero(item, &needle)))
            }
            "indexOf" => {
                let needle = argument(0);
                target
                    .items()
                    .iter()
                    .position(|item| item.strict_eq(&needle))
                    .map_or(Value::Number(-1.0), Value::from)
            }
            "join" => {
                let separator = match argument(0) {
                    Value::Undefined => ",".to_owned(),
                    separator => separator.to_string(),
                };
                let joined = target
                    .items()
                    .iter()
                    .map(|item| if item.is_nullish() { String::new() } else { item.to_string() })
                    .collect::<Vec<_>>()
                    .join(&separator);
                Value::from(joined)
            }
            "slice" => {
                let items = target.items();
                let start = relative_index(argument(0).to_number(), items.len());
                let end = match argument(1) {
                    Value::Undefined => items.len(),
                    end => relative_index(end.to_number(), items.len()),
                };
                Value::list(items.get(start..end.max(start)).unwrap_or_default().to_vec())
            }
            "concat" => {
                let mut items = target.items();
                for argument in arguments {
                    match argument.iterate() {
                        Some(more) if argument.container().is_some() => items.extend(more),
                        _ => items.push(argument.clone()),
                    }
                }
                Value::list(items)
            }
            "map" | "filter" | "find" | "findIndex" | "some" | "every" | "forEach" => {
                let function = callback()?;
                let items = target.items();
                let mut mapped = Vec::new();
                for (index, item) in items.into_iter().enumerate() {
                    let result =
                        call_function(&function, vec![item.clone(), Value::from(index)])?;
                    match name {
                        "map" => mapped.push(result),
                        "filter" if result.is_truthy() => mapped.push(item),
                        "find" if result.is_truthy() => return Ok(Some(item)),
                        "findIndex" if result.is_truthy() => return Ok(Some(Value::from(index))),
                        "some" if result.is_truthy() => return Ok(Some(Value::Bool(true))),
                        "every" if !result.is_truthy() => return Ok(Some(Value::Bool(false))),
                        _ => {}
                    }
                }
                match name {
                    "map" | "filter" => Value::list(mapped),
                    "find" => Value::Undefined,
                    "findIndex" => Value::Number(-1.0),
                    "some" => Value::Bool(false),
                    "every" => Value::Bool(true),
                    _ => Value::Undefined,
                }
            }
            "reduce" => {
                let function = callback()?;
                let mut items = target.items().into_iter().enumerate();
                let mut accumulator = match arguments.get(1) {
                    Some(initial) => initial.clone(),
                    None => match items.next() {
                        Some((_, first)) => first,
                        None => return Err(fail("reduce of empty list with no initial value")),
                    },
                };
                for (index, item) in items {
                    accumulator =
                        call_function(&function, vec![accumulator, item, Value::from(index)])?;
                }
                accumulator
            }
            _ => return Ok(None),
        }))
    }
}

/// A list receiver: observed lists notify their root on mutation.
enum ListTarget {
    Observed(State),
    Plain(ListRef),
}

impl ListTarget {
    fn value(&self) -> Value {
        match self {
            Self::Observed(state) => Value::State(state.clone()),
            Self::Plain(list) => Value::List(list.clone()),
        }
    }

    fn items(&self) -> Vec<Value> {
        match self {
            Self::Observed(state) => state.items(),
            Self::Plain(list) => list.borrow().clone(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Observed(state) => state.len(),
            Self::Plain(list) => list.borrow().len(),
        }
    }

    fn push(&self, values: Vec<Value>) -> Result<usize> {
        match self {
            Self::Observed(state) => state.push(values),
            Self::Plain(list) => {
                let mut list = list.borrow_mut();
                list.extend(values);
                Ok(list.len())
            }
        }
    }

    fn pop(&self) -> Result<Value> {
        match self {
            Self::Observed(state) => state.pop(),
            Self::Plain(list) => Ok(list.borrow_mut().pop().unwrap_or_default()),
        }
    }

    fn splice(&self, start: usize, count: usize, inserted: Vec<Value>) -> Result<Vec<Value>> {
        match self {
            Self::Observed(state) => state.splice(start, count, inserted),
            Self::Plain(list) => {
                let mut list = list.borrow_mut();
                let start = start.min(list.len());
                let end = (start + count).min(list.len());
                Ok(list.splice(start..end, inserted).collect())
            }
        }
    }
}

fn text_method(text: &str, name: &str, arguments: &[Value]) -> Result<Option<Value>> {
    let argument = |index: usize| arguments.get(index).cloned().unwrap_or_default();
    let characters: Vec<char> = text.chars().collect();
    Ok(Some(match name {
        "toUpperCase" => Value::from(text.to_uppercase()),
        "toLowerCase" => Value::from(text.to_lowercase()),
        "trim" => Value::from(text.trim()),
        "includes" => Value::Bool(text.contains(&argument(0).to_string())),
        "startsWith" => Value::Bool(text.starts_with(&argument(0).to_string())),
        "endsWith" => Value::Bool(text.ends_with(&argument(0).to_string())),
        "indexOf" => {
            let needle = argument(0).to_string();
            text.find(&needle)
                .map_or(Value::Number(-1.0), |byte| Value::from(text[..byte].chars().count()))
        }
        "split" => match argument(0) {
            Value::Undefined => Value::list([Value::from(text)]),
            separator => {
                let separator = separator.to_string();
                if separator.is_empty() {
                    Value::list(characters.iter().map(|character| Value::from(character.to_string())))
                } else {
                    Value::list(text.split(separator.as_str()).map(Value::from))
                }
            }
        },
        "slice" | "substring" => {
            let start = relative_index(argument(0).to_number(), characters.len());
            let end = match argument(1) {
                Value::Undefined => characters.len(),
                end => relative_index(end.to_number(), characters.len()),
            };
            Value::from(characters[start..end.max(start)].iter().collect::<String>())
        }
        "replace" => Value::from(text.replacen(&argument(0).to_string(), &argument(1).to_string(), 1)),
        "replaceAll" => Value::from(text.replace(&argument(0).to_string(), &argument(1).to_string())),
        "repeat" => {
            let count = argument(0).to_number();
            let count = if count.is_nan() { 0.0 } else { count.trunc() };
            match bounded_count(count) {
                Some(count) if text.len().saturating_mul(count) <= MAX_LENGTH => {
                    Value::from(text.repeat(count))
                }
                _ => return Err(fail(format!("invalid count value: {}", format_number(count)))),
            }
        }
        "charAt" => Value::from(
            characters
                .get(argument(0).to_number().max(0.0) as usize)
                .map(|character| character.to_string())
                .unwrap_or_default(),
        ),
        "padStart" | "padEnd" => {
            let Some(width) = bounded_count(argument(0).to_number().max(0.0).trunc()) else {
                return Err(fail("invalid string length"));
            };
            let fill = match argument(1) {
                Value::Undefined => " ".to_owned(),
                fill => fill.to_string(),
            };
            let missing = width.saturating_sub(characters.len());
            let padding: String = fill.chars().cycle().take(if fill.is_empty() { 0 } else { missing }).collect();
            if name == "padStart" {
                Value::from(format!("{padding}{text}"))
            } else {
                Value::from(format!("{text}{padding}"))
            }
        }
        _ => return Ok(None),
    }))
}

fn number_method(number: f64, name: &str, arguments: &[Value]) -> Option<Value> {
    match name {
        "toFixed" => {
            let digits = arguments.first().map_or(0.0, Value::to_number).clamp(0.0, 100.0) as usize;
            Some(Value::from(format!("{number:.digits$}")))
        }
        "toString" => Some(Value::from(format_number(number))),
        _ => None,
    }
}

fn binary(operator: BinaryOperator, operand_a: &Value, operand_b: &Value) -> Value {
    match operator {
        BinaryOperator::Add => {
            let concatenates = |value: &Value| {
                matches!(value, Value::Text(_)) || value.container().is_some()
            };
            if concatenates(operand_a) || concatenates(operand_b) {
                Value::from(format!("{operand_a}{operand_b}"))
            } else {
                Value::Number(operand_a.to_number() + operand_b.to_number())
            }
        }
        BinaryOperator::Subtract => Value::Number(operand_a.to_number() - operand_b.to_number()),
        BinaryOperator::Multiply => Value::Number(operand_a.to_number() * operand_b.to_number()),
        BinaryOperator::Divide => Value::Number(operand_a.to_number() / operand_b.to_number()),
        BinaryOperator::Remainder => Value::Number(operand_a.to_number() % operand_b.to_number()),
        BinaryOperator::Less
        | BinaryOperator::LessOrEqual
        | BinaryOperator::Greater
        | BinaryOperator::GreaterOrEqual => {
            let ordering = match (operand_a, operand_b) {
                (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
                _ => operand_a.to_number().partial_cmp(&operand_b.to_number()),
            };
            Value::Bool(ordering.is_some_and(|ordering| match operator {
                BinaryOperator::Less => ordering.is_lt(),
                BinaryOperator::LessOrEqual => ordering.is_le(),
                BinaryOperator::Greater => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOperator::StrictEqual => Value::Bool(operand_a.strict_eq(operand_b)),
        BinaryOperator::StrictNotEqual => Value::Bool(!operand_a.strict_eq(operand_b)),
        BinaryOperator::Equal => Value::Bool(operand_a.loose_eq(operand_b)),
        BinaryOperator::NotEqual => Value::Bool(!operand_a.loose_eq(operand_b)),
    }
}

fn property_key(key: &Value) -> String {
    match key {
        Value::Number(number) => format_number(*number),
        other => other.to_string(),
    }
}

/// Negative positions count from the end, as in `slice(-2)`.
fn relative_index(position: f64, length: usize) -> usize {
    if position.is_nan() {
        0
    } else if position < 0.0 {
        length.saturating_sub((-position) as usize)
    } else {
        (position as usize).min(length)
    }
}

fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
        _ => a.strict_eq(b),
    }
}
