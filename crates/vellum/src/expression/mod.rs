//! The expression language used by directives and `${...}` interpolation.
//!
//! Code is lexed and parsed with chumsky in two phases, the same way for
//! attribute values, event handlers and component scripts. A compiled
//! [`Code`] is an owned syntax tree that can be evaluated many times against
//! an [`Env`].

use chumsky::prelude::*;
use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;

mod lexer;
pub use lexer::{Token, lexer};

mod parser;
pub use parser::{
    AssignOperator, BinaryOperator, Expr, Literal, LogicalOperator, Statement, UnaryOperator,
    UpdateOperator, parser,
};

mod template;
pub use template::{Template, TemplatePart};

mod evaluator;
pub use evaluator::Arrow;
pub(crate) use evaluator::call_function;

mod ambient;
pub use ambient::Ambient;

use crate::diagnostics::{self, SyntaxError};
use crate::error::{Error, Result};
use crate::state::State;
use crate::value::Value;

pub type Span = SimpleSpan;
pub type ParseError<'code, T> = Rich<'code, T, Span>;

#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

/// Compiled statements, ready to be evaluated repeatedly.
#[derive(Clone)]
pub struct Code {
    source: Rc<str>,
    statements: Rc<[Spanned<Statement>]>,
}

impl Code {
    pub fn compile(source: &str) -> Result<Self> {
        let (tokens, lexer_errors) = lexer().parse(source).into_output_errors();
        let mut errors = lexer_errors
            .into_iter()
            .map(SyntaxError::from_rich)
            .collect::<Vec<_>>();

        let mut statements = None;
        if let Some(tokens) = tokens {
            let input = tokens.map(Span::from(source.len()..source.len()), |Spanned { node, span }| {
                (node, span)
            });
            let (output, parser_errors) = parser().parse(input).into_output_errors();
            errors.extend(parser_errors.into_iter().map(SyntaxError::from_rich));
            statements = output;
        }

        match statements {
            Some(statements) if errors.is_empty() => Ok(Self {
                source: source.into(),
                statements: statements.into(),
            }),
            _ => Err(Error::evaluation(
                source,
                diagnostics::render_report(source, &errors),
            )),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn statements(&self) -> &[Spanned<Statement>] {
        &self.statements
    }

    /// Run the statements and return the value of the last one, or of the
    /// first `return`.
    pub fn evaluate(&self, env: &Rc<Env>) -> Result<Value> {
        evaluator::run(env, &self.statements).map_err(|error| error.with_source(&self.source))
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Code").field(&self.source).finish()
    }
}

/// What a piece of code sees besides its own locals: the state scope it runs
/// against, `this`, and extra named parameters such as `event`.
pub struct Env {
    pub(crate) scope: State,
    pub(crate) this: Value,
    pub(crate) parameters: SmallVec<[(String, Value); 2]>,
}

impl Env {
    pub fn new(scope: &State) -> Self {
        Self {
            scope: scope.clone(),
            this: Value::Null,
            parameters: SmallVec::new(),
        }
    }

    pub fn with_this(mut self, this: Value) -> Self {
        self.this = this;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.push((name.into(), value));
        self
    }

    pub fn scope(&self) -> &State {
        &self.scope
    }
}
