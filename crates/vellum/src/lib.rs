//! Reactive templating over a host document.
//!
//! A state value is bound to an element with [`Engine::bootstrap`]. Every
//! write to the state re-applies every binding registered while the subtree
//! was set up: `${...}` text, `:attribute` bindings, `v-if` chains, `v-for`
//! lists, `v-model` controls and mounted components.

pub mod component;
pub mod config;
pub mod diagnostics;
pub mod directives;
pub mod document;
pub mod dom;
pub mod error;
pub mod expression;
mod registry;
mod setup;
pub mod state;
pub mod value;

pub use component::{Component, ComponentSource, Components};
pub use config::Config;
pub use directives::{Directive, DirectiveContext, DirectiveTable, FunctionDirective, MOUNT_HOOK};
pub use document::{Document, DocumentRef, Event, Listener, NodeId, NodeKind, dispatch};
pub use dom::MemoryDocument;
pub use error::{Error, Result};
pub use expression::{Ambient, Code, Env, Template};
pub use setup::Engine;
pub use state::{State, WeakState};
pub use value::{Container, Function, Value};
