//! The native query engine: an AST callers (or an external parser) build
//! directly, a synchronous pattern/join/modifier evaluator, and the
//! planning helpers the virtual-graph engine reuses for pushdown and join
//! ordering.

pub mod ast;
pub mod exec;
pub mod join;
pub mod modifiers;
pub mod plan;

pub use ast::{Query, Var};
pub use exec::{execute, Binding, BindingValue, Solution};
