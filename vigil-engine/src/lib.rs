//! Vigil Engine - Condition Expression VM
//!
//! A restricted JavaScript-like expression language used for objective
//! and trigger conditions: lexer, recursive-descent parser, bytecode
//! compiler and a small stack machine with native builtins. One machine
//! is built per compile/execute cycle; nothing is shared across
//! evaluations except the read-only object prototype.

mod builtins;
mod compiler;
mod import;
mod lexer;
mod machine;
mod ops;
mod parser;
mod value;

pub use import::{import, import_global, import_json};
pub use machine::Machine;
pub use parser::{parse, Expr, ParseError};
pub use value::{format_number, Array, Object, RuntimeError, Value, ValueKind};

use thiserror::Error;

/// Umbrella error for callers that do not care which stage failed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

/// Parse and compile a single expression into a ready-to-run machine.
pub fn compile(expression: &str) -> Result<Machine, ParseError> {
    let expr = parser::parse(expression)?;
    let mut machine = Machine::new();
    compiler::compile_into(&expr, &mut machine);
    Ok(machine)
}
