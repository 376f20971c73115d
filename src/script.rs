//! Script engine boundary
//!
//! The core does not parse or run the scripting language itself. A host
//! supplies an implementation of [`ScriptEngine`] (an embedded
//! interpreter binding, a test double, anything that can hold globals
//! and call them) and the core hands it normalized source plus a
//! [`Chipset`] to dispatch builtins against.

use thiserror::Error;

use crate::emulator::Chipset;

/// A dynamically typed value crossing the script boundary
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    Str(String),
}

impl Value {
    /// Numeric coercion: booleans count as 0/1, strings parse if they can
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Nil => None,
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => Some(*n),
            Value::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Numeric coercion truncated to an integer
    pub fn as_i32(&self) -> Option<i32> {
        self.as_number().map(|n| n as i32)
    }

    /// Scripting-language truthiness: only nil and false are falsy
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    /// Display form, as `print` would show it
    pub fn display(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Str(s) => s.clone(),
        }
    }
}

/// Script error types, as reported by the engine implementation
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The source failed to parse
    #[error("script syntax error: {0}")]
    Syntax(String),
    /// Execution failed at runtime
    #[error("script runtime error: {0}")]
    Runtime(String),
}

/// The interface a host scripting engine implements.
///
/// Every entry point receives the chipset so builtin calls made during
/// execution can dispatch back into the core.
pub trait ScriptEngine {
    /// Parse and execute a chunk of source
    fn run(&mut self, chipset: &mut Chipset, source: &str) -> Result<(), ScriptError>;

    /// Call a named global function with positional arguments
    fn call(
        &mut self,
        chipset: &mut Chipset,
        name: &str,
        args: &[Value],
    ) -> Result<Vec<Value>, ScriptError>;

    /// Whether a global with this name is defined
    fn has_global(&self, name: &str) -> bool;
}
