//! Interface shared by execution backends, plus the `Scope` they work on.

use crate::asg::{Asg, Attribute, OpNode, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while executing a graph. Every check the layer functions
/// skip at construction time surfaces here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Variable '{0}' has no value in the scope. Feed it or run the startup graph first.")]
    MissingVariable(String),

    #[error("Fed variable '{0}' is not declared in graph {1}")]
    UnknownFeed(String, usize),

    #[error("Op '{op}' has no variable bound to slot '{slot}'")]
    MissingSlot { op: String, slot: String },

    #[error("Op '{op}' is missing attribute '{attr}'")]
    MissingAttribute { op: String, attr: String },

    #[error("Op '{op}' has an invalid attribute '{attr}': {reason}")]
    InvalidAttribute { op: String, attr: String, reason: String },

    #[error("Type mismatch: operation expected {expected}, got {actual}")]
    TypeError { expected: String, actual: String },

    #[error("Tensor shape error: {0}")]
    ShapeError(String),

    #[error("Operation '{0}' is not implemented by this backend")]
    UnimplementedOperation(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Name -> value store the backends read and write.
///
/// A scope outlives single executions: values of persistable variables
/// stay in it between runs.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    values: HashMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// View of one op and the scope while its kernel runs.
pub struct OpContext<'a> {
    pub op: &'a OpNode,
    pub scope: &'a mut Scope,
}

impl<'a> OpContext<'a> {
    pub fn new(op: &'a OpNode, scope: &'a mut Scope) -> Self {
        Self { op, scope }
    }

    fn slot_var(&self, names: &'a [String], slot: &str) -> RuntimeResult<&'a str> {
        names.first().map(String::as_str).ok_or_else(|| RuntimeError::MissingSlot {
            op: self.op.op_type.clone(),
            slot: slot.to_string(),
        })
    }

    /// Value of the first variable bound to input `slot`.
    pub fn input(&self, slot: &str) -> RuntimeResult<&Value> {
        let name = self.slot_var(self.op.input(slot), slot)?;
        self.scope
            .get(name)
            .ok_or_else(|| RuntimeError::MissingVariable(name.to_string()))
    }

    pub fn set_output(&mut self, slot: &str, value: Value) -> RuntimeResult<()> {
        let name = self.slot_var(self.op.output(slot), slot)?;
        self.scope.set(name, value);
        Ok(())
    }

    pub fn attr(&self, name: &str) -> RuntimeResult<&'a Attribute> {
        self.op.attr(name).ok_or_else(|| RuntimeError::MissingAttribute {
            op: self.op.op_type.clone(),
            attr: name.to_string(),
        })
    }

    pub fn attr_int(&self, name: &str) -> RuntimeResult<i64> {
        self.attr(name)?
            .as_int()
            .ok_or_else(|| self.invalid_attr(name, "expected an integer"))
    }

    pub fn attr_str(&self, name: &str) -> RuntimeResult<&'a str> {
        self.attr(name)?
            .as_str()
            .ok_or_else(|| self.invalid_attr(name, "expected a string"))
    }

    pub fn invalid_attr(&self, name: &str, reason: impl Into<String>) -> RuntimeError {
        RuntimeError::InvalidAttribute {
            op: self.op.op_type.clone(),
            attr: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// An execution backend runs the ops of a graph in order against a scope.
pub trait Backend {
    fn run(&self, graph: &Asg, scope: &mut Scope) -> RuntimeResult<()>;

    /// Whether the backend has a kernel for `op_type`.
    fn supports(&self, op_type: &str) -> bool;
}
