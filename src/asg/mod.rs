//! ASG: the graph IR that metric layers append to.
//!
//! A graph is a set of declared variables plus an ordered list of op nodes.
//! Op nodes refer to variables by name through named slots (`"Label"`,
//! `"TPOut"`, ...), so one variable can be bound as both input and output of
//! the same op. The executor runs ops in the order they were appended.

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Graph identifier.
pub type AsgId = usize;
/// Tensor shape.
pub type Shape = Vec<usize>;

pub type AsgResult<T> = std::result::Result<T, AsgError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AsgError {
    #[error("Variable '{0}' is not declared in graph {1}")]
    VariableNotFound(String, AsgId),
    #[error("Variable '{0}' is already declared in graph {1}")]
    DuplicateVariable(String, AsgId),
    #[error("Op '{op}' binds slot '{slot}' to an empty variable list")]
    EmptySlot { op: String, slot: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    F32,
    F64,
    I32,
    I64,
    Bool,
}

impl DType {
    pub fn name(&self) -> &'static str {
        match self {
            DType::F32 => "float32",
            DType::F64 => "float64",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::Bool => "bool",
        }
    }

    /// Parses the names produced by [`DType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "float32" => Some(DType::F32),
            "float64" => Some(DType::F64),
            "int32" => Some(DType::I32),
            "int64" => Some(DType::I64),
            "bool" => Some(DType::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declaration of a variable in a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDesc {
    pub name: String,
    pub dtype: DType,
    /// `None` until the shape is fed or inferred.
    pub shape: Option<Shape>,
    /// Persistable variables outlive a single execution of the graph.
    pub persistable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    Int(i64),
    Float(f32),
    Bool(bool),
    Str(String),
    Ints(Vec<i64>),
}

impl Attribute {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Attribute::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Attribute::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Attribute::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Attribute::Ints(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for Attribute {
    fn from(v: i64) -> Self {
        Attribute::Int(v)
    }
}

impl From<usize> for Attribute {
    fn from(v: usize) -> Self {
        Attribute::Int(v as i64)
    }
}

impl From<f32> for Attribute {
    fn from(v: f32) -> Self {
        Attribute::Float(v)
    }
}

impl From<bool> for Attribute {
    fn from(v: bool) -> Self {
        Attribute::Bool(v)
    }
}

impl From<&str> for Attribute {
    fn from(v: &str) -> Self {
        Attribute::Str(v.to_string())
    }
}

impl From<String> for Attribute {
    fn from(v: String) -> Self {
        Attribute::Str(v)
    }
}

impl From<Vec<i64>> for Attribute {
    fn from(v: Vec<i64>) -> Self {
        Attribute::Ints(v)
    }
}

/// Slot name -> bound variable names.
pub type SlotMap = BTreeMap<String, Vec<String>>;

/// An operator node. It is never executed by the graph itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpNode {
    pub op_type: String,
    pub inputs: SlotMap,
    pub outputs: SlotMap,
    pub attrs: BTreeMap<String, Attribute>,
}

impl OpNode {
    pub fn new(op_type: &str) -> Self {
        Self {
            op_type: op_type.to_string(),
            inputs: SlotMap::new(),
            outputs: SlotMap::new(),
            attrs: BTreeMap::new(),
        }
    }

    /// Names bound to an input slot (empty when the slot is absent).
    pub fn input(&self, slot: &str) -> &[String] {
        self.inputs.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names bound to an output slot (empty when the slot is absent).
    pub fn output(&self, slot: &str) -> &[String] {
        self.outputs.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.get(name)
    }

    /// Every variable name referenced by the op, inputs first.
    pub fn referenced_vars(&self) -> impl Iterator<Item = &String> {
        self.inputs
            .values()
            .chain(self.outputs.values())
            .flat_map(|names| names.iter())
    }
}

/// Runtime tensor value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
}

impl Value {
    pub fn dtype(&self) -> DType {
        match self {
            Value::F32(_) => DType::F32,
            Value::F64(_) => DType::F64,
            Value::I32(_) => DType::I32,
            Value::I64(_) => DType::I64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Value::F32(a) => a.shape(),
            Value::F64(a) => a.shape(),
            Value::I32(a) => a.shape(),
            Value::I64(a) => a.shape(),
        }
    }

    /// First element widened to `f64`, convenient for scalar outputs.
    pub fn scalar(&self) -> Option<f64> {
        match self {
            Value::F32(a) => a.iter().next().map(|v| *v as f64),
            Value::F64(a) => a.iter().next().copied(),
            Value::I32(a) => a.iter().next().map(|v| *v as f64),
            Value::I64(a) => a.iter().next().map(|v| *v as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asg {
    pub id: AsgId,
    pub name: Option<String>,
    pub vars: BTreeMap<String, VarDesc>,
    pub ops: Vec<OpNode>,
}

impl Asg {
    pub fn new(id: AsgId, name: Option<String>) -> Self {
        Self { id, name, vars: BTreeMap::new(), ops: Vec::new() }
    }

    pub fn add_var(&mut self, var: VarDesc) -> AsgResult<()> {
        if self.vars.contains_key(&var.name) {
            return Err(AsgError::DuplicateVariable(var.name, self.id));
        }
        self.vars.insert(var.name.clone(), var);
        Ok(())
    }

    pub fn has_var(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn var(&self, name: &str) -> AsgResult<&VarDesc> {
        self.vars
            .get(name)
            .ok_or_else(|| AsgError::VariableNotFound(name.to_string(), self.id))
    }

    pub fn var_mut(&mut self, name: &str) -> AsgResult<&mut VarDesc> {
        let id = self.id;
        self.vars
            .get_mut(name)
            .ok_or_else(|| AsgError::VariableNotFound(name.to_string(), id))
    }

    /// Appends an op after checking that every slot is non-empty and every
    /// referenced variable is declared. Returns the op index.
    pub fn append_op(&mut self, op: OpNode) -> AsgResult<usize> {
        for (slot, names) in op.inputs.iter().chain(op.outputs.iter()) {
            if names.is_empty() {
                return Err(AsgError::EmptySlot { op: op.op_type.clone(), slot: slot.clone() });
            }
        }
        if let Some(missing) = op.referenced_vars().find(|name| !self.has_var(name)) {
            return Err(AsgError::VariableNotFound(missing.clone(), self.id));
        }
        self.ops.push(op);
        Ok(self.ops.len() - 1)
    }

    pub fn ops_of_type<'a>(&'a self, op_type: &'a str) -> impl Iterator<Item = &'a OpNode> + 'a {
        self.ops.iter().filter(move |op| op.op_type == op_type)
    }

    pub fn persistable_vars(&self) -> impl Iterator<Item = &VarDesc> {
        self.vars.values().filter(|v| v.persistable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> VarDesc {
        VarDesc { name: name.to_string(), dtype: DType::F32, shape: None, persistable: false }
    }

    #[test]
    fn duplicate_variable_is_rejected() {
        let mut g = Asg::new(0, None);
        g.add_var(var("x")).unwrap();
        assert_eq!(g.add_var(var("x")), Err(AsgError::DuplicateVariable("x".into(), 0)));
    }

    #[test]
    fn append_op_requires_declared_variables() {
        let mut g = Asg::new(3, None);
        g.add_var(var("x")).unwrap();
        let mut op = OpNode::new("relu");
        op.inputs.insert("X".into(), vec!["x".into()]);
        op.outputs.insert("Out".into(), vec!["y".into()]);
        assert_eq!(g.append_op(op.clone()), Err(AsgError::VariableNotFound("y".into(), 3)));
        assert!(g.ops.is_empty());

        g.add_var(var("y")).unwrap();
        assert_eq!(g.append_op(op), Ok(0));
    }

    #[test]
    fn empty_slot_is_rejected() {
        let mut g = Asg::new(0, None);
        let mut op = OpNode::new("noop");
        op.inputs.insert("X".into(), vec![]);
        assert!(matches!(g.append_op(op), Err(AsgError::EmptySlot { .. })));
    }

    #[test]
    fn dtype_names_round_trip() {
        for dt in [DType::F32, DType::F64, DType::I32, DType::I64, DType::Bool] {
            assert_eq!(DType::from_name(dt.name()), Some(dt));
        }
        assert_eq!(DType::from_name("complex64"), None);
    }
}
