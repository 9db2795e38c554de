//! `LayerHelper`: the graph-building surface used by layer functions.
//!
//! A layer function creates one helper, asks it for variables and hands it
//! the op nodes to append. Names handed out by a helper share a prefix
//! allocated once per helper, e.g. `auc_2.tmp_0`, `auc_2.global_1`.

use crate::asg::{AsgResult, Attribute, DType, OpNode, Shape, VarDesc};
use crate::initializer::Initializer;
use crate::tensor::{GraphContext, Variable};
use log::debug;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Description of an op to append, built slot by slot.
#[derive(Debug, Clone)]
pub struct OpSpec {
    node: OpNode,
}

impl OpSpec {
    pub fn new(op_type: &str) -> Self {
        Self { node: OpNode::new(op_type) }
    }

    pub fn input(mut self, slot: &str, vars: &[&Variable]) -> Self {
        self.node
            .inputs
            .insert(slot.to_string(), vars.iter().map(|v| v.name().to_string()).collect());
        self
    }

    pub fn output(mut self, slot: &str, vars: &[&Variable]) -> Self {
        self.node
            .outputs
            .insert(slot.to_string(), vars.iter().map(|v| v.name().to_string()).collect());
        self
    }

    pub fn attr(mut self, name: &str, value: impl Into<Attribute>) -> Self {
        self.node.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn into_node(self) -> OpNode {
        self.node
    }
}

pub struct LayerHelper {
    prefix: String,
    context: Rc<RefCell<GraphContext>>,
    tmp_counter: Cell<usize>,
    global_counter: Cell<usize>,
}

impl LayerHelper {
    pub fn new(context: &Rc<RefCell<GraphContext>>, layer_type: &str) -> Self {
        let prefix = context.borrow_mut().generate_name(layer_type);
        Self {
            prefix,
            context: Rc::clone(context),
            tmp_counter: Cell::new(0),
            global_counter: Cell::new(0),
        }
    }

    /// Unique prefix of every name this helper creates.
    pub fn name(&self) -> &str {
        &self.prefix
    }

    /// Fresh intermediate variable. Its shape is left to the op that writes it.
    pub fn create_tmp_variable(&self, dtype: DType) -> AsgResult<Variable> {
        let name = format!("{}.tmp_{}", self.prefix, bump(&self.tmp_counter));
        Variable::declare(&self.context, VarDesc { name, dtype, shape: None, persistable: false })
    }

    /// Fresh variable meant to live across executions when `persistable`.
    pub fn create_global_variable(
        &self,
        persistable: bool,
        dtype: DType,
        shape: Option<Shape>,
    ) -> AsgResult<Variable> {
        let name = format!("{}.global_{}", self.prefix, bump(&self.global_counter));
        Variable::declare(&self.context, VarDesc { name, dtype, shape, persistable })
    }

    /// Registers the startup op that initializes `var`.
    pub fn set_variable_initializer(&self, var: &Variable, initializer: Initializer) -> AsgResult<()> {
        let mut ctx = self.context.borrow_mut();
        let desc = ctx.main_graph().var(var.name())?.clone();
        initializer.append_to_startup(&mut ctx, &desc)
    }

    /// Appends the op to the main graph. Fails only when the op refers to an
    /// undeclared variable or binds an empty slot.
    pub fn append_op(&self, spec: OpSpec) -> AsgResult<usize> {
        let node = spec.into_node();
        let op_type = node.op_type.clone();
        let index = self.context.borrow_mut().main_graph_mut().append_op(node)?;
        debug!("{}: appended op #{} '{}'", self.prefix, index, op_type);
        Ok(index)
    }
}

fn bump(counter: &Cell<usize>) -> usize {
    let n = counter.get();
    counter.set(n + 1);
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_share_the_helper_prefix() {
        let ctx = GraphContext::shared();
        let first = LayerHelper::new(&ctx, "fc");
        let second = LayerHelper::new(&ctx, "fc");
        assert_eq!(first.name(), "fc_0");
        assert_eq!(second.name(), "fc_1");

        let a = first.create_tmp_variable(DType::F32).unwrap();
        let b = first.create_tmp_variable(DType::I64).unwrap();
        let g = second.create_global_variable(true, DType::I64, Some(vec![4])).unwrap();
        assert_eq!(a.name(), "fc_0.tmp_0");
        assert_eq!(b.name(), "fc_0.tmp_1");
        assert_eq!(g.name(), "fc_1.global_0");
        assert!(g.persistable());
        assert!(!a.persistable());
    }

    #[test]
    fn initializer_lands_in_startup_graph() {
        let ctx = GraphContext::shared();
        let helper = LayerHelper::new(&ctx, "counter");
        let var = helper.create_global_variable(true, DType::I64, Some(vec![3])).unwrap();
        helper
            .set_variable_initializer(&var, Initializer::Constant { value: 0.0, force_cpu: true })
            .unwrap();

        let ctx = ctx.borrow();
        assert!(ctx.main_graph().ops.is_empty());
        let startup = ctx.startup_graph();
        assert!(startup.var(var.name()).unwrap().persistable);
        let op = &startup.ops[0];
        assert_eq!(op.op_type, "fill_constant");
        assert_eq!(op.output("Out"), [var.name().to_string()]);
        assert_eq!(op.attr("shape"), Some(&Attribute::Ints(vec![3])));
        assert_eq!(op.attr("dtype"), Some(&Attribute::Str("int64".into())));
        assert_eq!(op.attr("force_cpu"), Some(&Attribute::Bool(true)));
    }

    #[test]
    fn append_op_reports_undeclared_variables() {
        let ctx = GraphContext::shared();
        let helper = LayerHelper::new(&ctx, "relu");
        let x = helper.create_tmp_variable(DType::F32).unwrap();
        let other_ctx = GraphContext::shared();
        let stray = LayerHelper::new(&other_ctx, "stray").create_tmp_variable(DType::F32).unwrap();

        let spec = OpSpec::new("relu").input("X", &[&x]).output("Out", &[&stray]);
        assert!(helper.append_op(spec).is_err());
    }
}
