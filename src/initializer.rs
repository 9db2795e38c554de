//! Variable initializers.
//!
//! An initializer does not produce data either: applying it mirrors the
//! variable into the startup graph and appends the op that fills it there.
//! Running the startup graph once sets every initialized variable.

use crate::asg::{AsgResult, OpNode, VarDesc};
use crate::tensor::GraphContext;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Initializer {
    /// Every element is `value`. `force_cpu` keeps the variable in host memory.
    Constant { value: f32, force_cpu: bool },
}

impl Initializer {
    pub fn constant(value: f32) -> Self {
        Initializer::Constant { value, force_cpu: false }
    }

    pub fn zeros() -> Self {
        Self::constant(0.0)
    }

    /// Appends the initializing op for `var` to the startup graph of `ctx`.
    pub(crate) fn append_to_startup(&self, ctx: &mut GraphContext, var: &VarDesc) -> AsgResult<()> {
        let startup = ctx.startup_graph_mut();
        if !startup.has_var(&var.name) {
            startup.add_var(var.clone())?;
        }

        match *self {
            Initializer::Constant { value, force_cpu } => {
                let shape: Vec<i64> = var
                    .shape
                    .as_deref()
                    .unwrap_or(&[1])
                    .iter()
                    .map(|&d| d as i64)
                    .collect();
                let mut op = OpNode::new("fill_constant");
                op.outputs.insert("Out".to_string(), vec![var.name.clone()]);
                op.attrs.insert("shape".to_string(), shape.into());
                op.attrs.insert("dtype".to_string(), var.dtype.name().into());
                op.attrs.insert("value".to_string(), value.into());
                op.attrs.insert("force_cpu".to_string(), force_cpu.into());
                startup.append_op(op)?;
                debug!("startup: fill_constant({}) -> {}", value, var.name);
            }
        }
        Ok(())
    }
}

impl Default for Initializer {
    fn default() -> Self {
        Self::zeros()
    }
}
