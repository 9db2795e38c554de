//! Graph inputs.

use crate::asg::{AsgResult, DType, Shape, VarDesc};
use crate::tensor::{GraphContext, Variable};
use std::cell::RefCell;
use std::rc::Rc;

/// Declares a feedable input variable named `name`.
///
/// The value is supplied through the executor's feed map on every run, so
/// the variable is never persistable.
pub fn data(
    context: &Rc<RefCell<GraphContext>>,
    name: &str,
    shape: Shape,
    dtype: DType,
) -> AsgResult<Variable> {
    Variable::declare(
        context,
        VarDesc { name: name.to_string(), dtype, shape: Some(shape), persistable: false },
    )
}
