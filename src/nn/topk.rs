//! Top-k selection layer.

use crate::asg::{AsgResult, DType};
use crate::layer_helper::{LayerHelper, OpSpec};
use crate::tensor::Variable;

/// Appends a `top_k` op over the last axis of `input`.
///
/// Returns `(values, indices)`: values keep the dtype of `input`, indices are
/// `int64`. `k` larger than the class axis is reported by the kernel.
pub fn topk(input: &Variable, k: usize) -> AsgResult<(Variable, Variable)> {
    let helper = LayerHelper::new(&input.context, "top_k");
    let values = helper.create_tmp_variable(input.dtype())?;
    let indices = helper.create_tmp_variable(DType::I64)?;
    helper.append_op(
        OpSpec::new("top_k")
            .input("X", &[input])
            .output("Out", &[&values])
            .output("Indices", &[&indices])
            .attr("k", k),
    )?;
    Ok((values, indices))
}
