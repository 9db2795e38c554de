//! CPU backend: runs graph ops sequentially with `ndarray` kernels.

use super::backend::{Backend, OpContext, RuntimeError, RuntimeResult, Scope};
use super::metric_kernels::{op_accuracy, op_auc};
use crate::asg::{Asg, DType, Value};
use log::trace;
use ndarray::{ArrayD, IxDyn};
use std::cmp::Ordering;

const SUPPORTED_OPS: &[&str] = &["fill_constant", "top_k", "accuracy", "auc"];

#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for CpuBackend {
    fn run(&self, graph: &Asg, scope: &mut Scope) -> RuntimeResult<()> {
        for (index, op) in graph.ops.iter().enumerate() {
            trace!("graph {}: running op #{} '{}'", graph.id, index, op.op_type);
            let mut ctx = OpContext::new(op, scope);
            match op.op_type.as_str() {
                "fill_constant" => op_fill_constant(&mut ctx)?,
                "top_k" => op_top_k(&mut ctx)?,
                "accuracy" => op_accuracy(&mut ctx)?,
                "auc" => op_auc(&mut ctx)?,
                other => return Err(RuntimeError::UnimplementedOperation(other.to_string())),
            }
        }
        Ok(())
    }

    fn supports(&self, op_type: &str) -> bool {
        SUPPORTED_OPS.contains(&op_type)
    }
}

// --- Kernels ---

fn op_fill_constant(ctx: &mut OpContext<'_>) -> RuntimeResult<()> {
    let dims = ctx
        .attr("shape")?
        .as_ints()
        .ok_or_else(|| ctx.invalid_attr("shape", "expected a list of integers"))?;
    if dims.iter().any(|&d| d < 0) {
        return Err(ctx.invalid_attr("shape", format!("negative dimension in {:?}", dims)));
    }
    let shape: Vec<usize> = dims.iter().map(|&d| d as usize).collect();

    let dtype_name = ctx.attr_str("dtype")?;
    let dtype = DType::from_name(dtype_name)
        .ok_or_else(|| ctx.invalid_attr("dtype", format!("unknown dtype '{}'", dtype_name)))?;
    let value = ctx
        .attr("value")?
        .as_float()
        .ok_or_else(|| ctx.invalid_attr("value", "expected a float"))?;

    let shape = IxDyn(&shape);
    let out = match dtype {
        DType::F32 => Value::F32(ArrayD::from_elem(shape, value)),
        DType::F64 => Value::F64(ArrayD::from_elem(shape, value as f64)),
        DType::I32 => Value::I32(ArrayD::from_elem(shape, value as i32)),
        DType::I64 => Value::I64(ArrayD::from_elem(shape, value as i64)),
        DType::Bool => {
            return Err(RuntimeError::TypeError {
                expected: "a numeric dtype".to_string(),
                actual: dtype.to_string(),
            })
        }
    };
    ctx.set_output("Out", out)
}

fn op_top_k(ctx: &mut OpContext<'_>) -> RuntimeResult<()> {
    let k = ctx.attr_int("k")?;
    if k < 1 {
        return Err(ctx.invalid_attr("k", format!("k must be positive, got {}", k)));
    }
    let k = k as usize;

    let (values, indices) = match ctx.input("X")? {
        Value::F32(x) => {
            let (v, i) = top_k_last_axis(x, k)?;
            (Value::F32(v), i)
        }
        Value::F64(x) => {
            let (v, i) = top_k_last_axis(x, k)?;
            (Value::F64(v), i)
        }
        other => {
            return Err(RuntimeError::TypeError {
                expected: "float32 or float64".to_string(),
                actual: other.dtype().to_string(),
            })
        }
    };
    ctx.set_output("Out", values)?;
    ctx.set_output("Indices", Value::I64(indices))
}

/// Descending order with NaN ranked below every number.
fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Top-k along the last axis. Ties keep the lower index first; NaN scores
/// rank last.
pub(crate) fn top_k_last_axis<T>(x: &ArrayD<T>, k: usize) -> RuntimeResult<(ArrayD<T>, ArrayD<i64>)>
where
    T: Copy + Into<f64>,
{
    let width = match x.shape().last() {
        Some(&w) => w,
        None => return Err(RuntimeError::ShapeError("top_k needs an input of rank >= 1".to_string())),
    };
    if k > width {
        return Err(RuntimeError::ShapeError(format!(
            "top_k: k = {} exceeds the last dimension {} of {:?}",
            k,
            width,
            x.shape()
        )));
    }

    let flat: Vec<T> = x.iter().copied().collect();
    let rows = if width == 0 { 0 } else { flat.len() / width };
    let mut values = Vec::with_capacity(rows * k);
    let mut indices = Vec::with_capacity(rows * k);
    for row in flat.chunks(width.max(1)).take(rows) {
        let mut order: Vec<usize> = (0..width).collect();
        order.sort_by(|&a, &b| descending_nan_last(row[a].into(), row[b].into()));
        for &c in order.iter().take(k) {
            values.push(row[c]);
            indices.push(c as i64);
        }
    }

    let mut out_shape = x.shape().to_vec();
    if let Some(last) = out_shape.last_mut() {
        *last = k;
    }
    let shape_err = |e: ndarray::ShapeError| RuntimeError::ShapeError(e.to_string());
    let values = ArrayD::from_shape_vec(IxDyn(&out_shape), values).map_err(shape_err)?;
    let indices = ArrayD::from_shape_vec(IxDyn(&out_shape), indices).map_err(shape_err)?;
    Ok((values, indices))
}
