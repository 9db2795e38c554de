//! Shape inference for metric graphs.
//!
//! Walks the ops of a graph in append order and fills the shape of every
//! output variable that has none yet, checking input ranks along the way.
//! Layer functions never run this pass; it is an explicit early check.

use crate::asg::{Asg, AsgError, OpNode, Shape, SlotMap};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeInferenceError {
    #[error("Graph error: {0}")]
    AsgError(#[from] AsgError),

    #[error("Shape information missing for variable '{0}'. \
             Declare it with a shape or pass it in initial_shapes.")]
    MissingShapeInfo(String),

    #[error("Invalid tensor rank for '{var}' in op '{op}': expected {expected}D, got {actual}D.")]
    InvalidRank {
        op: String,
        var: String,
        expected: usize,
        actual: usize,
    },

    #[error("Incompatible shapes for operation '{op}': {shape1:?} and {shape2:?}.")]
    IncompatibleShapes {
        op: String,
        shape1: Shape,
        shape2: Shape,
    },

    #[error("Op '{op}' is missing slot or attribute '{name}'")]
    MissingField { op: String, name: String },

    #[error("Shape inference not implemented for operation: {0}")]
    UnimplementedOpType(String),
}

type Result<T> = std::result::Result<T, ShapeInferenceError>;

pub struct ShapeInference;

impl ShapeInference {
    /// Runs shape inference over `asg`.
    ///
    /// `initial_shapes` overrides the declared shapes of variables (typically
    /// the fed inputs) before the pass starts.
    pub fn run(asg: &mut Asg, initial_shapes: &HashMap<String, Shape>) -> Result<()> {
        for (name, shape) in initial_shapes {
            asg.var_mut(name)?.shape = Some(shape.clone());
        }

        for index in 0..asg.ops.len() {
            let op = asg.ops[index].clone();
            for (slot, shape) in Self::infer_op_shapes(asg, &op)? {
                let name = Self::slot(&op.outputs, &op, slot)?;
                let var = asg.var_mut(&name)?;
                if var.shape.is_none() {
                    var.shape = Some(shape);
                }
            }
        }
        Ok(())
    }

    /// Output shapes of one op, keyed by output slot.
    fn infer_op_shapes(asg: &Asg, op: &OpNode) -> Result<Vec<(&'static str, Shape)>> {
        match op.op_type.as_str() {
            "fill_constant" => {
                let dims = op
                    .attr("shape")
                    .and_then(|a| a.as_ints())
                    .ok_or_else(|| Self::missing(op, "shape"))?;
                Ok(vec![("Out", dims.iter().map(|&d| d.max(0) as usize).collect())])
            }

            "top_k" => {
                let mut shape = Self::input_shape(asg, op, "X")?;
                let k = op
                    .attr("k")
                    .and_then(|a| a.as_int())
                    .ok_or_else(|| Self::missing(op, "k"))?;
                match shape.last_mut() {
                    Some(last) => *last = k.max(0) as usize,
                    None => return Err(Self::rank_error(op, "X", 1, 0)),
                }
                Ok(vec![("Out", shape.clone()), ("Indices", shape)])
            }

            "accuracy" => {
                let indices = Self::input_shape(asg, op, "Indices")?;
                let label = Self::input_shape(asg, op, "Label")?;
                if indices.len() != 2 {
                    return Err(Self::rank_error(op, "Indices", 2, indices.len()));
                }
                if label.first() != indices.first() {
                    return Err(ShapeInferenceError::IncompatibleShapes {
                        op: op.op_type.clone(),
                        shape1: indices,
                        shape2: label,
                    });
                }
                Ok(vec![("Accuracy", vec![1]), ("Correct", vec![1]), ("Total", vec![1])])
            }

            "auc" => {
                let predict = Self::input_shape(asg, op, "Predict")?;
                let label = Self::input_shape(asg, op, "Label")?;
                if predict.is_empty() || predict.len() > 2 {
                    return Err(Self::rank_error(op, "Predict", 2, predict.len()));
                }
                if label.first() != predict.first() {
                    return Err(ShapeInferenceError::IncompatibleShapes {
                        op: op.op_type.clone(),
                        shape1: predict,
                        shape2: label,
                    });
                }
                let counters = Self::input_shape(asg, op, "TP")?;
                Ok(vec![
                    ("AUC", vec![1]),
                    ("TPOut", counters.clone()),
                    ("TNOut", counters.clone()),
                    ("FPOut", counters.clone()),
                    ("FNOut", counters),
                ])
            }

            other => Err(ShapeInferenceError::UnimplementedOpType(other.to_string())),
        }
    }

    fn slot(slots: &SlotMap, op: &OpNode, slot: &str) -> Result<String> {
        slots
            .get(slot)
            .and_then(|names| names.first())
            .cloned()
            .ok_or_else(|| Self::missing(op, slot))
    }

    fn input_shape(asg: &Asg, op: &OpNode, slot: &str) -> Result<Shape> {
        let name = Self::slot(&op.inputs, op, slot)?;
        asg.var(&name)?
            .shape
            .clone()
            .ok_or(ShapeInferenceError::MissingShapeInfo(name))
    }

    fn missing(op: &OpNode, name: &str) -> ShapeInferenceError {
        ShapeInferenceError::MissingField { op: op.op_type.clone(), name: name.to_string() }
    }

    fn rank_error(op: &OpNode, slot: &str, expected: usize, actual: usize) -> ShapeInferenceError {
        ShapeInferenceError::InvalidRank {
            op: op.op_type.clone(),
            var: op.input(slot).first().cloned().unwrap_or_default(),
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asg::DType;
    use crate::metrics::{accuracy, auc, AccuracyOptions, AucOptions};
    use crate::nn::data;
    use crate::tensor::GraphContext;

    #[test]
    fn fills_metric_output_shapes() {
        let ctx = GraphContext::shared();
        let x = data(&ctx, "x", vec![16, 10], DType::F32).unwrap();
        let y = data(&ctx, "y", vec![16, 1], DType::I64).unwrap();
        let acc = accuracy(&x, &y, AccuracyOptions::default().with_k(3)).unwrap();
        let roc = auc(&x, &y, AucOptions::default().with_num_thresholds(50)).unwrap();

        let mut graph = ctx.borrow().main_graph().clone();
        ShapeInference::run(&mut graph, &HashMap::new()).unwrap();

        let topk_out = &graph.ops[0].output("Out")[0];
        assert_eq!(graph.var(topk_out).unwrap().shape, Some(vec![16, 3]));
        assert_eq!(graph.var(acc.accuracy.name()).unwrap().shape, Some(vec![1]));
        assert_eq!(graph.var(roc.auc.name()).unwrap().shape, Some(vec![1]));
        assert_eq!(graph.var(roc.states[0].name()).unwrap().shape, Some(vec![50]));
    }

    #[test]
    fn reports_mismatched_batch() {
        let ctx = GraphContext::shared();
        let x = data(&ctx, "x", vec![16, 2], DType::F32).unwrap();
        let y = data(&ctx, "y", vec![8, 1], DType::I64).unwrap();
        auc(&x, &y, AucOptions::default()).unwrap();

        let mut graph = ctx.borrow().main_graph().clone();
        let err = ShapeInference::run(&mut graph, &HashMap::new()).unwrap_err();
        assert!(matches!(err, ShapeInferenceError::IncompatibleShapes { .. }));
    }

    #[test]
    fn initial_shapes_override_declarations() {
        let ctx = GraphContext::shared();
        let x = data(&ctx, "x", vec![1, 4], DType::F32).unwrap();
        crate::nn::topk(&x, 2).unwrap();

        let mut graph = ctx.borrow().main_graph().clone();
        let shapes = HashMap::from([("x".to_string(), vec![5, 4])]);
        ShapeInference::run(&mut graph, &shapes).unwrap();
        let values = &graph.ops[0].output("Out")[0];
        assert_eq!(graph.var(values).unwrap().shape, Some(vec![5, 2]));
    }
}
