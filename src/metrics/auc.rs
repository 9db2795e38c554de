//! Area-under-curve layer.
//!
//! The op keeps four confusion counters (`tp`, `tn`, `fp`, `fn`), one entry
//! per threshold. They are persistable, zero-initialized by the startup
//! graph, and bound as both inputs and outputs of the `auc` op, so every
//! execution adds the batch counts to what earlier executions left.

use crate::asg::{AsgResult, DType};
use crate::initializer::Initializer;
use crate::layer_helper::{LayerHelper, OpSpec};
use crate::tensor::Variable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_NUM_THRESHOLDS: usize = 200;

/// Curve whose area is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AucCurve {
    /// Receiver operating characteristic.
    #[default]
    Roc,
    /// Precision / recall.
    Pr,
}

impl AucCurve {
    /// Name stored in the `curve` attribute of the op.
    pub fn as_str(&self) -> &'static str {
        match self {
            AucCurve::Roc => "ROC",
            AucCurve::Pr => "PR",
        }
    }
}

impl fmt::Display for AucCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AucCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROC" | "roc" => Ok(AucCurve::Roc),
            "PR" | "pr" => Ok(AucCurve::Pr),
            other => Err(format!("unknown curve '{}', expected ROC or PR", other)),
        }
    }
}

/// Options of [`auc`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AucOptions {
    pub curve: AucCurve,
    /// Number of thresholds used to discretize the curve.
    pub num_thresholds: usize,
    /// Accepted for call-site compatibility; the `auc` op does not read it.
    pub topk: usize,
}

impl Default for AucOptions {
    fn default() -> Self {
        Self { curve: AucCurve::Roc, num_thresholds: DEFAULT_NUM_THRESHOLDS, topk: 1 }
    }
}

impl AucOptions {
    pub fn with_curve(mut self, curve: AucCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn with_num_thresholds(mut self, num_thresholds: usize) -> Self {
        self.num_thresholds = num_thresholds;
        self
    }

    pub fn with_topk(mut self, topk: usize) -> Self {
        self.topk = topk;
        self
    }
}

/// Handles returned by [`auc`].
#[derive(Debug, Clone)]
pub struct AucOutput {
    /// `float64` scalar with the AUC over everything accumulated so far.
    pub auc: Variable,
    /// Counters in the order `[tp, tn, fp, fn]`.
    pub states: [Variable; 4],
}

impl AucOutput {
    pub fn true_positives(&self) -> &Variable {
        &self.states[0]
    }

    pub fn true_negatives(&self) -> &Variable {
        &self.states[1]
    }

    pub fn false_positives(&self) -> &Variable {
        &self.states[2]
    }

    pub fn false_negatives(&self) -> &Variable {
        &self.states[3]
    }
}

/// Appends an `auc` op computing the area under `options.curve`.
///
/// `input` holds probabilities in `[0, 1]`, `label` binary labels (non-zero
/// counts as positive). Every call creates its own four counters.
pub fn auc(input: &Variable, label: &Variable, options: AucOptions) -> AsgResult<AucOutput> {
    let helper = LayerHelper::new(&input.context, "auc");
    let auc_out = helper.create_tmp_variable(DType::F64)?;

    let counter_shape = Some(vec![options.num_thresholds]);
    let tp = helper.create_global_variable(true, DType::I64, counter_shape.clone())?;
    let tn = helper.create_global_variable(true, DType::I64, counter_shape.clone())?;
    let fp = helper.create_global_variable(true, DType::I64, counter_shape.clone())?;
    let fn_ = helper.create_global_variable(true, DType::I64, counter_shape)?;
    for var in [&tp, &tn, &fp, &fn_] {
        helper.set_variable_initializer(var, Initializer::Constant { value: 0.0, force_cpu: true })?;
    }

    helper.append_op(
        OpSpec::new("auc")
            .input("Predict", &[input])
            .input("Label", &[label])
            .input("TP", &[&tp])
            .input("TN", &[&tn])
            .input("FP", &[&fp])
            .input("FN", &[&fn_])
            .attr("curve", options.curve.as_str())
            .attr("num_thresholds", options.num_thresholds)
            .output("AUC", &[&auc_out])
            .output("TPOut", &[&tp])
            .output("TNOut", &[&tn])
            .output("FPOut", &[&fp])
            .output("FNOut", &[&fn_]),
    )?;

    Ok(AucOutput { auc: auc_out, states: [tp, tn, fp, fn_] })
}
