//! Top-k accuracy layer.

use crate::asg::{AsgResult, DType};
use crate::layer_helper::{LayerHelper, OpSpec};
use crate::nn::topk;
use crate::tensor::Variable;

/// Options of [`accuracy`].
#[derive(Debug, Clone)]
pub struct AccuracyOptions {
    /// A sample is correct when its label is among the `k` best scores.
    pub k: usize,
    /// Output for the number of correct samples; created when `None`.
    pub correct: Option<Variable>,
    /// Output for the number of samples; created when `None`.
    pub total: Option<Variable>,
}

impl Default for AccuracyOptions {
    fn default() -> Self {
        Self { k: 1, correct: None, total: None }
    }
}

impl AccuracyOptions {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_correct(mut self, correct: Variable) -> Self {
        self.correct = Some(correct);
        self
    }

    pub fn with_total(mut self, total: Variable) -> Self {
        self.total = Some(total);
        self
    }
}

/// Handles returned by [`accuracy`].
#[derive(Debug, Clone)]
pub struct AccuracyOutput {
    /// `float32` rate `correct / total` of the executed batch.
    pub accuracy: Variable,
    pub correct: Variable,
    pub total: Variable,
}

/// Appends a `top_k` op followed by an `accuracy` op.
///
/// `input` holds prediction scores `[N, C]`, `label` the class ids `[N, 1]`.
/// The dtypes of the two may differ. The counters written by the op cover the
/// executed batch only.
pub fn accuracy(input: &Variable, label: &Variable, options: AccuracyOptions) -> AsgResult<AccuracyOutput> {
    let helper = LayerHelper::new(&input.context, "accuracy");
    let (topk_out, topk_indices) = topk(input, options.k)?;

    let acc_out = helper.create_tmp_variable(DType::F32)?;
    let correct = match options.correct {
        Some(var) => var,
        None => helper.create_tmp_variable(DType::I64)?,
    };
    let total = match options.total {
        Some(var) => var,
        None => helper.create_tmp_variable(DType::I64)?,
    };

    helper.append_op(
        OpSpec::new("accuracy")
            .input("Out", &[&topk_out])
            .input("Indices", &[&topk_indices])
            .input("Label", &[label])
            .output("Accuracy", &[&acc_out])
            .output("Correct", &[&correct])
            .output("Total", &[&total]),
    )?;

    Ok(AccuracyOutput { accuracy: acc_out, correct, total })
}
