//! Kernels behind the `accuracy` and `auc` ops.

use super::backend::{OpContext, RuntimeError, RuntimeResult};
use crate::asg::Value;
use crate::metrics::AucCurve;
use ndarray::{arr1, ArrayD};

/// Offset that puts the first and last thresholds just outside `[0, 1]`.
const THRESHOLD_EPSILON: f64 = 1e-7;
/// Keeps rates finite when a counter pair is all zero.
const RATE_EPSILON: f64 = 1e-6;

/// Flattens an integer label tensor into class ids.
fn labels_as_i64(value: &Value) -> RuntimeResult<Vec<i64>> {
    match value {
        Value::I64(a) => Ok(a.iter().copied().collect()),
        Value::I32(a) => Ok(a.iter().map(|&v| v as i64).collect()),
        other => Err(RuntimeError::TypeError {
            expected: "int32 or int64 labels".to_string(),
            actual: other.dtype().to_string(),
        }),
    }
}

fn counter(value: &Value, name: &str, len: usize) -> RuntimeResult<Vec<i64>> {
    match value {
        Value::I64(a) if a.len() == len => Ok(a.iter().copied().collect()),
        Value::I64(a) => Err(RuntimeError::ShapeError(format!(
            "auc: counter {} has {} entries, expected num_thresholds = {}",
            name,
            a.len(),
            len
        ))),
        other => Err(RuntimeError::TypeError {
            expected: format!("int64 counter {}", name),
            actual: other.dtype().to_string(),
        }),
    }
}

/// `Correct` counts rows whose label is among the top-k indices; `Accuracy`
/// is `Correct / Total` for the batch (0 for an empty batch).
pub(crate) fn op_accuracy(ctx: &mut OpContext<'_>) -> RuntimeResult<()> {
    let indices = match ctx.input("Indices")? {
        Value::I64(a) => a.clone(),
        other => {
            return Err(RuntimeError::TypeError {
                expected: "int64 indices".to_string(),
                actual: other.dtype().to_string(),
            })
        }
    };
    if ctx.input("Out")?.shape() != indices.shape() {
        return Err(RuntimeError::ShapeError(format!(
            "accuracy: Out {:?} and Indices {:?} differ",
            ctx.input("Out")?.shape(),
            indices.shape()
        )));
    }
    let labels = labels_as_i64(ctx.input("Label")?)?;

    let rows = indices.shape().first().copied().unwrap_or(0);
    if labels.len() != rows {
        return Err(RuntimeError::ShapeError(format!(
            "accuracy: {} labels for {} prediction rows",
            labels.len(),
            rows
        )));
    }
    let k = if rows == 0 { 0 } else { indices.len() / rows };
    let flat: Vec<i64> = indices.iter().copied().collect();

    let correct = labels
        .iter()
        .enumerate()
        .filter(|&(row, label)| flat[row * k..(row + 1) * k].contains(label))
        .count();
    let rate = if rows == 0 { 0.0 } else { correct as f32 / rows as f32 };

    ctx.set_output("Accuracy", Value::F32(arr1(&[rate]).into_dyn()))?;
    ctx.set_output("Correct", Value::I64(arr1(&[correct as i64]).into_dyn()))?;
    ctx.set_output("Total", Value::I64(arr1(&[rows as i64]).into_dyn()))
}

/// Thresholds `t_0 < t_1 < ... < t_{n-1}` spanning slightly beyond `[0, 1]`.
pub(crate) fn auc_thresholds(num_thresholds: usize) -> Vec<f64> {
    let last = num_thresholds - 1;
    (0..num_thresholds)
        .map(|i| match i {
            0 => -THRESHOLD_EPSILON,
            i if i == last => 1.0 + THRESHOLD_EPSILON,
            i => i as f64 / last as f64,
        })
        .collect()
}

/// Trapezoidal area under the curve traced by the counters.
pub(crate) fn area_under_curve(curve: AucCurve, tp: &[i64], tn: &[i64], fp: &[i64], fn_: &[i64]) -> f64 {
    let points: Vec<(f64, f64)> = (0..tp.len())
        .map(|i| {
            let (tp, tn, fp, fn_) = (tp[i] as f64, tn[i] as f64, fp[i] as f64, fn_[i] as f64);
            let tpr = (tp + RATE_EPSILON) / (tp + fn_ + RATE_EPSILON);
            match curve {
                AucCurve::Roc => {
                    let fpr = fp / (fp + tn + RATE_EPSILON);
                    (fpr, tpr)
                }
                AucCurve::Pr => {
                    let precision = (tp + RATE_EPSILON) / (tp + fp + RATE_EPSILON);
                    (tpr, precision)
                }
            }
        })
        .collect();

    points
        .windows(2)
        .map(|w| (w[0].0 - w[1].0) * (w[0].1 + w[1].1) / 2.0)
        .sum()
}

/// Adds the batch confusion counts to the counters and writes the AUC of
/// everything accumulated so far.
pub(crate) fn op_auc(ctx: &mut OpContext<'_>) -> RuntimeResult<()> {
    let curve_name = ctx.attr_str("curve")?;
    let curve: AucCurve = curve_name.parse().map_err(|reason: String| ctx.invalid_attr("curve", reason))?;
    let num_thresholds = ctx.attr_int("num_thresholds")?;
    if num_thresholds < 2 {
        return Err(ctx.invalid_attr(
            "num_thresholds",
            format!("at least 2 thresholds are needed, got {}", num_thresholds),
        ));
    }
    let num_thresholds = num_thresholds as usize;

    let scores = positive_scores(ctx.input("Predict")?)?;
    let labels = labels_as_i64(ctx.input("Label")?)?;
    if scores.len() != labels.len() {
        return Err(RuntimeError::ShapeError(format!(
            "auc: {} predictions for {} labels",
            scores.len(),
            labels.len()
        )));
    }

    let mut tp = counter(ctx.input("TP")?, "TP", num_thresholds)?;
    let mut tn = counter(ctx.input("TN")?, "TN", num_thresholds)?;
    let mut fp = counter(ctx.input("FP")?, "FP", num_thresholds)?;
    let mut fn_ = counter(ctx.input("FN")?, "FN", num_thresholds)?;

    for (i, threshold) in auc_thresholds(num_thresholds).into_iter().enumerate() {
        for (&score, &label) in scores.iter().zip(labels.iter()) {
            let predicted = score >= threshold;
            match (label != 0, predicted) {
                (true, true) => tp[i] += 1,
                (true, false) => fn_[i] += 1,
                (false, true) => fp[i] += 1,
                (false, false) => tn[i] += 1,
            }
        }
    }

    let auc = area_under_curve(curve, &tp, &tn, &fp, &fn_);
    ctx.set_output("AUC", Value::F64(arr1(&[auc]).into_dyn()))?;
    ctx.set_output("TPOut", Value::I64(ArrayD::from_shape_vec(vec![num_thresholds], tp).map_err(shape_err)?))?;
    ctx.set_output("TNOut", Value::I64(ArrayD::from_shape_vec(vec![num_thresholds], tn).map_err(shape_err)?))?;
    ctx.set_output("FPOut", Value::I64(ArrayD::from_shape_vec(vec![num_thresholds], fp).map_err(shape_err)?))?;
    ctx.set_output("FNOut", Value::I64(ArrayD::from_shape_vec(vec![num_thresholds], fn_).map_err(shape_err)?))
}

fn shape_err(e: ndarray::ShapeError) -> RuntimeError {
    RuntimeError::ShapeError(e.to_string())
}

/// Score of the positive class per sample: the last column of a `[N, C]`
/// prediction, or every element of a `[N]` one.
fn positive_scores(predict: &Value) -> RuntimeResult<Vec<f64>> {
    fn last_column<T: Copy + Into<f64>>(a: &ArrayD<T>) -> RuntimeResult<Vec<f64>> {
        match a.ndim() {
            1 => Ok(a.iter().map(|&v| v.into()).collect()),
            2 => {
                let width = a.shape()[1];
                if width == 0 {
                    return Err(RuntimeError::ShapeError("auc: Predict has no columns".to_string()));
                }
                Ok(a.iter().skip(width - 1).step_by(width).map(|&v| v.into()).collect())
            }
            n => Err(RuntimeError::ShapeError(format!("auc: Predict must be 1-D or 2-D, got {}-D", n))),
        }
    }

    match predict {
        Value::F32(a) => last_column(a),
        Value::F64(a) => last_column(a),
        other => Err(RuntimeError::TypeError {
            expected: "float32 or float64 predictions".to_string(),
            actual: other.dtype().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_span_unit_interval() {
        let t = auc_thresholds(5);
        assert_eq!(t.len(), 5);
        assert!(t[0] < 0.0);
        assert!(t[4] > 1.0);
        assert!((t[1] - 0.25).abs() < 1e-12);
        assert!((t[3] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn separable_scores_give_full_roc_area() {
        // thresholds: [-eps, 0.5, 1 + eps]; positives score 0.9, negatives 0.1
        let tp = [2, 2, 0];
        let fn_ = [0, 0, 2];
        let fp = [2, 0, 0];
        let tn = [0, 2, 2];
        let auc = area_under_curve(AucCurve::Roc, &tp, &tn, &fp, &fn_);
        assert!((auc - 1.0).abs() < 1e-3, "auc = {}", auc);
    }

    #[test]
    fn constant_scores_give_half_roc_area() {
        let tp = [2, 0, 0];
        let fn_ = [0, 2, 2];
        let fp = [2, 0, 0];
        let tn = [0, 2, 2];
        let auc = area_under_curve(AucCurve::Roc, &tp, &tn, &fp, &fn_);
        assert!((auc - 0.5).abs() < 1e-3, "auc = {}", auc);
    }
}
