//! Metric layers.
//!
//! These functions compute nothing. Each one appends the op nodes that
//! compute a metric when the graph is executed:
//! - [`accuracy`]: top-k classification accuracy plus per-batch counts
//! - [`auc`]: ROC / PR area under the curve, accumulated across executions
//!
//! Shape, dtype and curve checks happen in the kernels at execution time.
//!
//! # Example
//!
//! ```rust,ignore
//! use asg_metrics::metrics::{accuracy, auc, AccuracyOptions, AucOptions};
//!
//! let acc = accuracy(&predict, &label, AccuracyOptions::default().with_k(5))?;
//! let roc = auc(&predict, &label, AucOptions::default())?;
//! let [tp, tn, fp, fn_] = &roc.states;
//! ```

pub mod accuracy;
pub mod auc;

pub use accuracy::{accuracy, AccuracyOptions, AccuracyOutput};
pub use auc::{auc, AucCurve, AucOptions, AucOutput, DEFAULT_NUM_THRESHOLDS};
