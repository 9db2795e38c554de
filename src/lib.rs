//! # asg-metrics: metric layers for a graph-based deep learning engine
//!
//! Layer functions here build graphs; they do not compute. `accuracy` and
//! `auc` append op nodes to the main graph of a [`GraphContext`](tensor::GraphContext)
//! and return symbolic handles. The [`runtime`] executes the graph later,
//! and that is where shapes, dtypes and curve names are checked.
//!
//! ## Usage Example
//!
//! ```no_run
//! use asg_metrics::asg::DType;
//! use asg_metrics::metrics::{accuracy, auc, AccuracyOptions, AucOptions};
//! use asg_metrics::nn::data;
//! use asg_metrics::tensor::GraphContext;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // 1. Create graph context
//! let ctx = GraphContext::shared();
//!
//! // 2. Declare symbolic inputs
//! let predict = data(&ctx, "predict", vec![32, 2], DType::F32)?;
//! let label = data(&ctx, "label", vec![32, 1], DType::I64)?;
//!
//! // 3. Append metric ops
//! let acc = accuracy(&predict, &label, AccuracyOptions::default())?;
//! let roc = auc(&predict, &label, AucOptions::default())?;
//!
//! // The startup graph zeroes the AUC counters; the main graph updates them.
//! # let _ = (acc, roc);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod asg;
pub mod initializer;
pub mod layer_helper;
pub mod metrics;
pub mod nn;
pub mod runtime;
pub mod serialization;
pub mod tensor;
