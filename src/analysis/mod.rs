//! # Graph Analysis Module
//!
//! Passes that inspect a graph before it is executed.
//!
//! - [`ShapeInference`](shape_inference::ShapeInference): fills output shapes
//!   of `fill_constant`, `top_k`, `accuracy` and `auc` ops and reports rank or
//!   batch mismatches before the kernels would.
//!
//! ```text
//! Asg (outputs without shapes) -> Shape Inference -> Asg (all shapes known)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use asg_metrics::analysis::shape_inference::ShapeInference;
//!
//! let mut graph = context.borrow().main_graph().clone();
//! let shapes = HashMap::from([("scores".to_string(), vec![32, 10])]);
//! ShapeInference::run(&mut graph, &shapes)?;
//! ```

pub mod shape_inference;
