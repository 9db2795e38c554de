//! # Layers Module
//!
//! Layer functions append op nodes to the main graph of a `GraphContext`
//! and return handles to the variables those ops write.
//!
//! ## Available Layers
//!
//! - [`data`]: declares a graph input to be fed at execution time
//! - [`topk`]: top-k values and indices along the last axis
//!
//! ## Example
//!
//! ```ignore
//! use asg_metrics::asg::DType;
//! use asg_metrics::nn::{data, topk};
//! use asg_metrics::tensor::GraphContext;
//!
//! let ctx = GraphContext::shared();
//! let scores = data(&ctx, "scores", vec![32, 10], DType::F32)?;
//! let (values, indices) = topk(&scores, 5)?;
//! ```

pub mod input;
pub mod topk;

pub use input::data;
pub use topk::topk;
