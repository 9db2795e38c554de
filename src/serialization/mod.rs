//! Serialization of graphs and of persistable runtime state.
//!
//! - **Graphs**: the main and startup graphs of a context as one JSON document
//! - **State**: values of persistable variables (e.g. AUC counters) as JSON,
//!   so accumulation can resume in a later process
//!
//! # Example
//!
//! ```rust,ignore
//! use asg_metrics::serialization::{save_graphs, load_graphs};
//!
//! save_graphs("metrics.json", &GraphBundle::from_context(&ctx.borrow()))?;
//! let bundle = load_graphs("metrics.json")?;
//! ```

pub mod graph_io;

pub use graph_io::{
    load_graphs, load_state, save_graphs, save_state, GraphBundle, SerializationError,
};
