//! Execution of graphs built by the layer functions.
//!
//! The layers only describe computations; this module runs them. A
//! [`Scope`](backend::Scope) holds variable values, the
//! [`CpuBackend`](cpu_backend::CpuBackend) runs op kernels in order, and the
//! [`Executor`](executor::Executor) binds feeds, fetches results and decides
//! which values survive between runs.

pub mod backend;
pub mod cpu_backend;
pub mod executor;
pub mod metric_kernels;

pub use backend::{Backend, RuntimeError, RuntimeResult, Scope};
pub use cpu_backend::CpuBackend;
pub use executor::Executor;
