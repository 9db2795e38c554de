//! Feed / run / fetch driver over a backend.

use super::backend::{Backend, RuntimeError, RuntimeResult, Scope};
use super::cpu_backend::CpuBackend;
use crate::asg::{Asg, Value};
use log::debug;
use std::collections::HashMap;

/// Runs graphs against a caller-owned [`Scope`].
///
/// After every run the values of non-persistable variables of the graph are
/// dropped from the scope; persistable ones (counters, initialized state)
/// stay and are visible to the next run.
pub struct Executor<B: Backend = CpuBackend> {
    backend: B,
}

impl Executor<CpuBackend> {
    pub fn new() -> Self {
        Self { backend: CpuBackend::new() }
    }
}

impl Default for Executor<CpuBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Executor<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// Binds `feed`, runs every op of `graph`, and returns the values of
    /// `fetch` in order.
    pub fn run(
        &self,
        graph: &Asg,
        scope: &mut Scope,
        feed: &HashMap<String, Value>,
        fetch: &[&str],
    ) -> RuntimeResult<Vec<Value>> {
        let result = self.run_inner(graph, scope, feed, fetch);
        let dropped = graph
            .vars
            .values()
            .filter(|v| !v.persistable)
            .filter(|v| scope.remove(&v.name).is_some())
            .count();
        debug!(
            "graph {}: {} ops, {} temporaries dropped, {} values kept",
            graph.id,
            graph.ops.len(),
            dropped,
            scope.len()
        );
        result
    }

    fn run_inner(
        &self,
        graph: &Asg,
        scope: &mut Scope,
        feed: &HashMap<String, Value>,
        fetch: &[&str],
    ) -> RuntimeResult<Vec<Value>> {
        for (name, value) in feed {
            if !graph.has_var(name) {
                return Err(RuntimeError::UnknownFeed(name.clone(), graph.id));
            }
            scope.set(name, value.clone());
        }

        if let Some(op) = graph.ops.iter().find(|op| !self.backend.supports(&op.op_type)) {
            return Err(RuntimeError::UnimplementedOperation(op.op_type.clone()));
        }
        self.backend.run(graph, scope)?;

        fetch
            .iter()
            .map(|&name| {
                scope
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RuntimeError::MissingVariable(name.to_string()))
            })
            .collect()
    }

    /// Convenience for graphs without inputs, such as startup graphs.
    pub fn run_startup(&self, startup: &Asg, scope: &mut Scope) -> RuntimeResult<()> {
        self.run(startup, scope, &HashMap::new(), &[]).map(|_| ())
    }
}
