//! `GraphContext` and the `Variable` handle.
//!
//! A `Variable` holds no data. It is a symbolic handle naming a variable
//! declared in the main graph of a `GraphContext`. Layers take handles and
//! append op nodes; nothing is computed until an executor runs the graph.
//!
//! The context owns two graphs: the **main** graph with the model and metric
//! ops, and the **startup** graph with initializer ops that run once before
//! the main graph.

use crate::asg::{Asg, AsgResult, DType, Shape, VarDesc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub const MAIN_GRAPH_ID: usize = 0;
pub const STARTUP_GRAPH_ID: usize = 1;

/// Owns the graphs under construction and the unique-name counters.
///
/// Shared between handles as `Rc<RefCell<GraphContext>>`.
#[derive(Debug, Clone)]
pub struct GraphContext {
    main_graph: Asg,
    startup_graph: Asg,
    name_counters: HashMap<String, usize>,
}

impl GraphContext {
    pub fn new() -> Self {
        Self {
            main_graph: Asg::new(MAIN_GRAPH_ID, Some("main".to_string())),
            startup_graph: Asg::new(STARTUP_GRAPH_ID, Some("startup".to_string())),
            name_counters: HashMap::new(),
        }
    }

    /// Shorthand for `Rc::new(RefCell::new(GraphContext::new()))`.
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn main_graph(&self) -> &Asg {
        &self.main_graph
    }

    pub fn main_graph_mut(&mut self) -> &mut Asg {
        &mut self.main_graph
    }

    pub fn startup_graph(&self) -> &Asg {
        &self.startup_graph
    }

    pub fn startup_graph_mut(&mut self) -> &mut Asg {
        &mut self.startup_graph
    }

    /// Returns `"{key}_{n}"`, where `n` counts calls with the same key from 0.
    pub fn generate_name(&mut self, key: &str) -> String {
        let counter = self.name_counters.entry(key.to_string()).or_insert(0);
        let name = format!("{}_{}", key, counter);
        *counter += 1;
        name
    }
}

impl Default for GraphContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Symbolic handle for a variable of the main graph.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    dtype: DType,
    persistable: bool,
    pub context: Rc<RefCell<GraphContext>>,
}

impl Variable {
    /// Declares a new variable in the main graph and returns its handle.
    pub fn declare(context: &Rc<RefCell<GraphContext>>, desc: VarDesc) -> AsgResult<Self> {
        let (name, dtype, persistable) = (desc.name.clone(), desc.dtype, desc.persistable);
        context.borrow_mut().main_graph_mut().add_var(desc)?;
        Ok(Self { name, dtype, persistable, context: Rc::clone(context) })
    }

    /// Handle for a variable that is already declared in the main graph.
    pub fn existing(context: &Rc<RefCell<GraphContext>>, name: &str) -> AsgResult<Self> {
        let (dtype, persistable) = {
            let ctx = context.borrow();
            let desc = ctx.main_graph().var(name)?;
            (desc.dtype, desc.persistable)
        };
        Ok(Self { name: name.to_string(), dtype, persistable, context: Rc::clone(context) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the declaration this handle points to.
    pub fn desc(&self) -> Option<VarDesc> {
        self.context.borrow().main_graph().vars.get(&self.name).cloned()
    }

    /// Dtype is fixed at declaration.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Current shape in the graph; may be filled in later by shape inference.
    pub fn shape(&self) -> Option<Shape> {
        self.desc().and_then(|d| d.shape)
    }

    pub fn persistable(&self) -> bool {
        self.persistable
    }

    pub fn same_context(&self, other: &Variable) -> bool {
        Rc::ptr_eq(&self.context, &other.context)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.same_context(other)
    }
}
