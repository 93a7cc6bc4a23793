//! # Step Estimates
//!
//! A tracked operation announces, before anything is sent, how many
//! transactions it will produce. The figure travels in the kickoff
//! notification and bounds the notifications that follow.

use serde_json::Value;

/// An operation whose transactions are tracked on the bus.
pub trait TrackedOperation: Send + Sync {
    /// Topic suffix for the operation, e.g. `"DAO.new"`.
    fn name(&self) -> &str;

    /// Arguments echoed in every notification.
    fn options(&self) -> Value;

    /// Number of transactions the operation will send. Must be pure: it is
    /// evaluated before the first call goes out.
    fn estimate_step_count(&self) -> u32;
}

/// Step count of `operation`.
#[must_use]
pub fn estimate_step_count(operation: &dyn TrackedOperation) -> u32 {
    operation.estimate_step_count()
}

/// A single contract call.
#[derive(Debug, Clone)]
pub struct SingleCall {
    name: String,
    options: Value,
}

impl SingleCall {
    /// Creates a one-transaction operation.
    pub fn new(name: impl Into<String>, options: Value) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl TrackedOperation for SingleCall {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> Value {
        self.options.clone()
    }

    fn estimate_step_count(&self) -> u32 {
        1
    }
}

/// An operation made of its own calls followed by nested operations.
///
/// Estimate: `own_steps + Σ children`.
pub struct Composite {
    name: String,
    options: Value,
    own_steps: u32,
    children: Vec<Box<dyn TrackedOperation>>,
}

impl Composite {
    /// Creates a composite with `own_steps` direct calls and no children.
    pub fn new(name: impl Into<String>, options: Value, own_steps: u32) -> Self {
        Self {
            name: name.into(),
            options,
            own_steps,
            children: Vec::new(),
        }
    }

    /// Adds a nested operation.
    #[must_use]
    pub fn with_child(mut self, child: impl TrackedOperation + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }

    /// Adds several nested operations, in execution order.
    #[must_use]
    pub fn with_children<I, T>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: TrackedOperation + 'static,
    {
        self.children
            .extend(children.into_iter().map(|child| Box::new(child) as Box<dyn TrackedOperation>));
        self
    }

    /// Nested operations in execution order.
    #[must_use]
    pub fn children(&self) -> &[Box<dyn TrackedOperation>] {
        &self.children
    }
}

impl TrackedOperation for Composite {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> Value {
        self.options.clone()
    }

    /// Saturates at `u32::MAX`; such a plan can never complete.
    fn estimate_step_count(&self) -> u32 {
        self.children
            .iter()
            .map(|child| child.estimate_step_count())
            .fold(self.own_steps, u32::saturating_add)
    }
}
