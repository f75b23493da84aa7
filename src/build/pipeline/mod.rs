//! Dataflow graph engine for the build.
//!
//! A build is a static, acyclic graph of [`Node`]s. Each node wraps a
//! [`Pipe`], which turns one input into zero or one output. When a node
//! produces an output, a copy is dispatched to every linked downstream
//! [`Inlet`] without waiting for it to finish. When it produces nothing,
//! propagation stops there; this is how barrier stages hold back output until
//! their condition is met.
//!
//! ```ignore
//! let parser = Node::new(PostParser::new(markdown));
//! let writer = Node::new(FileWriter::new(output_dir));
//! reader.link(&parser);
//! parser.link(&writer);
//!
//! let mut graph = Graph::new();
//! graph.add_source(&reader);
//! let report = graph.run().await;
//! ```
//!
//! Every dispatch runs as its own task inside a [`Scope`]; [`Graph::run`]
//! joins all of them, so failures in any branch are collected into the
//! [`RunReport`] rather than lost.

mod error;
mod scope;
pub mod stages;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

pub use error::PipelineError;
pub use scope::{Graph, RunReport, Scope};

/// A single transformation step in the graph.
#[async_trait]
pub trait Pipe: Send + Sync + 'static {
    /// What the stage accepts. Sources take `()`.
    type Input: Send + 'static;

    /// What the stage emits. Cloned once per downstream link.
    type Output: Clone + Send + Sync + 'static;

    /// Short name used in logs and failure reports.
    fn name(&self) -> &'static str;

    /// Do the stage's work.
    ///
    /// Returning `Ok(None)` halts propagation at this node.
    async fn operate(&self, input: Self::Input) -> Result<Option<Self::Output>, PipelineError>;
}

/// Anything that can receive a value during a run.
pub trait Inlet<T>: Send + Sync {
    /// Hand `input` over for processing. Work is spawned into `scope` and
    /// this returns immediately.
    fn dispatch(self: Arc<Self>, input: T, scope: &Scope);
}

/// A graph node: a pipe plus its downstream links.
pub struct Node<P: Pipe> {
    pipe: P,
    downstream: Mutex<Vec<Arc<dyn Inlet<P::Output>>>>,
}

impl<P: Pipe> Node<P> {
    pub fn new(pipe: P) -> Arc<Self> {
        Arc::new(Self {
            pipe,
            downstream: Mutex::new(Vec::new()),
        })
    }

    pub fn pipe(&self) -> &P {
        &self.pipe
    }

    /// Register `next` to receive this node's output.
    ///
    /// Linking the same inlet twice is a no-op; returns whether the link was
    /// newly added.
    pub fn link<I>(&self, next: &Arc<I>) -> bool
    where
        I: Inlet<P::Output> + 'static,
    {
        let next: Arc<dyn Inlet<P::Output>> = next.clone();
        let mut downstream = self.downstream.lock();
        if downstream.iter().any(|existing| same_inlet(existing, &next)) {
            return false;
        }
        downstream.push(next);
        true
    }

    /// Number of distinct downstream links.
    #[cfg(test)]
    pub fn fan_out(&self) -> usize {
        self.downstream.lock().len()
    }

    /// Run the pipe on `input` and forward any output downstream.
    ///
    /// Resolves once the downstream work has been dispatched, not finished.
    pub async fn execute(&self, input: P::Input, scope: &Scope) -> Result<(), PipelineError> {
        let stage = self.pipe.name();

        let Some(output) = self.pipe.operate(input).await? else {
            tracing::trace!(stage, "no output; propagation stops here");
            return Ok(());
        };

        let downstream = self.downstream.lock().clone();
        tracing::trace!(stage, fan_out = downstream.len(), "forwarding output");
        for next in downstream {
            next.dispatch(output.clone(), scope);
        }

        Ok(())
    }
}

impl<P: Pipe> Inlet<P::Input> for Node<P> {
    fn dispatch(self: Arc<Self>, input: P::Input, scope: &Scope) {
        let stage = self.pipe.name();
        scope.spawn(stage, move |scope| async move { self.execute(input, &scope).await });
    }
}

/// An inlet that converts values before handing them to another inlet.
///
/// Used to feed one upstream output type into a stage that accepts a tagged
/// input, e.g. marking a record as a template source rather than data.
pub struct Adapter<T, U> {
    target: Arc<dyn Inlet<U>>,
    map: fn(T) -> U,
}

impl<T, U> Adapter<T, U>
where
    T: Send + 'static,
    U: Send + 'static,
{
    pub fn new<I>(target: &Arc<I>, map: fn(T) -> U) -> Arc<Self>
    where
        I: Inlet<U> + 'static,
    {
        let target: Arc<dyn Inlet<U>> = target.clone();
        Arc::new(Self { target, map })
    }
}

impl<T, U> Inlet<T> for Adapter<T, U>
where
    T: Send + 'static,
    U: Send + 'static,
{
    fn dispatch(self: Arc<Self>, input: T, scope: &Scope) {
        self.target.clone().dispatch((self.map)(input), scope);
    }
}

/// Inlet identity is pointer identity; vtables are ignored.
fn same_inlet<T>(a: &Arc<dyn Inlet<T>>, b: &Arc<dyn Inlet<T>>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}
