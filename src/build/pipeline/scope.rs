//! Running a graph and observing every branch it dispatches.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Inlet, PipelineError};

/// One dispatched unit of work.
struct Branch {
    stage: &'static str,
    handle: JoinHandle<Result<(), PipelineError>>,
}

/// Handle through which stages spawn downstream work during a run.
///
/// Every spawned task owns a clone of the scope, so the run's branch channel
/// stays open until the last task that could still spawn has finished.
#[derive(Clone)]
pub struct Scope {
    branches: mpsc::UnboundedSender<Branch>,
}

impl Scope {
    fn new() -> (Self, mpsc::UnboundedReceiver<Branch>) {
        let (branches, receiver) = mpsc::unbounded_channel();
        (Self { branches }, receiver)
    }

    /// Spawn `work` as a new branch of the run.
    pub fn spawn<F, Fut>(&self, stage: &'static str, work: F)
    where
        F: FnOnce(Scope) -> Fut,
        Fut: Future<Output = Result<(), PipelineError>> + Send + 'static,
    {
        let handle = tokio::spawn(work(self.clone()));
        // The receiver only goes away once the run is over.
        let _ = self.branches.send(Branch { stage, handle });
    }
}

/// A failed branch and the stage it failed in.
#[derive(Debug)]
pub struct BranchFailure {
    pub stage: &'static str,
    pub error: PipelineError,
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Number of branches (stage executions) that were dispatched
    pub executed: usize,
    /// Branches that returned an error or panicked
    pub failures: Vec<BranchFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The set of source nodes that start a run.
///
/// Sources are triggered once, with no input, after the whole graph has been
/// wired.
#[derive(Default)]
pub struct Graph {
    sources: Vec<Arc<dyn Inlet<()>>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source<I>(&mut self, source: &Arc<I>)
    where
        I: Inlet<()> + 'static,
    {
        let source: Arc<dyn Inlet<()>> = source.clone();
        self.sources.push(source);
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Trigger every source and wait for all dispatched work to finish,
    /// including work dispatched by other branches.
    pub async fn run(self) -> RunReport {
        let (scope, mut branches) = Scope::new();
        for source in self.sources {
            source.dispatch((), &scope);
        }
        drop(scope);

        let mut report = RunReport::default();
        while let Some(branch) = branches.recv().await {
            report.executed += 1;
            let error = match branch.handle.await {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error,
                Err(join_error) => PipelineError::Panicked {
                    stage: branch.stage.to_string(),
                    message: join_error.to_string(),
                },
            };
            tracing::error!(stage = branch.stage, %error, "branch failed");
            report.failures.push(BranchFailure {
                stage: branch.stage,
                error,
            });
        }

        tracing::debug!(
            executed = report.executed,
            failed = report.failures.len(),
            "run finished"
        );
        report
    }
}
