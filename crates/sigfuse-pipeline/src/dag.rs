//! Generic dependency-graph executor.
//!
//! Stages are named async closures with declared dependencies. [`StageGraph::execute`]
//! launches every stage whose dependencies are resolved onto a tokio
//! `JoinSet`, bounded by `max_parallel`, and hands it a snapshot holding only
//! its declared dependencies' outputs. Outputs are written once, when the
//! stage finishes, so no stage can observe a partial value.
//!
//! A `Required` edge skips the dependent when the dependency fails or is
//! skipped. A `Defaulted` edge runs the dependent anyway once the dependency
//! is terminal; the missing value is simply absent from its inputs.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tokio::task::{Id, JoinError, JoinSet};

use crate::cancel::CancellationToken;
use crate::error::{FaultKind, GraphError, StageError, StageFault};

pub type StageFuture<V> = BoxFuture<'static, Result<V, StageError>>;
pub type StageFn<V> = Arc<dyn Fn(StageInputs<V>) -> StageFuture<V> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Required,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub stage: String,
    pub kind: EdgeKind,
}

impl Dependency {
    pub fn required(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            kind: EdgeKind::Required,
        }
    }

    pub fn defaulted(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            kind: EdgeKind::Defaulted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Done,
    Failed(FaultKind),
    Skipped,
}

impl StageStatus {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_) | Self::Skipped)
    }
}

/// Completed outputs of a stage's declared dependencies.
pub struct StageInputs<V> {
    values: HashMap<String, Arc<V>>,
}

impl<V> StageInputs<V> {
    pub fn get(&self, stage: &str) -> Option<&V> {
        self.values.get(stage).map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

struct StageNode<V> {
    name: String,
    dependencies: Vec<Dependency>,
    run: StageFn<V>,
}

/// Result of one graph execution.
pub struct GraphRun<V> {
    pub outputs: HashMap<String, Arc<V>>,
    /// Final status per stage, in declaration order.
    pub statuses: Vec<(String, StageStatus)>,
    pub faults: Vec<StageFault>,
    pub cancelled: bool,
}

impl<V> GraphRun<V> {
    pub fn output(&self, stage: &str) -> Option<&V> {
        self.outputs.get(stage).map(AsRef::as_ref)
    }

    pub fn status(&self, stage: &str) -> Option<StageStatus> {
        self.statuses
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, status)| *status)
    }
}

pub struct StageGraph<V> {
    nodes: Vec<StageNode<V>>,
}

impl<V> Default for StageGraph<V> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<V: Send + Sync + 'static> StageGraph<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stage. Structure is checked by [`validate`](Self::validate).
    pub fn add_stage<F, Fut>(&mut self, name: &str, dependencies: Vec<Dependency>, stage: F)
    where
        F: Fn(StageInputs<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, StageError>> + Send + 'static,
    {
        self.nodes.push(StageNode {
            name: name.to_string(),
            dependencies,
            run: Arc::new(move |inputs| stage(inputs).boxed()),
        });
    }

    /// Check the graph and return stage names in a valid execution order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] on a duplicate stage name, a dependency on an
    /// undeclared stage, or a cycle.
    pub fn validate(&self) -> Result<Vec<&str>, GraphError> {
        Ok(self
            .topological_order()?
            .into_iter()
            .map(|i| self.nodes[i].name.as_str())
            .collect())
    }

    /// Kahn's algorithm over node indices; ties resolve in declaration order.
    fn topological_order(&self) -> Result<Vec<usize>, GraphError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if index.insert(node.name.as_str(), i).is_some() {
                return Err(GraphError::DuplicateStage(node.name.clone()));
            }
        }

        let mut in_degree = vec![0usize; self.nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            for dep in &node.dependencies {
                let &d = index.get(dep.stage.as_str()).ok_or_else(|| {
                    GraphError::UnknownDependency {
                        stage: node.name.clone(),
                        dependency: dep.stage.clone(),
                    }
                })?;
                in_degree[i] += 1;
                dependents[d].push(i);
            }
        }

        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &next in &dependents[i] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() < self.nodes.len() {
            let placed: HashSet<usize> = order.iter().copied().collect();
            let stuck = (0..self.nodes.len())
                .filter(|i| !placed.contains(i))
                .map(|i| self.nodes[i].name.clone())
                .collect();
            return Err(GraphError::Cycle(stuck));
        }
        Ok(order)
    }

    /// Run every stage to a terminal state, or until `cancel` fires.
    ///
    /// On cancellation, in-flight stages are aborted and marked
    /// `Failed(Cancelled)` and stages not yet started are `Skipped`. Outputs
    /// of stages that finished before the cancel are kept.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the graph is invalid; no stage runs in that case.
    pub async fn execute(
        &self,
        max_parallel: usize,
        cancel: &CancellationToken,
    ) -> Result<GraphRun<V>, GraphError> {
        let order = self.topological_order()?;
        let index: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.as_str(), i))
            .collect();
        let dependencies: Vec<Vec<(usize, EdgeKind)>> = self
            .nodes
            .iter()
            .map(|n| {
                n.dependencies
                    .iter()
                    .filter_map(|d| index.get(d.stage.as_str()).map(|&i| (i, d.kind)))
                    .collect()
            })
            .collect();

        let max_parallel = max_parallel.max(1);
        let mut statuses = vec![StageStatus::Pending; self.nodes.len()];
        let mut outputs: Vec<Option<Arc<V>>> = (0..self.nodes.len()).map(|_| None).collect();
        let mut faults: Vec<StageFault> = Vec::new();
        let mut running: HashMap<usize, Instant> = HashMap::new();
        let mut tasks: JoinSet<(usize, TaskResult<V>)> = JoinSet::new();
        let mut task_ids: HashMap<Id, usize> = HashMap::new();
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                tasks.abort_all();
                while tasks.join_next().await.is_some() {}
                for (i, _) in running.drain() {
                    statuses[i] = StageStatus::Failed(FaultKind::Cancelled);
                    faults.push(StageFault {
                        stage: self.nodes[i].name.clone(),
                        kind: FaultKind::Cancelled,
                        message: "run cancelled while stage was running".to_string(),
                    });
                }
                for status in &mut statuses {
                    if *status == StageStatus::Pending {
                        *status = StageStatus::Skipped;
                    }
                }
                tracing::warn!("pipeline run cancelled");
                cancelled = true;
                break;
            }

            // Topological order lets a skip cascade through a chain in one pass.
            for &i in &order {
                if statuses[i] != StageStatus::Pending {
                    continue;
                }
                let node = &self.nodes[i];
                let blocked_by = dependencies[i].iter().find(|&&(d, kind)| {
                    kind == EdgeKind::Required
                        && matches!(statuses[d], StageStatus::Failed(_) | StageStatus::Skipped)
                });
                if let Some(&(d, _)) = blocked_by {
                    let blocker = &self.nodes[d].name;
                    tracing::warn!(stage = %node.name, dependency = %blocker, "stage skipped");
                    statuses[i] = StageStatus::Skipped;
                    faults.push(StageFault {
                        stage: node.name.clone(),
                        kind: FaultKind::Orchestration,
                        message: format!("dependency '{blocker}' did not complete"),
                    });
                    continue;
                }

                let ready = dependencies[i].iter().all(|&(d, kind)| match kind {
                    EdgeKind::Required => statuses[d] == StageStatus::Done,
                    EdgeKind::Defaulted => statuses[d].is_terminal(),
                });
                if !ready || running.len() >= max_parallel {
                    continue;
                }

                let values = dependencies[i]
                    .iter()
                    .filter_map(|&(d, _)| {
                        outputs[d]
                            .as_ref()
                            .map(|v| (self.nodes[d].name.clone(), Arc::clone(v)))
                    })
                    .collect();
                let fut = (node.run)(StageInputs { values });
                let handle =
                    tasks.spawn(async move { (i, AssertUnwindSafe(fut).catch_unwind().await) });
                task_ids.insert(handle.id(), i);
                statuses[i] = StageStatus::Running;
                running.insert(i, Instant::now());
                tracing::debug!(stage = %node.name, "stage launched");
            }

            if running.is_empty() {
                break;
            }

            tokio::select! {
                () = cancel.cancelled() => {}
                joined = tasks.join_next() => {
                    let Some(joined) = joined else {
                        for (i, _) in running.drain() {
                            tracing::error!(stage = %self.nodes[i].name, "stage task lost");
                            statuses[i] = StageStatus::Failed(FaultKind::Internal);
                            faults.push(StageFault {
                                stage: self.nodes[i].name.clone(),
                                kind: FaultKind::Internal,
                                message: "stage task lost".to_string(),
                            });
                        }
                        continue;
                    };
                    let Some((i, result)) = resolve_join(joined, &task_ids) else {
                        tracing::error!("finished task does not belong to any stage");
                        continue;
                    };
                    task_ids.retain(|_, stage| *stage != i);
                    let started = running.remove(&i);
                    let name = &self.nodes[i].name;
                    match result {
                        Ok(Ok(value)) => {
                            let elapsed_ms = started
                                .map_or(0, |t| u64::try_from(t.elapsed().as_millis()).unwrap_or(u64::MAX));
                            tracing::info!(stage = %name, elapsed_ms, "stage done");
                            outputs[i] = Some(Arc::new(value));
                            statuses[i] = StageStatus::Done;
                        }
                        Ok(Err(err)) => {
                            tracing::warn!(stage = %name, kind = %err.kind, error = %err.message, "stage failed");
                            statuses[i] = StageStatus::Failed(err.kind);
                            faults.push(StageFault {
                                stage: name.clone(),
                                kind: err.kind,
                                message: err.message,
                            });
                        }
                        Err(_) => {
                            tracing::error!(stage = %name, "stage panicked");
                            statuses[i] = StageStatus::Failed(FaultKind::Internal);
                            faults.push(StageFault {
                                stage: name.clone(),
                                kind: FaultKind::Internal,
                                message: "stage panicked".to_string(),
                            });
                        }
                    }
                }
            }
        }

        let outputs = self
            .nodes
            .iter()
            .zip(outputs)
            .filter_map(|(n, v)| v.map(|v| (n.name.clone(), v)))
            .collect();

        Ok(GraphRun {
            outputs,
            statuses: self
                .nodes
                .iter()
                .zip(statuses)
                .map(|(n, s)| (n.name.clone(), s))
                .collect(),
            faults,
            cancelled,
        })
    }
}

type TaskResult<V> = Result<Result<V, StageError>, Box<dyn std::any::Any + Send>>;

/// Map a finished task back to its stage. A task that ended without a
/// result (aborted, or a panic outside the stage future) becomes an
/// internal stage error.
fn resolve_join<V>(
    joined: Result<(usize, TaskResult<V>), JoinError>,
    task_ids: &HashMap<Id, usize>,
) -> Option<(usize, TaskResult<V>)> {
    match joined {
        Ok(done) => Some(done),
        Err(e) => task_ids.get(&e.id()).map(|&i| {
            let err = StageError::internal(format!("stage task ended without a result: {e}"));
            (i, Ok(Err(err)))
        }),
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
