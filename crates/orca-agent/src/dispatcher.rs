//! Worker dispatcher
//!
//! A pure transport: it looks up the worker, enforces the grant and the
//! per-invocation ceiling, validates the response and hands back a
//! `WorkerResult`. Retrying is the caller's decision.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use orca_core::{OrcaError, Result, WorkerId};

use crate::capability::ShellPolicy;
use crate::circuit_breaker::CircuitBreaker;
use crate::protocol::{WorkerRequest, WorkerResult};
use crate::worker::Worker;

/// Default per-invocation ceiling
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// One member of a parallel fan-out
#[derive(Debug, Clone)]
pub struct SubRequest {
    pub request: WorkerRequest,
    /// Files the sub-request may modify
    pub touches: Vec<String>,
    /// Gate the sub-request feeds, if any
    pub gate: Option<String>,
}

impl SubRequest {
    /// A read-only sub-request touching no files and feeding no gate
    pub fn read_only(request: WorkerRequest) -> Self {
        Self {
            request,
            touches: Vec::new(),
            gate: None,
        }
    }
}

/// Routes requests to registered workers
pub struct WorkerDispatcher {
    workers: HashMap<WorkerId, Arc<dyn Worker>>,
    breakers: HashMap<WorkerId, CircuitBreaker>,
    shell_policy: ShellPolicy,
    timeout: Duration,
}

impl WorkerDispatcher {
    pub fn new() -> Self {
        Self {
            workers: HashMap::new(),
            breakers: HashMap::new(),
            shell_policy: ShellPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_shell_policy(mut self, policy: ShellPolicy) -> Self {
        self.shell_policy = policy;
        self
    }

    /// Register a worker under its own id, replacing any previous one
    pub fn register(&mut self, worker: Arc<dyn Worker>) {
        let id = worker.id();
        self.breakers.entry(id).or_default();
        self.workers.insert(id, worker);
    }

    pub fn with_worker(mut self, worker: Arc<dyn Worker>) -> Self {
        self.register(worker);
        self
    }

    pub fn is_registered(&self, id: WorkerId) -> bool {
        self.workers.contains_key(&id)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn shell_policy(&self) -> &ShellPolicy {
        &self.shell_policy
    }

    /// Invoke one worker
    pub async fn invoke(&self, request: &WorkerRequest) -> Result<WorkerResult> {
        let id = request.worker_id;
        let worker = self.workers.get(&id).ok_or(OrcaError::UnknownWorker(id))?;

        if let Some(breaker) = self.breakers.get(&id) {
            if !breaker.can_execute() {
                return Err(OrcaError::CircuitOpen {
                    worker: id,
                    retry_in_ms: breaker.retry_in_ms(),
                });
            }
        }

        request.capabilities.check_grant(id)?;

        tracing::debug!(
            worker = %id,
            task_id = %request.task_id,
            focus = %request.focus,
            "dispatching"
        );

        let outcome = match tokio::time::timeout(self.timeout, worker.invoke(request)).await {
            Ok(Ok(response)) => response.into_result(id),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(OrcaError::Timeout {
                worker: id,
                secs: self.timeout.as_secs(),
            }),
        };

        let result = match outcome {
            Ok(result) => {
                self.record(id, true);
                result
            }
            Err(e) => {
                if e.is_transport() {
                    self.record(id, false);
                    tracing::warn!(worker = %id, task_id = %request.task_id, error = %e, "invocation failed");
                }
                return Err(e);
            }
        };

        self.shell_policy
            .check_actions(id, &request.capabilities, &result.actions)?;

        Ok(result)
    }

    /// Dispatch independent sub-requests in parallel
    ///
    /// Refused outright unless the declared file sets are pairwise disjoint
    /// and no sub-request feeds a gate. Results come back in input order.
    pub async fn dispatch_independent(
        &self,
        sub_requests: &[SubRequest],
    ) -> Result<Vec<Result<WorkerResult>>> {
        let mut seen: HashSet<&str> = HashSet::new();
        for sub in sub_requests {
            if let Some(gate) = &sub.gate {
                return Err(OrcaError::ConflictingSubRequests(format!(
                    "{} contends for {}",
                    sub.request.worker_id, gate
                )));
            }
            for path in &sub.touches {
                if !seen.insert(path.as_str()) {
                    return Err(OrcaError::ConflictingSubRequests(format!(
                        "{} is touched by more than one sub-request",
                        path
                    )));
                }
            }
        }

        tracing::info!(count = sub_requests.len(), "dispatching independent sub-requests");
        Ok(join_all(sub_requests.iter().map(|sub| self.invoke(&sub.request))).await)
    }

    fn record(&self, id: WorkerId, success: bool) {
        if let Some(breaker) = self.breakers.get(&id) {
            if breaker.record(success) {
                tracing::warn!(worker = %id, failures = breaker.failure_count(), "circuit opened");
            }
        }
    }
}

impl Default for WorkerDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, CapabilitySet};
    use crate::protocol::{WorkerAction, WorkerResponse};
    use crate::worker::{ScriptedReply, ScriptedWorker};
    use orca_core::ProgressReport;

    fn ok_response(output: &str) -> WorkerResponse {
        WorkerResponse::new(
            output,
            ProgressReport {
                completed: output.to_string(),
                blockers: "None".to_string(),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_unknown_worker() {
        let dispatcher = WorkerDispatcher::new();
        let request = WorkerRequest::new(WorkerId::Planner, "t1");
        assert!(matches!(
            dispatcher.invoke(&request).await,
            Err(OrcaError::UnknownWorker(WorkerId::Planner))
        ));
    }

    #[tokio::test]
    async fn test_grant_checked_before_invocation() {
        let planner = Arc::new(ScriptedWorker::repeating(WorkerId::Planner, ok_response("plan")));
        let dispatcher = WorkerDispatcher::new().with_worker(planner.clone());

        let request = WorkerRequest::new(WorkerId::Planner, "t1")
            .with_capabilities(CapabilitySet::new(&[Capability::WriteFiles]));
        assert!(matches!(
            dispatcher.invoke(&request).await,
            Err(OrcaError::CapabilityDenied { .. })
        ));
        assert!(planner.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_transport_failure() {
        let slow = ScriptedWorker::new(
            WorkerId::Tester,
            vec![ScriptedReply::Delay {
                millis: 500,
                response: ok_response("late"),
            }],
        );
        let dispatcher = WorkerDispatcher::new()
            .with_timeout(Duration::from_millis(50))
            .with_worker(Arc::new(slow));

        let err = dispatcher
            .invoke(&WorkerRequest::new(WorkerId::Tester, "t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrcaError::Timeout { .. }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_reported_action_outside_grant() {
        let reviewer = ScriptedWorker::repeating(
            WorkerId::Reviewer,
            ok_response("reviewed").with_action(WorkerAction::Write {
                path: "src/lib.rs".to_string(),
            }),
        );
        let dispatcher = WorkerDispatcher::new().with_worker(Arc::new(reviewer));

        assert!(matches!(
            dispatcher
                .invoke(&WorkerRequest::new(WorkerId::Reviewer, "t1"))
                .await,
            Err(OrcaError::CapabilityViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_circuit_opens_after_repeated_failures() {
        let flaky = ScriptedWorker::new(
            WorkerId::Implementer,
            (0..5).map(|_| ScriptedReply::Fail {
                message: "connection refused".to_string(),
            }),
        );
        let dispatcher = WorkerDispatcher::new().with_worker(Arc::new(flaky));
        let request = WorkerRequest::new(WorkerId::Implementer, "t1");

        for _ in 0..3 {
            assert!(matches!(
                dispatcher.invoke(&request).await,
                Err(OrcaError::Transport { .. })
            ));
        }
        assert!(matches!(
            dispatcher.invoke(&request).await,
            Err(OrcaError::CircuitOpen { .. })
        ));
    }

    #[tokio::test]
    async fn test_parallel_dispatch_requires_disjoint_files() {
        let researcher = ScriptedWorker::repeating(WorkerId::Researcher, ok_response("notes"));
        let dispatcher = WorkerDispatcher::new().with_worker(Arc::new(researcher));

        let mut first = SubRequest::read_only(WorkerRequest::new(WorkerId::Researcher, "t1"));
        first.touches = vec!["docs/a.md".to_string()];
        let mut second = SubRequest::read_only(WorkerRequest::new(WorkerId::Researcher, "t1"));
        second.touches = vec!["docs/a.md".to_string()];

        assert!(matches!(
            dispatcher.dispatch_independent(&[first.clone(), second]).await,
            Err(OrcaError::ConflictingSubRequests(_))
        ));

        let mut gated = SubRequest::read_only(WorkerRequest::new(WorkerId::Researcher, "t1"));
        gated.gate = Some("gate2".to_string());
        assert!(dispatcher
            .dispatch_independent(&[gated])
            .await
            .is_err());

        let third = SubRequest::read_only(WorkerRequest::new(WorkerId::Researcher, "t1"));
        let results = dispatcher.dispatch_independent(&[first, third]).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_ok()));
    }
}
