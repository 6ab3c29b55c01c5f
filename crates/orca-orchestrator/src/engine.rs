//! Workflow engine - drives a task through the five steps
//!
//! The engine owns no per-task state. Each run creates a session holding
//! the task, its TODO store and the state machine, then loops:
//! perform the next action, feed the outcome back as an event, queue the
//! actions the machine returns. Within a task invocations are strictly
//! sequential; `run_many` runs separate tasks concurrently.

use std::collections::{BTreeSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use orca_agent::{ShellPolicy, SubRequest, WorkerDispatcher, WorkerRequest, WorkerResult};
use orca_core::{
    Mutation, OrcaConfig, OrcaError, Result, TaskStatus, TodoId, TodoItem, TodoStatus, WorkerId,
    WorkflowConfig, WorkflowStep,
};
use orca_metrics::{GateEvent, InvocationOutcome, InvocationRecord, MetricsCollector};
use orca_validation::{
    CommandQualityChecks, Evidence, GateId, GateReport, GateValidator, QualityChecks,
    RegexBannedPatterns,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::context::{ContextInjector, Invocation, PriorOutput};
use crate::escalation::{EscalationReason, EscalationReport};
use crate::routing::RoutingTable;
use crate::state_machine::{Action, Event, MachineConfig, WorkflowMachine};
use crate::task::{Task, TaskRequest};
use crate::todo::TodoStore;

/// Characters of each prior output repeated in later briefs
const MAX_PRIOR_OUTPUT_CHARS: usize = 4000;

/// Final state of one task run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task: Task,
    /// TODO list at the end of the run
    pub todos: Vec<TodoItem>,
    /// Every gate decision, in order
    pub gate_reports: Vec<GateReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation: Option<EscalationReport>,
    /// Steps entered, in order, repeats included
    pub visited: Vec<WorkflowStep>,
    /// Dispatch attempts, retries included
    pub invocations: u32,
}

impl TaskOutcome {
    pub fn status(&self) -> TaskStatus {
        self.task.status
    }

    pub fn is_complete(&self) -> bool {
        self.task.status == TaskStatus::Complete
    }
}

/// Drives tasks from request to completion or escalation
pub struct WorkflowEngine {
    config: WorkflowConfig,
    dispatcher: WorkerDispatcher,
    validator: GateValidator,
    quality: Option<Arc<dyn QualityChecks>>,
    metrics: Option<Arc<MetricsCollector>>,
    routing: RoutingTable,
    injector: ContextInjector,
}

impl WorkflowEngine {
    /// Create an engine; the dispatcher's timeout is set from the config
    pub fn new(config: WorkflowConfig, dispatcher: WorkerDispatcher) -> Self {
        let timeout = Duration::from_secs(config.invocation_timeout_secs);
        Self {
            config,
            dispatcher: dispatcher.with_timeout(timeout),
            validator: GateValidator::new(),
            quality: None,
            metrics: None,
            routing: RoutingTable::new(),
            injector: ContextInjector::new().with_max_prior_chars(MAX_PRIOR_OUTPUT_CHARS),
        }
    }

    /// Wire everything a repository config describes
    ///
    /// Banned patterns feed the validator, the shell policy goes to the
    /// dispatcher and the quality commands run in `repo_root`.
    pub fn from_config(
        config: &OrcaConfig,
        repo_root: &Path,
        dispatcher: WorkerDispatcher,
    ) -> Result<Self> {
        config.workflow.validate()?;
        let banned = RegexBannedPatterns::from_config(&config.banned_patterns)?;
        let dispatcher = dispatcher.with_shell_policy(ShellPolicy::from_config(&config.shell));
        let quality = CommandQualityChecks::new(repo_root, config.quality.commands.clone());

        Ok(Self::new(config.workflow.clone(), dispatcher)
            .with_validator(GateValidator::new().with_banned_patterns(Arc::new(banned)))
            .with_quality_checks(Arc::new(quality)))
    }

    pub fn with_validator(mut self, validator: GateValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Static checks run before Gate 2; without any, the checks pass
    pub fn with_quality_checks(mut self, checks: Arc<dyn QualityChecks>) -> Self {
        self.quality = Some(checks);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_routing(mut self, routing: RoutingTable) -> Self {
        self.routing = routing;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run one task to completion or escalation
    ///
    /// Returns `Err` only for invalid input; every other failure ends in
    /// `TaskStatus::Escalated` with a report.
    pub async fn run(&self, request: TaskRequest) -> Result<TaskOutcome> {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// Run one task, stopping when `cancel` fires
    pub async fn run_with_cancel(
        &self,
        request: TaskRequest,
        cancel: CancellationToken,
    ) -> Result<TaskOutcome> {
        let task = Task::from_request(&request)?;
        info!(
            task_id = %task.id,
            kind = %task.kind,
            score = %task.score,
            "starting task"
        );
        let session = Session::new(self, task, request, cancel);
        Ok(session.drive().await)
    }

    /// Run independent tasks concurrently, each with its own TODO store
    pub async fn run_many(&self, requests: Vec<TaskRequest>) -> Vec<Result<TaskOutcome>> {
        info!(count = requests.len(), "running tasks concurrently");
        join_all(requests.into_iter().map(|request| self.run(request))).await
    }
}

/// One worker call as the session sees it
struct Call {
    worker: WorkerId,
    step: WorkflowStep,
    iteration: u32,
    rejection: Vec<String>,
    instruction: String,
}

/// Per-task state for one run
struct Session<'a> {
    engine: &'a WorkflowEngine,
    task: Task,
    research: Vec<String>,
    todos: TodoStore,
    machine: WorkflowMachine,
    prior_outputs: Vec<PriorOutput>,
    gate_reports: Vec<GateReport>,
    escalation: Option<EscalationReport>,
    invocations: u32,
    cancel: CancellationToken,
}

impl<'a> Session<'a> {
    fn new(
        engine: &'a WorkflowEngine,
        task: Task,
        request: TaskRequest,
        cancel: CancellationToken,
    ) -> Self {
        let skip_gate1 = engine
            .config
            .gate1_skip
            .permits_skip(task.tier, request.trivial);
        let machine = WorkflowMachine::new(MachineConfig {
            kind: task.kind,
            skip_gate1,
            max_review_iterations: engine.config.max_review_iterations,
            max_gate_attempts: engine.config.max_gate_attempts,
        });

        let mut todos = TodoStore::new();
        todos.seed(&WorkflowStep::ALL);

        Self {
            engine,
            task,
            research: request.research,
            todos,
            machine,
            prior_outputs: Vec::new(),
            gate_reports: Vec::new(),
            escalation: None,
            invocations: 0,
            cancel,
        }
    }

    async fn drive(mut self) -> TaskOutcome {
        let mut queue: VecDeque<Action> = self.machine.start().into();

        while let Some(action) = queue.pop_front() {
            let finishing = matches!(action, Action::Complete { .. } | Action::Escalate { .. });
            let event = if self.cancel.is_cancelled() && !finishing {
                Some(self.cancelled_event())
            } else {
                self.perform(action).await
            };

            if let Some(event) = event {
                debug!(task_id = %self.task.id, ?event, "applying event");
                let actions = self.machine.apply(event);
                if self.machine.is_terminal() {
                    queue.clear();
                }
                queue.extend(actions);
            }
            if !self.machine.is_terminal() {
                self.task.status = self.machine.status();
            }
        }

        self.task.status = self.machine.status();
        TaskOutcome {
            todos: self.todos.snapshot(),
            gate_reports: self.gate_reports,
            escalation: self.escalation,
            visited: self.machine.visited().to_vec(),
            invocations: self.invocations,
            task: self.task,
        }
    }

    fn cancelled_event(&self) -> Event {
        let step = self
            .machine
            .current_step()
            .unwrap_or(WorkflowStep::UnderstandAndSpec);
        info!(task_id = %self.task.id, %step, "task cancelled");
        Event::Abort {
            reason: EscalationReason::Cancelled { step },
        }
    }

    async fn perform(&mut self, action: Action) -> Option<Event> {
        match action {
            Action::EnterStep(step) => {
                self.enter_step(step);
                None
            }
            Action::SkipStep(step) => {
                self.skip_step(step);
                None
            }
            Action::BuildSpec => Some(self.build_spec().await),
            Action::Verify => Some(self.verify().await),
            Action::Plan { attempt, rejection } => Some(self.plan(attempt, rejection).await),
            Action::Implement {
                iteration,
                feedback,
            } => Some(self.implement(iteration, feedback).await),
            Action::RunQualityChecks => Some(self.quality_checks().await),
            Action::CollectEvidence { attempt, rejection } => {
                Some(self.collect_evidence(attempt, rejection).await)
            }
            Action::Complete { summary } => {
                self.complete(summary);
                None
            }
            Action::Escalate { reason } => {
                self.escalate(reason);
                None
            }
        }
    }

    // ========================================================================
    // Steps
    // ========================================================================

    async fn build_spec(&mut self) -> Event {
        let sections = self.task.build_spec().map(|spec| spec.sections.len());
        if let Some(sections) = sections {
            info!(task_id = %self.task.id, sections, "specification ready");
        } else {
            info!(task_id = %self.task.id, tier = %self.task.tier, "no specification needed");
        }

        if !self.research.is_empty() {
            self.research_fan_out().await;
            if self.cancel.is_cancelled() {
                return self.cancelled_event();
            }
        }
        Event::SpecReady
    }

    /// Researchers run in parallel; their outputs only feed later briefs
    async fn research_fan_out(&mut self) {
        let step = WorkflowStep::UnderstandAndSpec;
        let route = self.route(step);
        let calls: Vec<Call> = self
            .research
            .iter()
            .map(|topic| Call {
                worker: route.producer,
                step,
                iteration: 1,
                rejection: Vec::new(),
                instruction: format!("Research: {}", topic),
            })
            .collect();
        let mut subs = Vec::with_capacity(calls.len());
        for call in &calls {
            match self.request_for(call) {
                Ok(request) => subs.push(SubRequest::read_only(request)),
                Err(e) => {
                    warn!(task_id = %self.task.id, error = %e, "could not build research context");
                    return;
                }
            }
        }

        let started_at = Utc::now();
        let clock = Instant::now();
        self.invocations += subs.len() as u32;
        let results = match self.engine.dispatcher.dispatch_independent(&subs).await {
            Ok(results) => results,
            Err(e) => {
                warn!(task_id = %self.task.id, error = %e, "research fan-out refused");
                return;
            }
        };

        // Results landing after a cancel are recorded, never used
        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            warn!(task_id = %self.task.id, count = results.len(), "discarding research after cancellation");
        }
        for (call, result) in calls.iter().zip(results) {
            let outcome = match &result {
                _ if cancelled => InvocationOutcome::Discarded,
                Ok(_) => InvocationOutcome::Success,
                Err(e) => InvocationOutcome::from_error(e),
            };
            self.record(call, 1, started_at, clock, outcome).await;
            if cancelled {
                continue;
            }
            match result {
                Ok(result) => self.prior_outputs.push(PriorOutput {
                    worker: result.worker,
                    step,
                    output: result.output,
                }),
                Err(e) => {
                    warn!(task_id = %self.task.id, topic = %call.instruction, error = %e, "research failed")
                }
            }
        }
    }

    async fn verify(&mut self) -> Event {
        let step = WorkflowStep::Verify;
        let call = Call {
            worker: self.route(step).producer,
            step,
            iteration: 1,
            rejection: Vec::new(),
            instruction: "Reproduce or confirm the current behavior before any change is planned."
                .to_string(),
        };
        match self.invoke(call).await {
            Ok(result) => {
                self.absorb(step, result);
                Event::Verified
            }
            Err(reason) => Event::Abort { reason },
        }
    }

    async fn plan(&mut self, attempt: u32, rejection: Vec<String>) -> Event {
        let step = WorkflowStep::PlanAndApprove;
        let required = GateValidator::required_kinds(
            GateId::Plan,
            self.task.tier,
            self.task.requires_external_verification,
        );
        let call = Call {
            worker: self.route(step).producer,
            step,
            iteration: attempt,
            rejection,
            instruction: format!(
                "Produce an implementation plan. Gate 1 requires evidence of: {}.",
                join_kinds(&required)
            ),
        };
        let result = match self.invoke(call).await {
            Ok(result) => result,
            Err(reason) => return Event::Abort { reason },
        };

        let evidence = Evidence::new(result.evidence.clone())
            .with_subject(result.output.clone())
            .with_external_verification(self.task.requires_external_verification);
        self.absorb(step, result);
        self.decide(GateId::Plan, &evidence).await
    }

    async fn implement(&mut self, iteration: u32, feedback: Vec<String>) -> Event {
        let step = WorkflowStep::ImplementAndReview;
        let route = self.route(step);
        info!(
            task_id = %self.task.id,
            iteration,
            max = self.engine.config.max_review_iterations,
            "implementation pass"
        );

        let call = Call {
            worker: route.producer,
            step,
            iteration,
            rejection: feedback,
            instruction: "Implement the approved plan. Resolve every listed issue.".to_string(),
        };
        let implementation = match self.invoke(call).await {
            Ok(result) => result,
            Err(reason) => return Event::Abort { reason },
        };
        let implementation_output = implementation.output.clone();

        let issues = match route.reviewer {
            Some(reviewer) => {
                let mut issues = implementation.report.blocking_issues();
                self.absorb(step, implementation);
                let call = Call {
                    worker: reviewer,
                    step,
                    iteration,
                    rejection: Vec::new(),
                    instruction: "Review the latest implementation output. List each blocking issue on its own line under BLOCKERS, or 'None'."
                        .to_string(),
                };
                let review = match self.invoke(call).await {
                    Ok(result) => result,
                    Err(reason) => return Event::Abort { reason },
                };
                for issue in self
                    .engine
                    .validator
                    .review_issues(&review.report, &implementation_output)
                {
                    if !issues.contains(&issue) {
                        issues.push(issue);
                    }
                }
                self.absorb(step, review);
                issues
            }
            None => {
                let issues = self
                    .engine
                    .validator
                    .review_issues(&implementation.report, &implementation_output);
                self.absorb(step, implementation);
                issues
            }
        };

        if issues.is_empty() {
            info!(task_id = %self.task.id, iteration, "review passed");
        } else {
            info!(task_id = %self.task.id, iteration, issues = issues.len(), "review found blocking issues");
        }
        Event::Reviewed { issues }
    }

    async fn quality_checks(&mut self) -> Event {
        let report = match &self.engine.quality {
            Some(checks) => checks.run_quality_checks().await,
            None => return Event::QualityChecked { errors: Vec::new() },
        };
        if self.cancel.is_cancelled() {
            warn!(task_id = %self.task.id, passed = report.passed, "discarding quality report after cancellation");
            return self.cancelled_event();
        }

        let errors = if report.passed {
            Vec::new()
        } else if report.errors.is_empty() {
            vec!["quality checks failed without output".to_string()]
        } else {
            report.errors
        };

        if errors.is_empty() {
            info!(task_id = %self.task.id, "quality checks passed");
        } else {
            warn!(task_id = %self.task.id, errors = errors.len(), "quality checks failed");
        }
        Event::QualityChecked { errors }
    }

    async fn collect_evidence(&mut self, attempt: u32, rejection: Vec<String>) -> Event {
        let step = WorkflowStep::ValidateAndComplete;
        let required = GateValidator::required_kinds(
            GateId::Completion,
            self.task.tier,
            self.task.requires_external_verification,
        );
        let call = Call {
            worker: self.route(step).producer,
            step,
            iteration: attempt,
            rejection,
            instruction: format!(
                "Collect completion evidence. Gate 2 requires: {}.",
                join_kinds(&required)
            ),
        };
        let result = match self.invoke(call).await {
            Ok(result) => result,
            Err(reason) => return Event::Abort { reason },
        };

        let evidence = Evidence::new(result.evidence.clone())
            .with_external_verification(self.task.requires_external_verification);
        self.absorb(step, result);
        self.decide(GateId::Completion, &evidence).await
    }

    fn complete(&mut self, summary: String) {
        if let Some(id) = self.todos.step_item(WorkflowStep::ValidateAndComplete) {
            self.apply_internal(&[Mutation::SetStatus {
                id,
                status: TodoStatus::Completed,
            }]);
        }
        self.task.current_step = None;
        info!(task_id = %self.task.id, %summary, "task complete");
    }

    fn escalate(&mut self, reason: EscalationReason) {
        let step = self.task.current_step;
        warn!(
            task_id = %self.task.id,
            reason = reason.label(),
            step = ?step,
            "task escalated: {}",
            reason
        );

        if let Some(id) = step.and_then(|s| self.todos.step_item(s)) {
            self.apply_internal(&[Mutation::Annotate {
                id,
                note: format!("escalated: {}", reason),
            }]);
        }
        self.escalation = Some(EscalationReport::new(
            self.task.id.clone(),
            &self.task.description,
            reason,
        ));
    }

    // ========================================================================
    // TODO bookkeeping
    // ========================================================================

    /// Entering a step completes earlier step items and reopens later ones
    fn enter_step(&mut self, step: WorkflowStep) {
        info!(task_id = %self.task.id, %step, "entering step");
        self.task.current_step = Some(step);

        let mut mutations = Vec::new();
        for other in WorkflowStep::ALL {
            let Some(id) = self.todos.step_item(other) else {
                continue;
            };
            let Some(item) = self.todos.get(id) else {
                continue;
            };
            let target = if other == step {
                TodoStatus::InProgress
            } else if other < step {
                TodoStatus::Completed
            } else if item.status == TodoStatus::InProgress {
                TodoStatus::Pending
            } else {
                continue;
            };
            if item.status != target {
                mutations.push(Mutation::SetStatus { id, status: target });
            }
        }
        self.apply_internal(&mutations);
    }

    fn skip_step(&mut self, step: WorkflowStep) {
        info!(task_id = %self.task.id, %step, "skipping step");
        if let Some(id) = self.todos.step_item(step) {
            self.apply_internal(&[
                Mutation::SetStatus {
                    id,
                    status: TodoStatus::Completed,
                },
                Mutation::Annotate {
                    id,
                    note: "skipped".to_string(),
                },
            ]);
        }
    }

    /// Fold a worker result into task state
    ///
    /// Recommended mutations pass review first. Blockers become a note on
    /// the focused item. The output joins the prior outputs.
    fn absorb(&mut self, step: WorkflowStep, result: WorkerResult) {
        let focus = self.focus_ids(step);
        let review = self
            .todos
            .review(&result.report.recommended_todo_changes, &focus);
        for (mutation, reason) in &review.rejected {
            warn!(
                task_id = %self.task.id,
                worker = %result.worker,
                ?mutation,
                %reason,
                "ignoring recommended mutation"
            );
        }
        self.apply_internal(&review.accepted);

        let blockers = result.report.blocking_issues();
        if !blockers.is_empty() {
            let note = blockers.join("; ");
            let notes: Vec<Mutation> = focus
                .iter()
                .map(|id| Mutation::Annotate {
                    id: *id,
                    note: note.clone(),
                })
                .collect();
            self.apply_internal(&notes);
        }

        self.prior_outputs.push(PriorOutput {
            worker: result.worker,
            step,
            output: result.output,
        });
    }

    fn apply_internal(&mut self, mutations: &[Mutation]) {
        if mutations.is_empty() {
            return;
        }
        if let Err(e) = self.todos.apply(mutations) {
            warn!(task_id = %self.task.id, error = %e, "todo batch rejected");
        }
    }

    fn focus_ids(&self, step: WorkflowStep) -> BTreeSet<TodoId> {
        self.todos.step_item(step).into_iter().collect()
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    fn route(&self, step: WorkflowStep) -> crate::routing::Route {
        self.engine
            .routing
            .route(step, self.task.tier, self.task.kind)
    }

    fn request_for(&self, call: &Call) -> Result<WorkerRequest> {
        let snapshot = self.todos.snapshot();
        let focus: Vec<TodoItem> = self
            .focus_ids(call.step)
            .iter()
            .filter_map(|id| self.todos.get(*id).cloned())
            .collect();
        self.engine.injector.build(
            &self.task,
            &snapshot,
            &self.prior_outputs,
            &Invocation {
                worker: call.worker,
                step: call.step,
                focus: &focus,
                iteration: call.iteration,
                rejection_issues: &call.rejection,
                instruction: &call.instruction,
            },
        )
    }

    /// Invoke with bounded retry on transport failures
    ///
    /// Capability errors are never retried. An invocation already in
    /// flight when the task is cancelled runs to completion; its result is
    /// recorded as discarded and dropped.
    async fn invoke(&mut self, call: Call) -> std::result::Result<WorkerResult, EscalationReason> {
        let engine = self.engine;
        let attempts = 1 + engine.config.max_transport_retries;
        let mut last_error = String::new();

        let request = match self.request_for(&call) {
            Ok(request) => request,
            Err(e) => {
                return Err(EscalationReason::TransportFailure {
                    worker: call.worker,
                    attempts: 0,
                    error: format!("could not build request context: {}", e),
                })
            }
        };

        for attempt in 1..=attempts {
            if self.cancel.is_cancelled() {
                return Err(EscalationReason::Cancelled { step: call.step });
            }
            let started_at = Utc::now();
            let clock = Instant::now();
            self.invocations += 1;
            info!(
                task_id = %self.task.id,
                worker = %call.worker,
                step = %call.step,
                attempt,
                "invoking worker"
            );

            let outcome = engine.dispatcher.invoke(&request).await;

            if self.cancel.is_cancelled() {
                warn!(
                    task_id = %self.task.id,
                    worker = %call.worker,
                    succeeded = outcome.is_ok(),
                    "discarding invocation after cancellation"
                );
                self.record(&call, attempt, started_at, clock, InvocationOutcome::Discarded)
                    .await;
                return Err(EscalationReason::Cancelled { step: call.step });
            }

            match outcome {
                Ok(result) => {
                    self.record(&call, attempt, started_at, clock, InvocationOutcome::Success)
                        .await;
                    return Ok(result);
                }
                Err(e) => {
                    self.record(&call, attempt, started_at, clock, InvocationOutcome::from_error(&e))
                        .await;
                    match e {
                        OrcaError::CapabilityDenied { worker, capability } => {
                            return Err(EscalationReason::CapabilityViolation {
                                worker,
                                detail: format!("grant requests {} outside its profile", capability),
                            });
                        }
                        OrcaError::CapabilityViolation { worker, detail } => {
                            return Err(EscalationReason::CapabilityViolation { worker, detail });
                        }
                        e if e.is_transport() => {
                            warn!(
                                task_id = %self.task.id,
                                worker = %call.worker,
                                attempt,
                                max_attempts = attempts,
                                error = %e,
                                "transport failure"
                            );
                            last_error = e.to_string();
                        }
                        e => {
                            return Err(EscalationReason::TransportFailure {
                                worker: call.worker,
                                attempts: attempt,
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        Err(EscalationReason::TransportFailure {
            worker: call.worker,
            attempts,
            error: last_error,
        })
    }

    async fn record(
        &self,
        call: &Call,
        attempt: u32,
        started_at: DateTime<Utc>,
        clock: Instant,
        outcome: InvocationOutcome,
    ) {
        if let Some(metrics) = &self.engine.metrics {
            metrics
                .record_invocation(InvocationRecord {
                    task_id: self.task.id.clone(),
                    worker: call.worker,
                    step: call.step,
                    attempt,
                    started_at,
                    duration_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
                    outcome,
                })
                .await;
        }
    }

    async fn decide(&mut self, gate: GateId, evidence: &Evidence) -> Event {
        let decision = self.engine.validator.evaluate(gate, self.task.tier, evidence);
        let report = decision.report();
        info!(
            task_id = %self.task.id,
            %gate,
            status = %report.status,
            issues = report.outstanding_issues.len(),
            "gate decided"
        );

        if let Some(metrics) = &self.engine.metrics {
            metrics
                .record_gate(GateEvent {
                    task_id: self.task.id.clone(),
                    gate: gate.to_string(),
                    approved: decision.is_approved(),
                    issue_count: decision.issues().len(),
                    at: Utc::now(),
                })
                .await;
        }

        self.gate_reports.push(report);
        Event::GateDecided {
            gate,
            issues: decision.issues().to_vec(),
        }
    }
}

fn join_kinds(kinds: &[orca_core::EvidenceKind]) -> String {
    kinds
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
