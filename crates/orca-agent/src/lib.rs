//! # orca-agent
//!
//! Worker invocation for Orca orchestration.
//!
//! Workers are stateless black boxes. Each call carries the full TODO
//! snapshot, a focus pointer and a task payload; each answer must carry a
//! progress report. This crate owns everything at that boundary:
//!
//! - The wire protocol and result validation
//! - Transports (scripted, subprocess, HTTP)
//! - Capability grants and the shell-command policy
//! - Per-worker circuit breakers and invocation timeouts
//! - Parallel dispatch of independent sub-requests

mod capability;
mod circuit_breaker;
mod dispatcher;
mod protocol;
mod worker;

pub use capability::{Capability, CapabilitySet, ShellPolicy, ShellVerdict};
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use dispatcher::{SubRequest, WorkerDispatcher};
pub use protocol::{WorkerAction, WorkerRequest, WorkerResponse, WorkerResult};
pub use worker::{CommandWorker, HttpWorker, ScriptedReply, ScriptedWorker, Worker};
