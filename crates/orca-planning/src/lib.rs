//! Orca Planning - complexity scoring and tiered specifications
//!
//! This crate turns a request's seven complexity factors into a workflow
//! tier, and the tier into a specification of matching depth: none for
//! simple work, four sections for medium work, the full set for complex
//! work.

pub mod scoring;
pub mod spec;

pub use scoring::{ComplexityScore, ComplexityScorer};
pub use spec::{PlanPhase, SectionKind, SpecBuilder, SpecSection, Specification};
