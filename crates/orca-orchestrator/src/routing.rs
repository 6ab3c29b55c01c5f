//! Which worker produces (and which reviews) each step

use std::collections::HashMap;

use orca_core::{TaskKind, Tier, WorkerId, WorkflowStep};

/// Workers assigned to one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub producer: WorkerId,
    pub reviewer: Option<WorkerId>,
}

impl Route {
    pub fn new(producer: WorkerId) -> Self {
        Self {
            producer,
            reviewer: None,
        }
    }

    pub fn reviewed_by(mut self, reviewer: WorkerId) -> Self {
        self.reviewer = Some(reviewer);
        self
    }
}

/// Step-to-worker routing, keyed on step, tier and task kind
///
/// Overrides win over the per-step defaults.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    overrides: HashMap<(WorkflowStep, Option<Tier>, Option<TaskKind>), Route>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override a step for every tier and kind
    pub fn with_route(mut self, step: WorkflowStep, route: Route) -> Self {
        self.overrides.insert((step, None, None), route);
        self
    }

    /// Override a step for one tier and kind
    pub fn with_route_for(
        mut self,
        step: WorkflowStep,
        tier: Tier,
        kind: TaskKind,
        route: Route,
    ) -> Self {
        self.overrides.insert((step, Some(tier), Some(kind)), route);
        self
    }

    pub fn route(&self, step: WorkflowStep, tier: Tier, kind: TaskKind) -> Route {
        self.overrides
            .get(&(step, Some(tier), Some(kind)))
            .or_else(|| self.overrides.get(&(step, None, None)))
            .copied()
            .unwrap_or_else(|| Self::default_route(step))
    }

    fn default_route(step: WorkflowStep) -> Route {
        match step {
            WorkflowStep::UnderstandAndSpec => Route::new(WorkerId::Researcher),
            WorkflowStep::Verify => Route::new(WorkerId::Investigator),
            WorkflowStep::PlanAndApprove => Route::new(WorkerId::Planner),
            WorkflowStep::ImplementAndReview => {
                Route::new(WorkerId::Implementer).reviewed_by(WorkerId::Reviewer)
            }
            WorkflowStep::ValidateAndComplete => Route::new(WorkerId::Tester),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routes() {
        let table = RoutingTable::new();
        let route = table.route(WorkflowStep::ImplementAndReview, Tier::Simple, TaskKind::Bug);
        assert_eq!(route.producer, WorkerId::Implementer);
        assert_eq!(route.reviewer, Some(WorkerId::Reviewer));
        assert_eq!(
            table
                .route(WorkflowStep::Verify, Tier::Complex, TaskKind::Investigation)
                .producer,
            WorkerId::Investigator
        );
    }

    #[test]
    fn test_specific_override_beats_general() {
        let table = RoutingTable::new()
            .with_route(WorkflowStep::Verify, Route::new(WorkerId::Tester))
            .with_route_for(
                WorkflowStep::Verify,
                Tier::Complex,
                TaskKind::Bug,
                Route::new(WorkerId::Researcher),
            );

        assert_eq!(
            table.route(WorkflowStep::Verify, Tier::Complex, TaskKind::Bug).producer,
            WorkerId::Researcher
        );
        assert_eq!(
            table.route(WorkflowStep::Verify, Tier::Simple, TaskKind::Bug).producer,
            WorkerId::Tester
        );
    }
}
