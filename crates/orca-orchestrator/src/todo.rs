//! Per-task TODO store
//!
//! The orchestrator is the only writer. Workers recommend mutations in
//! their progress reports; [`TodoStore::review`] decides which ones are
//! applied and [`TodoStore::apply`] applies a batch atomically.

use std::collections::{BTreeSet, HashMap};

use orca_core::{Mutation, OrcaError, Result, TodoId, TodoItem, TodoStatus, WorkflowStep};
use tracing::{debug, warn};

/// Outcome of reviewing a worker's recommended mutations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationReview {
    pub accepted: Vec<Mutation>,
    /// Rejected mutations with the reason each was refused
    pub rejected: Vec<(Mutation, String)>,
}

/// Ordered TODO list owned by one task
#[derive(Debug, Clone, Default)]
pub struct TodoStore {
    items: Vec<TodoItem>,
    next_id: TodoId,
    /// Item created for each workflow step
    step_items: HashMap<WorkflowStep, TodoId>,
}

impl TodoStore {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
            step_items: HashMap::new(),
        }
    }

    /// Seed one item per workflow step, in step order
    pub fn seed(&mut self, steps: &[WorkflowStep]) {
        for step in steps {
            if self.step_items.contains_key(step) {
                continue;
            }
            let id = self.insert(step.label().to_string());
            self.step_items.insert(*step, id);
        }
    }

    pub fn step_item(&self, step: WorkflowStep) -> Option<TodoId> {
        self.step_items.get(&step).copied()
    }

    pub fn is_step_item(&self, id: TodoId) -> bool {
        self.step_items.values().any(|v| *v == id)
    }

    pub fn get(&self, id: TodoId) -> Option<&TodoItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copy of the list handed to workers
    pub fn snapshot(&self) -> Vec<TodoItem> {
        self.items.clone()
    }

    /// Apply a batch of mutations; all or nothing
    ///
    /// Returns the list after the batch. On error the store is unchanged.
    pub fn apply(&mut self, mutations: &[Mutation]) -> Result<Vec<TodoItem>> {
        let mut draft = self.clone();
        for mutation in mutations {
            draft.apply_one(mutation)?;
        }
        *self = draft;
        debug!(count = mutations.len(), items = self.items.len(), "applied todo mutations");
        Ok(self.snapshot())
    }

    /// Split recommended mutations into accepted and rejected
    ///
    /// `focus` is the set of items the worker was asked to address; status
    /// changes outside it are refused. Step items cannot be removed.
    pub fn review(&self, mutations: &[Mutation], focus: &BTreeSet<TodoId>) -> MutationReview {
        let mut review = MutationReview::default();
        for mutation in mutations {
            match self.refusal(mutation, focus) {
                Some(reason) => {
                    warn!(?mutation, %reason, "rejected recommended todo mutation");
                    review.rejected.push((mutation.clone(), reason));
                }
                None => review.accepted.push(mutation.clone()),
            }
        }
        review
    }

    fn refusal(&self, mutation: &Mutation, focus: &BTreeSet<TodoId>) -> Option<String> {
        if let Some(id) = mutation.target() {
            if self.get(id).is_none() {
                return Some(format!("unknown item #{}", id));
            }
        }
        match mutation {
            Mutation::Add { description } if description.trim().is_empty() => {
                Some("empty description".to_string())
            }
            Mutation::SetStatus { id, .. } if !focus.contains(id) => {
                Some(format!("item #{} is outside the current focus", id))
            }
            Mutation::Remove { id } if self.is_step_item(*id) => {
                Some(format!("item #{} tracks a workflow step", id))
            }
            _ => None,
        }
    }

    fn insert(&mut self, description: String) -> TodoId {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(TodoItem {
            id,
            description,
            status: TodoStatus::Pending,
            note: None,
        });
        id
    }

    fn position(&self, id: TodoId) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.id == id)
            .ok_or(OrcaError::TodoItemNotFound(id))
    }

    fn apply_one(&mut self, mutation: &Mutation) -> Result<()> {
        match mutation {
            Mutation::Add { description } => {
                let description = description.trim();
                if description.is_empty() {
                    return Err(OrcaError::InvalidMutation(
                        "add requires a description".to_string(),
                    ));
                }
                self.insert(description.to_string());
            }
            Mutation::SetStatus { id, status } => {
                let idx = self.position(*id)?;
                self.items[idx].status = *status;
            }
            Mutation::Annotate { id, note } => {
                let idx = self.position(*id)?;
                let note = note.trim();
                self.items[idx].note = if note.is_empty() {
                    None
                } else {
                    Some(note.to_string())
                };
            }
            Mutation::Move { id, to_index } => {
                let idx = self.position(*id)?;
                if *to_index >= self.items.len() {
                    return Err(OrcaError::InvalidMutation(format!(
                        "cannot move #{} to index {} of {}",
                        id,
                        to_index,
                        self.items.len()
                    )));
                }
                let item = self.items.remove(idx);
                self.items.insert(*to_index, item);
            }
            Mutation::Remove { id } => {
                let idx = self.position(*id)?;
                self.items.remove(idx);
                self.step_items.retain(|_, v| *v != *id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> TodoStore {
        let mut store = TodoStore::new();
        store.seed(&WorkflowStep::ALL);
        store
    }

    #[test]
    fn test_seed_follows_step_order() {
        let store = seeded();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 5);
        assert_eq!(snapshot[0].description, WorkflowStep::UnderstandAndSpec.label());
        assert_eq!(snapshot[4].description, WorkflowStep::ValidateAndComplete.label());
        assert_eq!(store.step_item(WorkflowStep::Verify), Some(2));
    }

    #[test]
    fn test_apply_batch() {
        let mut store = seeded();
        let items = store
            .apply(&[
                Mutation::Add {
                    description: "Write migration".to_string(),
                },
                Mutation::SetStatus {
                    id: 1,
                    status: TodoStatus::Completed,
                },
                Mutation::Move { id: 6, to_index: 1 },
                Mutation::Annotate {
                    id: 6,
                    note: "needs schema".to_string(),
                },
            ])
            .unwrap();

        assert_eq!(items.len(), 6);
        assert_eq!(items[0].status, TodoStatus::Completed);
        assert_eq!(items[1].id, 6);
        assert_eq!(items[1].note.as_deref(), Some("needs schema"));
    }

    #[test]
    fn test_apply_is_atomic() {
        let mut store = seeded();
        let before = store.snapshot();
        let err = store
            .apply(&[
                Mutation::Add {
                    description: "kept?".to_string(),
                },
                Mutation::SetStatus {
                    id: 99,
                    status: TodoStatus::Completed,
                },
            ])
            .unwrap_err();

        assert!(matches!(err, OrcaError::TodoItemNotFound(99)));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_invalid_move_rejected() {
        let mut store = seeded();
        let err = store
            .apply(&[Mutation::Move { id: 1, to_index: 5 }])
            .unwrap_err();
        assert!(matches!(err, OrcaError::InvalidMutation(_)));
    }

    #[test]
    fn test_new_ids_are_never_reused() {
        let mut store = TodoStore::new();
        store
            .apply(&[Mutation::Add {
                description: "a".to_string(),
            }])
            .unwrap();
        store.apply(&[Mutation::Remove { id: 1 }]).unwrap();
        let items = store
            .apply(&[Mutation::Add {
                description: "b".to_string(),
            }])
            .unwrap();
        assert_eq!(items[0].id, 2);
    }

    #[test]
    fn test_review_filters_mutations() {
        let mut store = seeded();
        store
            .apply(&[Mutation::Add {
                description: "extra".to_string(),
            }])
            .unwrap();
        let focus: BTreeSet<TodoId> = [4].into_iter().collect();

        let review = store.review(
            &[
                Mutation::SetStatus {
                    id: 4,
                    status: TodoStatus::Completed,
                },
                Mutation::SetStatus {
                    id: 5,
                    status: TodoStatus::Completed,
                },
                Mutation::Remove { id: 2 },
                Mutation::Remove { id: 6 },
                Mutation::Annotate {
                    id: 42,
                    note: "ghost".to_string(),
                },
                Mutation::Add {
                    description: "follow-up".to_string(),
                },
            ],
            &focus,
        );

        assert_eq!(review.accepted.len(), 3);
        assert_eq!(review.rejected.len(), 3);
        assert!(review.rejected[0].1.contains("outside the current focus"));
        assert!(review.rejected[1].1.contains("workflow step"));
        assert!(review.rejected[2].1.contains("unknown item"));
    }
}
