//! Optimistic list mutations.
//!
//! A mutation is applied to the visible items before the server answers
//! ([`apply`]) and settled when it does ([`reconcile`]). Both functions are
//! pure and idempotent: running them twice with the same input leaves the
//! items as running them once.

use crate::entity::{Entity, RecordId};

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<T> {
    /// A new record shown under a local placeholder id
    Create { placeholder: T },
    /// An existing record patched in place; `previous` is the rollback snapshot
    Update {
        target_id: RecordId,
        previous: T,
        patched: T,
    },
    /// A record removed from the list; `original_index` and `snapshot`
    /// allow putting it back where it was
    Delete {
        target_id: RecordId,
        original_index: usize,
        snapshot: T,
    },
}

impl<T: Entity> Mutation<T> {
    /// Build a delete mutation for the record with `id`, if it is listed.
    pub fn delete_of(items: &[T], id: &RecordId) -> Option<Self> {
        let index = position(items, id)?;
        Some(Mutation::Delete {
            target_id: id.clone(),
            original_index: index,
            snapshot: items[index].clone(),
        })
    }

    pub fn target_id(&self) -> &RecordId {
        match self {
            Mutation::Create { placeholder } => placeholder.id(),
            Mutation::Update { target_id, .. } | Mutation::Delete { target_id, .. } => target_id,
        }
    }
}

/// Terminal result of the server call behind a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The server accepted the change. Carries the server's entity for
    /// creates and updates; deletes carry `None`.
    Success(Option<T>),
    Failure,
}

fn position<T: Entity>(items: &[T], id: &RecordId) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

/// Apply the optimistic effect of a mutation.
///
/// Creates are prepended (newest first, as the dashboards list them),
/// updates replace the target in place, deletes remove it.
pub fn apply<T: Entity>(items: &[T], mutation: &Mutation<T>) -> Vec<T> {
    let mut next = items.to_vec();
    match mutation {
        Mutation::Create { placeholder } => {
            if position(&next, placeholder.id()).is_none() {
                next.insert(0, placeholder.clone());
            }
        }
        Mutation::Update {
            target_id, patched, ..
        } => {
            if let Some(i) = position(&next, target_id) {
                next[i] = patched.clone();
            }
        }
        Mutation::Delete { target_id, .. } => {
            next.retain(|item| item.id() != target_id);
        }
    }
    next
}

/// Settle a mutation against its outcome.
///
/// - Create + success: the placeholder is replaced by the server entity; if
///   the placeholder is gone (an intervening refresh) the entity is appended
///   unless already present.
/// - Create + failure: the placeholder is removed.
/// - Update + success: the target is replaced by the server entity.
/// - Update + failure: the pre-mutation snapshot is restored.
/// - Delete + success: the target stays removed.
/// - Delete + failure: the snapshot is re-inserted at its original index.
///
/// A success without an entity leaves the optimistic state for the
/// follow-up refresh to resolve.
pub fn reconcile<T: Entity>(items: &[T], mutation: &Mutation<T>, outcome: &Outcome<T>) -> Vec<T> {
    let mut next = items.to_vec();
    match (mutation, outcome) {
        (Mutation::Create { placeholder }, Outcome::Success(Some(server))) => {
            match position(&next, placeholder.id()) {
                Some(i) => {
                    next[i] = server.clone();
                    // The same entity may also have arrived through a refresh.
                    let mut seen = false;
                    next.retain(|item| {
                        if item.id() != server.id() {
                            return true;
                        }
                        let keep = !seen;
                        seen = true;
                        keep
                    });
                }
                None => {
                    if position(&next, server.id()).is_none() {
                        next.push(server.clone());
                    }
                }
            }
        }
        (Mutation::Create { placeholder }, Outcome::Failure) => {
            next.retain(|item| item.id() != placeholder.id());
        }
        (Mutation::Update { target_id, .. }, Outcome::Success(Some(server))) => {
            if let Some(i) = position(&next, target_id) {
                next[i] = server.clone();
            }
        }
        (Mutation::Update {
            target_id,
            previous,
            ..
        }, Outcome::Failure) => {
            if let Some(i) = position(&next, target_id) {
                next[i] = previous.clone();
            }
        }
        (Mutation::Delete { target_id, .. }, Outcome::Success(_)) => {
            next.retain(|item| item.id() != target_id);
        }
        (
            Mutation::Delete {
                target_id,
                original_index,
                snapshot,
            },
            Outcome::Failure,
        ) => {
            if position(&next, target_id).is_none() {
                let index = (*original_index).min(next.len());
                next.insert(index, snapshot.clone());
            }
        }
        (_, Outcome::Success(None)) => {}
    }
    next
}
