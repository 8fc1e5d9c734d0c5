// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/query/input/stream/state/stream_pre_state.rs
// Pending and staging lists of one pattern step

use crate::core::event::state::StateEventId;

/// Partial matches owned by one step.
///
/// * `pending`: matches eligible for the current event, in arrival order.
/// * `staging`: matches handed over during the current pass (new, advancing
///   or re-armed), promoted to `pending` by [`promote_staging`](Self::promote_staging).
///
/// Both lists preserve insertion order. Removal while iterating the pending
/// list goes through [`take_pending`](Self::take_pending) /
/// [`restore_pending`](Self::restore_pending), which swap with a scratch
/// buffer so a pass never allocates once the buffers have grown.
#[derive(Debug, Default)]
pub struct StreamPreState {
    pending: Vec<StateEventId>,
    staging: Vec<StateEventId>,
    scratch: Vec<StateEventId>,
}

impl StreamPreState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[StateEventId] {
        &self.pending
    }

    pub fn staging(&self) -> &[StateEventId] {
        &self.staging
    }

    pub fn stage(&mut self, event: StateEventId) {
        self.staging.push(event);
    }

    pub fn is_staging_empty(&self) -> bool {
        self.staging.is_empty()
    }

    /// Append every staged match to the pending list, keeping order.
    pub fn promote_staging(&mut self) {
        self.pending.append(&mut self.staging);
    }

    /// Detach the pending list for iteration, together with an empty buffer
    /// to collect the survivors into.
    pub fn take_pending(&mut self) -> (Vec<StateEventId>, Vec<StateEventId>) {
        let pending = std::mem::take(&mut self.pending);
        let mut retained = std::mem::take(&mut self.scratch);
        retained.clear();
        (pending, retained)
    }

    /// Reattach after a pass: `retained` becomes the pending list and the
    /// drained `spent` buffer is kept for the next pass.
    pub fn restore_pending(&mut self, retained: Vec<StateEventId>, mut spent: Vec<StateEventId>) {
        spent.clear();
        self.pending = retained;
        self.scratch = spent;
    }

    /// Empty the pending list, yielding its matches for release.
    pub fn drain_pending(&mut self) -> std::vec::Drain<'_, StateEventId> {
        self.pending.drain(..)
    }
}
