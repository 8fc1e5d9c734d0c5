// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::core::event::state::StateEvent;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};

/// Receiver of completed matches.
///
/// Called synchronously, once per match, in emission order. The event is
/// returned to its pool right after the call, so implementations copy what
/// they keep.
pub trait MatchCallback: Debug + Send {
    fn receive(&mut self, event: &StateEvent);
}

/// Keeps a copy of every match; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CollectingMatchCallback {
    pub events: Arc<Mutex<Vec<StateEvent>>>,
}

impl CollectingMatchCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take every match collected so far.
    pub fn take(&self) -> Vec<StateEvent> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StateEvent>> {
        // A panicking receiver cannot leave the Vec half-written
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MatchCallback for CollectingMatchCallback {
    fn receive(&mut self, event: &StateEvent) {
        self.lock().push(event.clone());
    }
}

/// LogMatchCallback - logs each match as JSON at `info`
#[derive(Debug, Clone)]
pub struct LogMatchCallback {
    prefix: String,
}

impl Default for LogMatchCallback {
    fn default() -> Self {
        Self::new("[MATCH]")
    }
}

impl LogMatchCallback {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl MatchCallback for LogMatchCallback {
    fn receive(&mut self, event: &StateEvent) {
        match serde_json::to_string(event) {
            Ok(json) => log::info!("{} {}", self.prefix, json),
            Err(e) => log::warn!("{} match {} could not be serialized: {}", self.prefix, event.id, e),
        }
    }
}
