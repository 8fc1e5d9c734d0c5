// SPDX-License-Identifier: MIT OR Apache-2.0

//! Partitioned pattern runtime
//!
//! One [`StateStreamRuntime`] per partition key, created from a shared
//! [`PatternChainTemplate`] on first use. Contexts share the template and the
//! flat event pool but nothing else; the per-context mutex is the single-writer
//! point, so different keys progress in parallel.
//!
//! A context whose call fails with a context-fatal error is terminated and
//! removed; the next event for that key starts a fresh context.

use super::pattern_chain_builder::PatternChainTemplate;
use super::state_stream_runtime::{EventPools, StateStreamRuntime};
use crate::core::error::{EventFluxError, EventFluxResult};
use crate::core::event::stream::StreamEvent;
use crate::core::query::output::MatchCallback;
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Builds the match callback for a newly created partition.
pub type CallbackFactory = Arc<dyn Fn(&str) -> Box<dyn MatchCallback> + Send + Sync>;

pub struct PartitionedStateRuntime {
    template: Arc<PatternChainTemplate>,
    pools: EventPools,
    callback_factory: CallbackFactory,
    partitions: DashMap<String, Arc<Mutex<StateStreamRuntime>>>,
}

impl fmt::Debug for PartitionedStateRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionedStateRuntime")
            .field("steps", &self.template.aliases())
            .field("partitions", &self.partitions.len())
            .finish_non_exhaustive()
    }
}

impl PartitionedStateRuntime {
    pub fn new(
        template: Arc<PatternChainTemplate>,
        pools: EventPools,
        callback_factory: CallbackFactory,
    ) -> Self {
        Self {
            template,
            pools,
            callback_factory,
            partitions: DashMap::new(),
        }
    }

    /// Route `event` to the context for `key`, creating it on first use.
    pub fn send(&self, key: &str, event: StreamEvent) -> EventFluxResult<()> {
        let runtime = self.partition(key)?;
        let result = lock(&runtime, key)?.send(event);
        self.terminate_on_fatal(key, result)
    }

    /// Drop the partial matches of one partition.
    pub fn reset_partition(&self, key: &str) -> EventFluxResult<bool> {
        let Some(runtime) = self.partitions.get(key).map(|entry| Arc::clone(entry.value())) else {
            return Ok(false);
        };
        let result = lock(&runtime, key)?.reset();
        self.terminate_on_fatal(key, result).map(|()| true)
    }

    /// Terminate a partition, returning its pooled events.
    pub fn remove_partition(&self, key: &str) -> bool {
        self.partitions.remove(key).is_some()
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition_keys(&self) -> Vec<String> {
        self.partitions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn contains_partition(&self, key: &str) -> bool {
        self.partitions.contains_key(key)
    }

    /// Run `f` against the live runtime of `key`, if there is one.
    pub fn with_partition<R>(
        &self,
        key: &str,
        f: impl FnOnce(&StateStreamRuntime) -> R,
    ) -> EventFluxResult<Option<R>> {
        let Some(runtime) = self.partitions.get(key).map(|entry| Arc::clone(entry.value())) else {
            return Ok(None);
        };
        let guard = lock(&runtime, key)?;
        Ok(Some(f(&guard)))
    }

    pub fn pools(&self) -> &EventPools {
        &self.pools
    }

    fn partition(&self, key: &str) -> EventFluxResult<Arc<Mutex<StateStreamRuntime>>> {
        if let Some(existing) = self.partitions.get(key) {
            return Ok(Arc::clone(existing.value()));
        }

        let mut runtime = self
            .template
            .create_runtime(&self.pools, (self.callback_factory)(key));
        runtime.start()?;
        log::debug!("created pattern context for partition '{}'", key);

        // Another writer may have created the same partition meanwhile; keep theirs
        let entry = self
            .partitions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(runtime)));
        Ok(Arc::clone(entry.value()))
    }

    fn terminate_on_fatal(&self, key: &str, result: EventFluxResult<()>) -> EventFluxResult<()> {
        if let Err(e) = &result {
            if e.is_context_fatal() {
                log::error!("terminating pattern context for partition '{}': {}", key, e);
                self.partitions.remove(key);
            }
        }
        result
    }
}

fn lock<'a>(
    runtime: &'a Mutex<StateStreamRuntime>,
    key: &str,
) -> EventFluxResult<MutexGuard<'a, StateStreamRuntime>> {
    runtime.lock().map_err(|_| {
        EventFluxError::invariant_violation(format!(
            "pattern context for partition '{key}' was poisoned by a panic"
        ))
    })
}
