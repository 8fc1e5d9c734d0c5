// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded pool of flat events shared by every context of a query.
//!
//! The free list is a lock-free `ArrayQueue`; the outstanding count is kept in
//! its own cache line since every borrow and release touches it.

use super::stream_event::StreamEvent;
use crate::core::error::{EventFluxError, EventFluxResult};
use crossbeam_queue::ArrayQueue;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const STREAM_EVENT_POOL: &str = "stream_event";

#[derive(Debug)]
pub struct StreamEventPool {
    free: ArrayQueue<StreamEvent>,
    outstanding: CachePadded<AtomicUsize>,
    capacity: usize,
}

impl StreamEventPool {
    /// # Panics
    /// Panics if `capacity` is zero; configuration validation rejects that first.
    pub fn new(capacity: usize) -> Self {
        Self {
            free: ArrayQueue::new(capacity),
            outstanding: CachePadded::new(AtomicUsize::new(0)),
            capacity,
        }
    }

    /// Allocate every instance now so steady-state borrows never hit the allocator.
    pub fn prefill(&self) {
        while self.free.push(StreamEvent::default()).is_ok() {}
    }

    /// Hand out a zero-initialized event, or fail once `capacity` are outstanding.
    pub fn borrow_event(&self) -> EventFluxResult<StreamEvent> {
        let reserved = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            });
        if reserved.is_err() {
            return Err(EventFluxError::pool_exhausted(STREAM_EVENT_POOL, self.capacity));
        }
        Ok(self.free.pop().unwrap_or_default())
    }

    /// Take an event back. Its contents are cleared before it is reused.
    pub fn release(&self, mut event: StreamEvent) {
        event.clear();
        // A full free list only happens for events that never came from here
        let _ = self.free.push(event);
        let previous = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if previous.is_err() {
            log::warn!("stream event released to pool with no outstanding borrows");
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Instances sitting in the free list
    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
