// SPDX-License-Identifier: MIT OR Apache-2.0

//! Partial-match state machine of the EventFlux complex event processing
//! runtime: pattern and sequence steps, pooled event buffers and the
//! per-context runtimes that drive them.

pub mod core;
