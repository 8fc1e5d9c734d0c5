// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod stream_event;
pub mod stream_event_cloner;
pub mod stream_event_pool;

pub use stream_event::StreamEvent;
pub use stream_event_cloner::StreamEventCloner;
pub use stream_event_pool::StreamEventPool;
