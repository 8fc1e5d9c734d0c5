// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod complex_event;
pub mod state;
pub mod stream;
pub mod value;

pub use complex_event::{ComplexEventChunk, ComplexEventType};
pub use value::AttributeValue;
