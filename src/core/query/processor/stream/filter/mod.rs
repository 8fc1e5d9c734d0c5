// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod filter_processor;

pub use self::filter_processor::{FilterProcessor, StateCondition};
