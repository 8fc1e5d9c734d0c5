// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod match_callback;

pub use match_callback::{CollectingMatchCallback, LogMatchCallback, MatchCallback};
