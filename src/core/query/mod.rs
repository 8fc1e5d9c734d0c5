// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod input;
pub mod output;
pub mod processor;
