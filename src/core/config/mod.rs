// SPDX-License-Identifier: MIT OR Apache-2.0

pub mod runtime_config;

pub use runtime_config::{
    substitute_env_vars, LogLevel, LoggingConfig, PoolConfig, StateRuntimeConfig,
};
