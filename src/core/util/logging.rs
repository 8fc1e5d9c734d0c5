// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logger installation for binaries and tests embedding the state machine.

use crate::core::config::LoggingConfig;

/// Install an `env_logger` backend at the configured level.
///
/// `RUST_LOG` takes precedence when set. Installing twice is harmless; the
/// first logger wins and the call reports whether this one was installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.level.to_level_filter());
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    let installed = builder.format_timestamp_millis().try_init().is_ok();
    if installed {
        log::debug!("state runtime logging initialised at {:?}", config.level);
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LogLevel;

    #[test]
    fn test_second_install_is_noop() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
        };
        let _ = init_logging(&config);
        assert!(!init_logging(&config));
    }
}
