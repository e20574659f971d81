//! Tracing setup.
//!
//! Native hosts and test harnesses install a `fmt` subscriber with [`init`].
//! In the browser no subscriber is installed; `tracing` events fall through
//! to the `log` facade, which the web bridge points at the console using
//! [`console_level`].

#[cfg(test)]
#[path = "telemetry_test.rs"]
mod telemetry_test;

use tracing::Level;

/// Install a global fmt subscriber at `level`.
///
/// Returns `false` if a subscriber was already installed; the existing one
/// stays in place, so calling this again is harmless.
pub fn init(level: Level) -> bool {
    match tracing_subscriber::fmt().with_max_level(level).with_target(false).try_init() {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(error = %err, "tracing subscriber already installed");
            false
        }
    }
}

/// Parse a level name (`trace`, `debug`, `info`, `warn`, `error`), falling
/// back to `info`.
#[must_use]
pub fn parse_level(raw: &str) -> Level {
    raw.trim().parse().unwrap_or(Level::INFO)
}

/// The `log` level matching a `tracing` level, for console loggers.
#[must_use]
pub fn console_level(level: Level) -> log::Level {
    if level == Level::ERROR {
        log::Level::Error
    } else if level == Level::WARN {
        log::Level::Warn
    } else if level == Level::INFO {
        log::Level::Info
    } else if level == Level::DEBUG {
        log::Level::Debug
    } else {
        log::Level::Trace
    }
}
