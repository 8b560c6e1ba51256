//! Process-wide log level control (spec.md §10.1), grounded on
//! `examples/original_source/opendxa/dana/sandbox/log_manager.py`'s
//! single-source-of-truth `set_system_log_level`.

use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

static LEVEL_GUARD: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Installs the process's logger. The CLI binary calls this once at
/// startup with colors driven by `--no-color`/`--force-color`; library
/// consumers (tests, embedders) may skip it and rely on `log`'s no-op
/// default logger.
pub fn init_logging(debug: bool, colors: bool) {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Info };
    let _ = simple_logger::SimpleLogger::new().with_colors(colors).with_level(level).init();
}

/// Changes the process-wide log level at runtime (the `core::log_level`
/// builtin's implementation). Serialized through a mutex so concurrent
/// `log_level()` calls from different promises don't race each other.
pub fn set_log_level(level: Level) {
    let _guard = LEVEL_GUARD.lock();
    log::set_max_level(level.to_level_filter());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_log_level_updates_the_global_filter() {
        set_log_level(Level::Warn);
        assert_eq!(log::max_level(), LevelFilter::Warn);
        set_log_level(Level::Trace);
        assert_eq!(log::max_level(), LevelFilter::Trace);
    }
}
