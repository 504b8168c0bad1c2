//! Tracing subscriber setup
//!
//! stdout belongs to `get`, whose output conky substitutes into the overlay,
//! so logs go to stderr or to the configured `logfile`. `RUST_LOG` overrides
//! the level; otherwise it is `info`, or `debug` when the config says so.

use crate::config::{Config, Paths};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the subscriber for `conkyrc` and `update`. The returned guard
/// flushes the log file and must live until the process exits.
pub fn init(config: Option<&Config>, paths: &Paths) -> Option<WorkerGuard> {
    let level = match config {
        Some(config) if config.debug() => "pkmeter=debug",
        _ => "pkmeter=info",
    };

    let logfile = config.and_then(Config::logfile).map(|file| paths.expand(file));
    let appender = logfile.and_then(|path| {
        let dir = path.parent()?.to_path_buf();
        let name = path.file_name()?.to_os_string();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            // no subscriber yet
            eprintln!("Cannot create log directory {}: {}", dir.display(), e);
            return None;
        }
        Some(tracing_appender::rolling::never(dir, name))
    });

    match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(false))
                .with(env_filter(level))
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .with(env_filter(level))
                .try_init();
            None
        }
    }
}

/// Minimal stderr logging for `get`, which runs before any config is read.
pub fn init_quiet() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter("warn"))
        .try_init();
}
