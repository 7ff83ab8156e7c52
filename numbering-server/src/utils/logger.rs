//! Logging Infrastructure
//!
//! fmt subscriber on stdout, or a daily rolling file when the log directory exists.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the logger
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init_logger(log_level: &str, log_dir: Option<&str>, file_prefix: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.is_dir() {
            let file_appender = tracing_appender::rolling::daily(log_path, file_prefix);
            subscriber.with_ansi(false).with_writer(file_appender).init();
            return;
        }
    }

    subscriber.init();
}
