//! Structured diagnostics via the `log` crate.
//!
//! Grounded on the teacher's `log::simple_logger::SimpleLogger`: a small
//! `Write`-backed logger with a fixed prefix. The teacher routes different
//! targets to `Syslog` or `SimpleLogger` through its own `SudoLogger`/`Log`
//! trait; this program has a single audience (stderr, for whoever is
//! debugging the CGI dispatch) so it implements `log::Log` directly instead
//! of carrying that routing layer.
//!
//! Must be installed only *after* [`crate::env::sanitise_process_environment`]
//! has run: these diagnostics are supplementary, never a replacement for
//! the single mandated stderr line on failure, and must not themselves read
//! the untrusted inherited environment.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::Write;

struct StderrLogger {
    prefix: &'static str,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("cgi_suexec")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = std::io::stderr();
        let _ = writeln!(
            stderr,
            "{}{}: {}",
            self.prefix,
            level_tag(record.level()),
            record.args()
        );
        let _ = stderr.flush();
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "error",
        Level::Warn => "warn",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
    }
}

/// Install the stderr logger at `level`. Idempotent: a second call is a
/// no-op, matching `log::set_logger`'s own behaviour of returning an error
/// that we deliberately ignore.
pub fn init(level: LevelFilter) {
    let logger: &'static StderrLogger = Box::leak(Box::new(StderrLogger { prefix: "cgi-suexec: " }));
    let _ = log::set_logger(logger);
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::level_tag;
    use log::Level;

    #[test]
    fn level_tags_are_lowercase() {
        assert_eq!(level_tag(Level::Error), "error");
        assert_eq!(level_tag(Level::Trace), "trace");
    }
}
