//! Process-wide logger.
//!
//! Implements the `log` facade with an in-memory ring buffer that the
//! activity panel reads, mirrored line by line to `proxyflow.log`. Messages
//! written as `"[category] text"` keep their category; anything else is
//! filed under the emitting module. Records from other crates are dropped.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use std::time::SystemTime;

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::constants;

/// A single log entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: SystemTime,
    pub level: Level,
    pub category: String,
    pub message: String,
}

impl LogEntry {
    /// `[HH:MM:SS] [LEVEL] category: message`
    pub fn format(&self) -> String {
        format!(
            "[{}] [{:<5}] {}: {}",
            crate::utils::format_clock(self.timestamp),
            self.level,
            self.category,
            self.message
        )
    }
}

struct Ring {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
    mirror: Option<File>,
}

impl Ring {
    fn push(&mut self, entry: LogEntry) {
        if let Some(file) = self.mirror.as_mut() {
            // A failing mirror must not take logging down with it.
            if writeln!(file, "{}", entry.format()).is_err() {
                self.mirror = None;
            }
        }
        self.entries.push_back(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }
}

struct RingLogger;

static LOGGER: RingLogger = RingLogger;
static RING: OnceLock<Mutex<Ring>> = OnceLock::new();

fn ring() -> &'static Mutex<Ring> {
    RING.get_or_init(|| {
        Mutex::new(Ring {
            entries: VecDeque::new(),
            max_entries: constants::DEFAULT_MAX_LOG_ENTRIES,
            mirror: None,
        })
    })
}

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
            && metadata.target().starts_with(env!("CARGO_CRATE_NAME"))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let text = record.args().to_string();
        let (category, message) = split_category(&text, record.target());
        let entry = LogEntry {
            timestamp: SystemTime::now(),
            level: record.level(),
            category: category.to_string(),
            message: message.to_string(),
        };
        if let Ok(mut ring) = ring().lock() {
            ring.push(entry);
        }
    }

    fn flush(&self) {
        if let Ok(mut ring) = ring().lock() {
            if let Some(file) = ring.mirror.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// `"[proxy] Applying"` -> `("proxy", "Applying")`; otherwise the module name.
fn split_category<'a>(text: &'a str, target: &'a str) -> (&'a str, &'a str) {
    if let Some(rest) = text.strip_prefix('[') {
        if let Some((category, message)) = rest.split_once(']') {
            if !category.is_empty() && !category.contains(char::is_whitespace) {
                return (category, message.trim_start());
            }
        }
    }
    (target.rsplit("::").next().unwrap_or(target), text)
}

/// Parses a level name (case-insensitive), falling back to `Info`.
#[must_use]
pub fn parse_log_level(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warning" | "warn" => LevelFilter::Warn,
        "error" | "err" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

/// Installs the logger. Call once at startup after loading `AppConfig`.
///
/// When `config_dir` is given, entries are appended to `proxyflow.log` there.
///
/// # Errors
///
/// Returns an error if another logger is already installed.
pub fn init(
    config_dir: Option<&Path>,
    log_level: &str,
    max_entries: usize,
) -> Result<(), log::SetLoggerError> {
    configure(log_level, max_entries);
    if let Some(dir) = config_dir {
        let path = dir.join(constants::LOG_FILE_NAME);
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                if let Ok(mut ring) = ring().lock() {
                    ring.mirror = Some(file);
                }
            }
            Err(e) => eprintln!("Warning: cannot open log file {}: {e}", path.display()),
        }
    }
    log::set_logger(&LOGGER)
}

/// Applies level and capacity settings.
pub fn configure(log_level: &str, max_entries: usize) {
    log::set_max_level(parse_log_level(log_level));
    if let Ok(mut ring) = ring().lock() {
        ring.max_entries = max_entries.max(1);
        while ring.entries.len() > ring.max_entries {
            ring.entries.pop_front();
        }
    }
}

/// Get all log entries (for display in TUI)
pub fn get_logs() -> Vec<LogEntry> {
    ring()
        .lock()
        .map(|ring| ring.entries.iter().cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
pub fn clear_logs() {
    if let Ok(mut ring) = ring().lock() {
        ring.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Logger tests must run serially because they share global state.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn emit(level: Level, target: &str, text: &str) {
        LOGGER.log(
            &Record::builder()
                .level(level)
                .target(target)
                .args(format_args!("{text}"))
                .build(),
        );
    }

    #[test]
    fn test_split_category() {
        assert_eq!(
            split_category("[proxy] Applying x", "proxyflow::core::applier"),
            ("proxy", "Applying x")
        );
        assert_eq!(
            split_category("plain text", "proxyflow::core::applier"),
            ("applier", "plain text")
        );
        assert_eq!(
            split_category("[not a tag] text", "proxyflow"),
            ("proxyflow", "[not a tag] text")
        );
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_log_level("warning"), LevelFilter::Warn);
        assert_eq!(parse_log_level("nonsense"), LevelFilter::Info);
    }

    #[test]
    fn test_entries_are_recorded_and_filtered() {
        let _lock = TEST_MUTEX.lock().unwrap();
        clear_logs();
        configure("warn", 100);

        emit(Level::Info, "proxyflow::core", "[store] quiet");
        emit(Level::Warn, "proxyflow::core", "[store] loud");
        emit(Level::Error, "hyper::client", "foreign");

        let logs = get_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].category, "store");
        assert_eq!(logs[0].message, "loud");
        assert!(logs[0].format().contains("[WARN ] store: loud"));

        configure("info", constants::DEFAULT_MAX_LOG_ENTRIES);
    }

    #[test]
    fn test_max_entries() {
        let _lock = TEST_MUTEX.lock().unwrap();
        clear_logs();
        configure("info", 10);

        for i in 0..25 {
            emit(Level::Info, "proxyflow", &format!("Message {i}"));
        }

        let logs = get_logs();
        assert_eq!(logs.len(), 10);
        assert_eq!(logs[9].message, "Message 24");

        configure("info", constants::DEFAULT_MAX_LOG_ENTRIES);
    }
}
