use chrono::{DateTime, Local};
use log::{Level, LevelFilter, Metadata, Record};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

struct LogEntry {
    timestamp: DateTime<Local>,
    level: Level,
    message: String,
}

/// Writes timestamped records to stderr and keeps the most recent ones
#[derive(Clone)]
pub struct ConsoleLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
    max_entries: usize,
    level: LevelFilter,
    /// Warnings and errors since start, including ones dropped from history
    warnings: Arc<AtomicUsize>,
}

impl ConsoleLogger {
    pub fn new(max_entries: usize, level: LevelFilter) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            max_entries,
            level,
            warnings: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn init(self) -> Result<(), log::SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }

    /// Warnings and errors logged so far
    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if record.level() <= Level::Warn {
                self.warnings.fetch_add(1, Ordering::Relaxed);
            }

            let entry = LogEntry {
                timestamp: Local::now(),
                level: record.level(),
                message: format!("{}", record.args()),
            };

            eprintln!(
                "{} {:<5} {}",
                entry.timestamp.format("%H:%M:%S"),
                entry.level,
                entry.message
            );

            let mut entries = self.lock();
            entries.push(entry);

            // Keep only the most recent entries
            if entries.len() > self.max_entries {
                let excess = entries.len() - self.max_entries;
                entries.drain(0..excess);
            }
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    fn record(logger: &ConsoleLogger, level: Level, message: &str) {
        logger.log(
            &Record::builder()
                .level(level)
                .target("test")
                .args(format_args!("{message}"))
                .build(),
        );
    }

    #[test]
    fn test_history_is_bounded() {
        let logger = ConsoleLogger::new(2, LevelFilter::Info);
        record(&logger, Level::Info, "one");
        record(&logger, Level::Info, "two");
        record(&logger, Level::Warn, "three");

        let messages: Vec<_> = logger.lock().iter().map(|e| e.message.clone()).collect();
        assert_eq!(messages, ["two", "three"]);
    }

    #[test]
    fn test_warning_count_outlives_history() {
        let logger = ConsoleLogger::new(1, LevelFilter::Info);
        record(&logger, Level::Warn, "first");
        record(&logger, Level::Error, "second");
        record(&logger, Level::Warn, "third");
        record(&logger, Level::Info, "latest");

        assert_eq!(logger.lock().len(), 1);
        assert_eq!(logger.warning_count(), 3);
    }

    #[test]
    fn test_level_filter() {
        let logger = ConsoleLogger::new(10, LevelFilter::Warn);
        record(&logger, Level::Info, "skipped");
        record(&logger, Level::Warn, "kept");
        record(&logger, Level::Error, "kept too");

        assert_eq!(logger.lock().len(), 2);
        assert_eq!(logger.warning_count(), 2);
    }
}
