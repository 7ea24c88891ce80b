use chrono::Local;
use log::{set_logger, set_max_level, Level, LevelFilter, Log, Metadata, Record};

/// Installs the [`Logger`] as the global logger. Records above `level` are discarded.
pub fn init(level: LevelFilter) {
    if let Err(err) = set_logger(&Logger) {
        eprintln!("Failed to install logger: {}", err);
        return;
    }

    set_max_level(level);
}

/// A logger writing all records to stdout.
#[derive(Copy, Clone, Debug)]
pub struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = Local::now().format("%Y-%m-%d %H:%M:%S");

        println!(
            "[{}] [{}:{}] [{}] {}",
            now,
            record.file().unwrap_or("???"),
            record.line().unwrap_or(0),
            level_str(record.level()),
            record.args()
        );
    }

    fn flush(&self) {}
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

#[cfg(test)]
mod tests {
    use log::Level;

    use super::level_str;

    #[test]
    fn test_level_str() {
        assert_eq!(level_str(Level::Error), "ERROR");
        assert_eq!(level_str(Level::Warn), "WARN");
        assert_eq!(level_str(Level::Trace), "TRACE");
    }
}
