//! Logger feeding the UI log pane

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// Lines kept for the log pane
const MAX_LINES: usize = 200;

pub type LogLines = Arc<Mutex<VecDeque<String>>>;

struct UiLogger {
    lines: LogLines,
    level: LevelFilter,
}

impl Log for UiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut lines) = self.lines.lock() {
            if lines.len() == MAX_LINES {
                lines.pop_front();
            }
            lines.push_back(format!("{:<5} {}", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

/// Install the pane logger as the global `log` backend
pub fn install(level: LevelFilter) -> Result<LogLines, SetLoggerError> {
    let lines = LogLines::default();
    log::set_boxed_logger(Box::new(UiLogger {
        lines: lines.clone(),
        level,
    }))?;
    log::set_max_level(level);
    Ok(lines)
}
