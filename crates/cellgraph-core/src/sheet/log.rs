//! Injectable log sink.
//!
//! Each [`Spreadsheet`](super::Spreadsheet) owns its own `log::Log`
//! implementation instead of reading a process-wide debug switch. The
//! default sink drops everything; [`GlobalLogger`] forwards to whatever
//! backend the host application installed with the `log` crate.

use log::{Level, Log, Metadata, Record};
use std::fmt;

pub const LOG_TARGET: &str = "cellgraph::sheet";

/// Discards every record.
#[derive(Clone, Copy, Debug, Default)]
pub struct NopLogger;

impl Log for NopLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        false
    }

    fn log(&self, _record: &Record) {}

    fn flush(&self) {}
}

/// Forwards to the logger installed with `log::set_logger`.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalLogger;

impl Log for GlobalLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            log::logger().log(record);
        }
    }

    fn flush(&self) {
        log::logger().flush();
    }
}

pub(crate) struct SheetLog {
    sink: Box<dyn Log>,
}

impl SheetLog {
    pub(crate) fn new(sink: Box<dyn Log>) -> Self {
        SheetLog { sink }
    }

    pub(crate) fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(LOG_TARGET).build();
        if !self.sink.enabled(&metadata) {
            return;
        }
        self.sink.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }
}

impl Default for SheetLog {
    fn default() -> Self {
        SheetLog::new(Box::new(NopLogger))
    }
}

impl fmt::Debug for SheetLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SheetLog")
    }
}

/// `sheet_log!(self, Level::Debug, "...", args)`
macro_rules! sheet_log {
    ($sheet:expr, $level:expr, $($arg:tt)+) => {
        $sheet.log.emit($level, format_args!($($arg)+))
    };
}

pub(crate) use sheet_log;
