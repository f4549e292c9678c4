//! Leveled log sink consumed from the host, and the line-buffering writer
//! that forwards script output into it.

use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

/// A leveled log owned by the host build tool.
///
/// Each level can be enabled or disabled independently. Callers check the
/// enabled state before formatting anything expensive.
pub trait Log {
    fn is_debug_enabled(&self) -> bool;
    fn is_info_enabled(&self) -> bool;
    fn is_warn_enabled(&self) -> bool;
    fn is_error_enabled(&self) -> bool;

    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// [`Log`] backed by the `tracing` macros, for hosts without a sink of their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl Log for TracingLog {
    fn is_debug_enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::DEBUG)
    }

    fn is_info_enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::INFO)
    }

    fn is_warn_enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::WARN)
    }

    fn is_error_enabled(&self) -> bool {
        tracing::enabled!(tracing::Level::ERROR)
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Severity a [`LogWriter`] forwards its lines at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Whether `log` would record a message at this level.
    #[must_use]
    pub fn is_enabled(self, log: &dyn Log) -> bool {
        match self {
            LogLevel::Debug => log.is_debug_enabled(),
            LogLevel::Info => log.is_info_enabled(),
            LogLevel::Warn => log.is_warn_enabled(),
            LogLevel::Error => log.is_error_enabled(),
        }
    }

    /// Record `message` at this level.
    pub fn write(self, log: &dyn Log, message: &str) {
        match self {
            LogLevel::Debug => log.debug(message),
            LogLevel::Info => log.info(message),
            LogLevel::Warn => log.warn(message),
            LogLevel::Error => log.error(message),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// An [`io::Write`] sink that forwards complete lines to a [`Log`].
///
/// Bytes are buffered until a newline arrives; each completed line is emitted
/// without its terminator (a trailing `\r` is stripped too). `flush` emits
/// whatever is left as a final line, and dropping the writer flushes it.
/// Lines are discarded without decoding when the level is disabled.
pub struct LogWriter {
    log: Rc<dyn Log>,
    level: LogLevel,
    buffer: Vec<u8>,
}

impl LogWriter {
    /// A writer forwarding at [`LogLevel::Info`].
    pub fn new(log: Rc<dyn Log>) -> Self {
        Self::with_level(log, LogLevel::Info)
    }

    pub fn with_level(log: Rc<dyn Log>, level: LogLevel) -> Self {
        Self {
            log,
            level,
            buffer: Vec::new(),
        }
    }

    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    fn emit_complete_lines(&mut self) {
        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            self.emit(&line[..end]);
        }
    }

    fn emit(&self, line: &[u8]) {
        if !self.level.is_enabled(self.log.as_ref()) {
            return;
        }
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        self.level
            .write(self.log.as_ref(), &String::from_utf8_lossy(line));
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.emit_complete_lines();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit_complete_lines();
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.emit(&rest);
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogWriter")
            .field("level", &self.level)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}
