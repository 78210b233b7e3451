//! Instrument status reporting.
//!
//! One line per instrument, enabled/disabled plus reason. Writing is
//! suppressed unless the writer was constructed enabled (driven by
//! `service_debug` in the default wiring), and the output stream is
//! injectable so tests can capture it.

use std::io::{self, Write};

use crate::instruments::InstrumentKind;

/// Console stream for instrument status lines.
pub struct ConsoleWriter {
    enabled: bool,
    out: Box<dyn Write + Send>,
}

impl ConsoleWriter {
    /// Writer targeting stdout.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            out: Box::new(io::stdout()),
        }
    }

    /// Writer targeting a custom stream.
    pub fn with_output(enabled: bool, out: Box<dyn Write + Send>) -> Self {
        Self { enabled, out }
    }

    /// Whether status lines are written at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Report one instrument's status. Write failures are ignored; status
    /// output must never fail the bootstrap.
    pub fn write_instrument(&mut self, kind: InstrumentKind, ready: bool, reason: &str) {
        if !self.enabled {
            return;
        }
        let result = if ready {
            writeln!(self.out, "{:<16} enabled", kind.as_str())
        } else {
            writeln!(self.out, "{:<16} disabled ({reason})", kind.as_str())
        };
        let _ = result;
    }
}
