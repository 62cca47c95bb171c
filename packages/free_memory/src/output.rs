// Destination of the report lines: standard output in production, a capture buffer in tests.

use std::fmt::Display;
use std::io::{self, Write};
#[cfg(test)]
use std::sync::Mutex;

/// Receives the report lines, possibly from many allocator workers at once.
pub(crate) trait LineSink: Sync {
    fn emit_line(&self, line: &dyn Display);
}

/// Writes every line to standard output.
///
/// Output is best effort: if standard output is closed, the line is lost and the workload
/// carries on.
#[derive(Debug)]
pub(crate) struct StdoutLines;

impl LineSink for StdoutLines {
    #[cfg_attr(coverage_nightly, coverage(off))]
    #[cfg_attr(test, mutants::skip)]
    fn emit_line(&self, line: &dyn Display) {
        _ = writeln!(io::stdout().lock(), "{line}");
    }
}

/// Keeps every line in emission order.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CapturedLines {
    lines: Mutex<Vec<String>>,
}

#[cfg(test)]
impl CapturedLines {
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl LineSink for CapturedLines {
    fn emit_line(&self, line: &dyn Display) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
