use std::fmt;

use crate::merge::MergeError;

/// Where a source sub-node referred back to one of its own ancestors.
///
/// Both fields are dotted key paths from the root of the source tree:
/// `reference` is the key that holds the back-reference, `ancestor` is the
/// node it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub reference: String,
    pub ancestor: String,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "circular reference detected in source; {} = {}",
            self.reference, self.ancestor
        )
    }
}

/// Receives advisory reports while a merge runs.
///
/// Injected rather than global so tests can capture what was reported
/// instead of scraping logger output.
pub trait DiagnosticSink {
    fn invalid_argument(&mut self, error: &MergeError);
    fn cycle(&mut self, report: &CycleReport);
}

/// The default sink, forwarding to `tracing`. Argument failures are hard
/// errors; a circular reference may or may not be a problem for the
/// caller, so it is only a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn invalid_argument(&mut self, error: &MergeError) {
        tracing::error!("{error}");
    }

    fn cycle(&mut self, report: &CycleReport) {
        tracing::warn!("{report}");
    }
}
