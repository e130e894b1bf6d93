// Local run bookkeeping
// Synchronous tallies the worker keeps for its own run, independent of
// whether outcomes could be relayed

use serde::Serialize;

/// Kind of one recorded outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeKind {
    Success,
    Error,
    Failure,
    Skip,
    ExpectedFailure,
    UnexpectedSuccess,
}

/// One recorded outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    pub test: String,
    pub kind: OutcomeKind,
    /// Failure message, skip reason or todo note, depending on the kind
    pub detail: Option<String>,
    pub recorded_at: i64,
}

impl CaseRecord {
    /// Create a record stamped with the current time
    pub fn new(test: impl Into<String>, kind: OutcomeKind, detail: Option<String>) -> Self {
        Self {
            test: test.into(),
            kind,
            detail,
            recorded_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Per-run tallies and case log
#[derive(Debug, Clone, Serialize)]
pub struct RunTotals {
    tests_run: usize,
    successes: usize,
    errors: usize,
    failures: usize,
    skips: usize,
    expected_failures: usize,
    unexpected_successes: usize,
    cases: Vec<CaseRecord>,
}

impl Default for RunTotals {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTotals {
    /// Create empty totals
    pub fn new() -> Self {
        Self {
            tests_run: 0,
            successes: 0,
            errors: 0,
            failures: 0,
            skips: 0,
            expected_failures: 0,
            unexpected_successes: 0,
            cases: Vec::new(),
        }
    }

    /// Record one outcome, bumping the matching counter
    pub fn record(&mut self, record: CaseRecord) {
        self.tests_run += 1;

        match record.kind {
            OutcomeKind::Success => self.successes += 1,
            OutcomeKind::Error => self.errors += 1,
            OutcomeKind::Failure => self.failures += 1,
            OutcomeKind::Skip => self.skips += 1,
            OutcomeKind::ExpectedFailure => self.expected_failures += 1,
            OutcomeKind::UnexpectedSuccess => self.unexpected_successes += 1,
        }

        self.cases.push(record);
    }

    /// Get tests run
    pub fn tests_run(&self) -> usize {
        self.tests_run
    }

    /// Get successes
    pub fn successes(&self) -> usize {
        self.successes
    }

    /// Get errors
    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Get failures
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Get skips
    pub fn skips(&self) -> usize {
        self.skips
    }

    /// Get expected failures
    pub fn expected_failures(&self) -> usize {
        self.expected_failures
    }

    /// Get unexpected successes
    pub fn unexpected_successes(&self) -> usize {
        self.unexpected_successes
    }

    /// Get the case log in arrival order
    pub fn cases(&self) -> &[CaseRecord] {
        &self.cases
    }

    /// Check if the run recorded no errors and no failures
    pub fn all_passed(&self) -> bool {
        self.errors == 0 && self.failures == 0
    }
}
