//! Uniform result shape for every analyzer test
//!
//! Each test either produces a value or records why it did not run. The report
//! emitter has a single code path for printing skipped tests.

use serde::Serialize;

/// Why a test did not produce a statistic
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// One or more input columns the test depends on are absent from the input
    ColumnNotFound { columns: Vec<String> },
    /// Present, but with fewer usable samples than the configured minimum
    InsufficientData { available: usize, required: usize },
    /// Fewer same-creator, same-week pairs than the configured minimum
    InsufficientPairs { available: usize, required: usize },
    /// Enough data, but the statistic would be meaningless (zero variance, one class)
    NoSignal { detail: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ColumnNotFound { columns } => {
                write!(f, "skipped: column not found ({})", columns.join(", "))
            }
            SkipReason::InsufficientData {
                available,
                required,
            } => write!(
                f,
                "skipped: insufficient data ({} < {})",
                available, required
            ),
            SkipReason::InsufficientPairs {
                available,
                required,
            } => write!(
                f,
                "skipped: insufficient pairs ({} < {})",
                available, required
            ),
            SkipReason::NoSignal { detail } => write!(f, "no signal: {}", detail),
        }
    }
}

/// `Computed(T) | Skipped(reason)`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Computed(T),
    Skipped(SkipReason),
}

impl<T> Outcome<T> {
    pub fn computed(&self) -> Option<&T> {
        match self {
            Outcome::Computed(value) => Some(value),
            Outcome::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Outcome::Computed(_) => None,
            Outcome::Skipped(reason) => Some(reason),
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Outcome::Computed(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Computed(value) => Outcome::Computed(f(value)),
            Outcome::Skipped(reason) => Outcome::Skipped(reason),
        }
    }
}

/// A named test together with its outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluated<T> {
    pub name: String,
    #[serde(flatten)]
    pub outcome: Outcome<T>,
}

impl<T> Evaluated<T> {
    pub fn new(name: impl Into<String>, outcome: Outcome<T>) -> Self {
        Self {
            name: name.into(),
            outcome,
        }
    }

    pub fn skipped(name: impl Into<String>, reason: SkipReason) -> Self {
        Self::new(name, Outcome::Skipped(reason))
    }
}

/// A skipped test as it appears in the report ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTest {
    pub analyzer: String,
    pub name: String,
    pub reason: SkipReason,
}

/// Collect the skipped entries of one analyzer into ledger rows
pub fn skipped_ledger<T>(analyzer: &str, tests: &[Evaluated<T>]) -> Vec<SkippedTest> {
    tests
        .iter()
        .filter_map(|test| {
            test.outcome.skip_reason().map(|reason| SkippedTest {
                analyzer: analyzer.to_string(),
                name: test.name.clone(),
                reason: reason.clone(),
            })
        })
        .collect()
}
