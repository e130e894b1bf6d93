pub mod commands;
pub mod failure;
pub mod relay;
pub mod reporter;
pub mod session;
pub mod state;

pub use commands::RelayCommand;
pub use failure::{CapturedError, ErrorClass, NormalizedFailure, StackFrame, normalize};
pub use relay::{PendingRelay, RelayChannel, RelayError};
pub use reporter::{DEFAULT_TODO_REASON, Outcome, OutcomeSink, Todo, UsageError, WorkerReporter};
pub use session::{FailedRelay, ReportingSession, SessionReport};
pub use state::{CaseRecord, OutcomeKind, RunTotals};
