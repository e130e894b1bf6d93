// Worker-side outcome reporter
// Turns synchronous outcome callbacks into tracked, non-blocking relay calls

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::commands::{
    ErrorArgs, ExpectedFailureArgs, FailureArgs, RelayCommand, SkipArgs, SuccessArgs,
    UnexpectedSuccessArgs,
};
use crate::failure::{CapturedError, normalize};
use crate::relay::{PendingRelay, RelayChannel, RelayError};
use crate::session::ReportingSession;
use crate::state::{CaseRecord, OutcomeKind, RunTotals};

/// Todo reason sent when an expected failure or unexpected success arrives
/// without one
pub const DEFAULT_TODO_REASON: &str = "Test expected to fail";

/// Marks a test as expected to fail, with the reason why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    reason: String,
}

impl Todo {
    /// Create a todo marker
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Get the reason
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

fn todo_reason(todo: Option<&Todo>) -> String {
    match todo {
        Some(todo) => todo.reason.clone(),
        None => DEFAULT_TODO_REASON.to_string(),
    }
}

/// Attempt to relay an outcome outside an open reporting session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("cannot relay {command} outside an open reporting session")]
    NoActiveSession { command: RelayCommand },
}

/// One test outcome, as handed to [`WorkerReporter::report`]
#[derive(Debug, Clone)]
pub enum Outcome {
    Success,
    Error {
        error: CapturedError,
    },
    Failure {
        failure: CapturedError,
    },
    Skip {
        reason: String,
    },
    ExpectedFailure {
        error: CapturedError,
        todo: Option<Todo>,
    },
    UnexpectedSuccess {
        todo: Option<Todo>,
    },
}

impl Outcome {
    /// Get the relay command this outcome maps to
    pub fn command(&self) -> RelayCommand {
        match self {
            Outcome::Success => RelayCommand::AddSuccess,
            Outcome::Error { .. } => RelayCommand::AddError,
            Outcome::Failure { .. } => RelayCommand::AddFailure,
            Outcome::Skip { .. } => RelayCommand::AddSkip,
            Outcome::ExpectedFailure { .. } => RelayCommand::AddExpectedFailure,
            Outcome::UnexpectedSuccess { .. } => RelayCommand::AddUnexpectedSuccess,
        }
    }

    /// Get the bookkeeping kind this outcome maps to
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success => OutcomeKind::Success,
            Outcome::Error { .. } => OutcomeKind::Error,
            Outcome::Failure { .. } => OutcomeKind::Failure,
            Outcome::Skip { .. } => OutcomeKind::Skip,
            Outcome::ExpectedFailure { .. } => OutcomeKind::ExpectedFailure,
            Outcome::UnexpectedSuccess { .. } => OutcomeKind::UnexpectedSuccess,
        }
    }

    /// Detail string stored in the local case log
    fn detail(&self) -> Option<String> {
        match self {
            Outcome::Success => None,
            Outcome::Error { error } => Some(normalize(error).message),
            Outcome::Failure { failure } => Some(normalize(failure).message),
            Outcome::Skip { reason } => Some(reason.clone()),
            Outcome::ExpectedFailure { error, .. } => Some(normalize(error).message),
            Outcome::UnexpectedSuccess { todo } => Some(todo_reason(todo.as_ref())),
        }
    }

    /// Encode the named-argument object for the wire
    fn into_args(self, test_name: String) -> Result<serde_json::Value, RelayError> {
        let command = self.command();
        let encoded = match self {
            Outcome::Success => serde_json::to_value(SuccessArgs { test_name }),
            Outcome::Error { error } => {
                let failure = normalize(&error);
                let frames = failure.wire_frames();
                serde_json::to_value(ErrorArgs {
                    test_name,
                    error: failure.message,
                    error_class: failure.type_name,
                    frames,
                })
            }
            Outcome::Failure { failure } => {
                let failure = normalize(&failure);
                let frames = failure.wire_frames();
                serde_json::to_value(FailureArgs {
                    test_name,
                    fail: failure.message,
                    fail_class: failure.type_name,
                    frames,
                })
            }
            Outcome::Skip { reason } => serde_json::to_value(SkipArgs { test_name, reason }),
            Outcome::ExpectedFailure { error, todo } => {
                serde_json::to_value(ExpectedFailureArgs {
                    test_name,
                    error: normalize(&error).message,
                    todo: todo_reason(todo.as_ref()),
                })
            }
            Outcome::UnexpectedSuccess { todo } => {
                serde_json::to_value(UnexpectedSuccessArgs {
                    test_name,
                    todo: todo_reason(todo.as_ref()),
                })
            }
        };
        encoded.map_err(|source| RelayError::Encode { command, source })
    }
}

/// Synchronous outcome interface shared by local and relaying reporters
///
/// Execution engines drive whichever sink is installed; [`WorkerReporter`]
/// implements it by forwarding to its own relay path.
pub trait OutcomeSink {
    fn add_success(&mut self, test: &str) -> Result<(), UsageError>;
    fn add_error(&mut self, test: &str, error: CapturedError) -> Result<(), UsageError>;
    fn add_failure(&mut self, test: &str, failure: CapturedError) -> Result<(), UsageError>;
    fn add_skip(&mut self, test: &str, reason: &dyn fmt::Display) -> Result<(), UsageError>;
    fn add_expected_failure(
        &mut self,
        test: &str,
        error: CapturedError,
        todo: Option<Todo>,
    ) -> Result<(), UsageError>;
    fn add_unexpected_success(
        &mut self,
        test: &str,
        todo: Option<Todo>,
    ) -> Result<(), UsageError>;
}

/// Per-worker outcome reporter relaying test results to the coordinator
///
/// Outcome methods update local bookkeeping first and then issue one relay
/// call each, tracked in the active reporting session. They never block on
/// relay completion and must run inside a tokio runtime.
pub struct WorkerReporter {
    channel: Arc<dyn RelayChannel>,
    totals: RunTotals,
    session: Option<ReportingSession>,
}

impl WorkerReporter {
    /// Create a reporter over the given relay channel
    pub fn new(channel: Arc<dyn RelayChannel>) -> Self {
        Self {
            channel,
            totals: RunTotals::new(),
            session: None,
        }
    }

    /// Get the local bookkeeping for this run
    pub fn totals(&self) -> &RunTotals {
        &self.totals
    }

    /// Check whether a reporting session is open
    pub fn session_active(&self) -> bool {
        self.session.is_some()
    }

    /// Get the open session, if any, for mid-run inspection
    pub fn session(&self) -> Option<&ReportingSession> {
        self.session.as_ref()
    }

    /// Open a reporting session, making relay operations legal
    ///
    /// If a session is already open it is displaced and returned undrained:
    /// tracking switches to the new session, and any handles recorded in the
    /// old one stay with the caller.
    pub fn open_session(&mut self) -> Option<ReportingSession> {
        let displaced = self.session.replace(ReportingSession::new());
        if let Some(old) = &displaced {
            warn!(pending = old.len(), "displacing an open reporting session");
        }
        displaced
    }

    /// Close the open session, returning it for inspection
    ///
    /// Clears the active-session reference whether or not the recorded
    /// relays have resolved; closing with no session open returns `None`.
    pub fn close_session(&mut self) -> Option<ReportingSession> {
        self.session.take()
    }

    /// Run `body` inside a reporting session
    ///
    /// The session reference is cleared on every exit path, including
    /// unwinding; `body`'s error comes back untouched alongside the
    /// detached session. A scope opened over a live session displaces it
    /// and folds its recorded handles into the returned session, earliest
    /// first, so no handle is dropped on the floor.
    pub fn session_scope<T, E>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> (Result<T, E>, ReportingSession) {
        struct ClearOnExit<'a> {
            reporter: &'a mut WorkerReporter,
        }

        impl Drop for ClearOnExit<'_> {
            fn drop(&mut self) {
                self.reporter.session = None;
            }
        }

        let displaced = self.open_session();
        let guard = ClearOnExit { reporter: self };
        let result = body(&mut *guard.reporter);
        let scoped = guard
            .reporter
            .close_session()
            .unwrap_or_else(ReportingSession::new);
        drop(guard);

        let session = match displaced {
            Some(mut merged) => {
                for relay in scoped.into_pending() {
                    merged.record(relay);
                }
                merged
            }
            None => scoped,
        };
        (result, session)
    }

    /// Report one outcome: local bookkeeping first, then the relay
    ///
    /// Bookkeeping always runs, session or not. The relay is only issued,
    /// and its handle recorded, inside an open session.
    pub fn report(&mut self, test: &str, outcome: Outcome) -> Result<(), UsageError> {
        self.totals
            .record(CaseRecord::new(test, outcome.kind(), outcome.detail()));

        let command = outcome.command();
        let Some(session) = self.session.as_mut() else {
            return Err(UsageError::NoActiveSession { command });
        };

        debug!(test, %command, "relaying test outcome");
        let relay = Self::spawn_relay(Arc::clone(&self.channel), test, outcome);
        session.record(relay);
        Ok(())
    }

    /// Relay a passing test
    pub fn add_success(&mut self, test: &str) -> Result<(), UsageError> {
        self.report(test, Outcome::Success)
    }

    /// Relay an unexpected error raised by a test
    pub fn add_error(&mut self, test: &str, error: CapturedError) -> Result<(), UsageError> {
        self.report(test, Outcome::Error { error })
    }

    /// Relay a failed assertion, kept apart from errors on the wire
    pub fn add_failure(&mut self, test: &str, failure: CapturedError) -> Result<(), UsageError> {
        self.report(test, Outcome::Failure { failure })
    }

    /// Relay a skipped test, coercing the reason to its display form
    pub fn add_skip(&mut self, test: &str, reason: impl fmt::Display) -> Result<(), UsageError> {
        self.report(
            test,
            Outcome::Skip {
                reason: reason.to_string(),
            },
        )
    }

    /// Relay an expected failure; without an explicit todo the default
    /// reason is sent
    pub fn add_expected_failure(
        &mut self,
        test: &str,
        error: CapturedError,
        todo: Option<Todo>,
    ) -> Result<(), UsageError> {
        self.report(test, Outcome::ExpectedFailure { error, todo })
    }

    /// Relay a test that passed although marked as expected to fail
    pub fn add_unexpected_success(
        &mut self,
        test: &str,
        todo: Option<Todo>,
    ) -> Result<(), UsageError> {
        self.report(test, Outcome::UnexpectedSuccess { todo })
    }

    /// Relay an error without session tracking or local bookkeeping
    ///
    /// For harness code that applies its own failure handling: the returned
    /// handle is the only record of the attempt.
    pub fn relay_error_untracked(&self, test: &str, error: CapturedError) -> PendingRelay {
        debug!(test, "relaying untracked error");
        Self::spawn_relay(Arc::clone(&self.channel), test, Outcome::Error { error })
    }

    // Argument encoding happens inside the task so that encoding failures
    // resolve the handle instead of surfacing synchronously.
    fn spawn_relay(channel: Arc<dyn RelayChannel>, test: &str, outcome: Outcome) -> PendingRelay {
        let command = outcome.command();
        let test_name = test.to_string();
        let label = test_name.clone();
        let task = tokio::spawn(async move {
            let args = outcome.into_args(test_name)?;
            channel.call_remote(command, args).await
        });
        PendingRelay::new(command, label, task)
    }
}

impl OutcomeSink for WorkerReporter {
    fn add_success(&mut self, test: &str) -> Result<(), UsageError> {
        self.report(test, Outcome::Success)
    }

    fn add_error(&mut self, test: &str, error: CapturedError) -> Result<(), UsageError> {
        self.report(test, Outcome::Error { error })
    }

    fn add_failure(&mut self, test: &str, failure: CapturedError) -> Result<(), UsageError> {
        self.report(test, Outcome::Failure { failure })
    }

    fn add_skip(&mut self, test: &str, reason: &dyn fmt::Display) -> Result<(), UsageError> {
        self.report(
            test,
            Outcome::Skip {
                reason: reason.to_string(),
            },
        )
    }

    fn add_expected_failure(
        &mut self,
        test: &str,
        error: CapturedError,
        todo: Option<Todo>,
    ) -> Result<(), UsageError> {
        self.report(test, Outcome::ExpectedFailure { error, todo })
    }

    fn add_unexpected_success(
        &mut self,
        test: &str,
        todo: Option<Todo>,
    ) -> Result<(), UsageError> {
        self.report(test, Outcome::UnexpectedSuccess { todo })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{ErrorClass, StackFrame};
    use serde_json::json;

    fn raised_boom() -> CapturedError {
        CapturedError::raised(
            "boom",
            ErrorClass::new("exceptions", "ValueError"),
            vec![StackFrame::new("do_raise", "case.rs", 7)],
        )
    }

    #[test]
    fn test_outcome_maps_to_command() {
        assert_eq!(Outcome::Success.command(), RelayCommand::AddSuccess);
        assert_eq!(
            Outcome::Error {
                error: raised_boom()
            }
            .command(),
            RelayCommand::AddError
        );
        assert_eq!(
            Outcome::Failure {
                failure: raised_boom()
            }
            .command(),
            RelayCommand::AddFailure
        );
        assert_eq!(
            Outcome::Skip {
                reason: "slow".to_string()
            }
            .command(),
            RelayCommand::AddSkip
        );
        assert_eq!(
            Outcome::ExpectedFailure {
                error: raised_boom(),
                todo: None
            }
            .command(),
            RelayCommand::AddExpectedFailure
        );
        assert_eq!(
            Outcome::UnexpectedSuccess { todo: None }.command(),
            RelayCommand::AddUnexpectedSuccess
        );
    }

    #[test]
    fn test_error_args_payload() {
        let outcome = Outcome::Error {
            error: raised_boom(),
        };
        let args = outcome.into_args("t1".to_string()).unwrap();
        assert_eq!(
            args,
            json!({
                "testName": "t1",
                "error": "boom",
                "errorClass": "exceptions.ValueError",
                "frames": ["do_raise", "case.rs", "7"],
            })
        );
    }

    #[test]
    fn test_failure_args_payload() {
        let outcome = Outcome::Failure {
            failure: raised_boom(),
        };
        let args = outcome.into_args("t1".to_string()).unwrap();
        assert_eq!(
            args,
            json!({
                "testName": "t1",
                "fail": "boom",
                "failClass": "exceptions.ValueError",
                "frames": ["do_raise", "case.rs", "7"],
            })
        );
    }

    #[test]
    fn test_skip_args_payload() {
        let outcome = Outcome::Skip {
            reason: "slow on ci".to_string(),
        };
        let args = outcome.into_args("t1".to_string()).unwrap();
        assert_eq!(args, json!({"testName": "t1", "reason": "slow on ci"}));
    }

    #[test]
    fn test_expected_failure_defaults_the_todo() {
        let outcome = Outcome::ExpectedFailure {
            error: raised_boom(),
            todo: None,
        };
        let args = outcome.into_args("t1".to_string()).unwrap();
        assert_eq!(
            args,
            json!({
                "testName": "t1",
                "error": "boom",
                "todo": DEFAULT_TODO_REASON,
            })
        );
    }

    #[test]
    fn test_unexpected_success_keeps_explicit_todo() {
        let outcome = Outcome::UnexpectedSuccess {
            todo: Some(Todo::new("flaky on arm")),
        };
        let args = outcome.into_args("t1".to_string()).unwrap();
        assert_eq!(args, json!({"testName": "t1", "todo": "flaky on arm"}));
    }

    #[test]
    fn test_detail_per_kind() {
        assert_eq!(Outcome::Success.detail(), None);
        assert_eq!(
            Outcome::Error {
                error: raised_boom()
            }
            .detail(),
            Some("boom".to_string())
        );
        assert_eq!(
            Outcome::Skip {
                reason: "slow".to_string()
            }
            .detail(),
            Some("slow".to_string())
        );
        assert_eq!(
            Outcome::UnexpectedSuccess { todo: None }.detail(),
            Some(DEFAULT_TODO_REASON.to_string())
        );
    }

    #[test]
    fn test_usage_error_names_the_command() {
        let error = UsageError::NoActiveSession {
            command: RelayCommand::AddSkip,
        };
        assert_eq!(
            error.to_string(),
            "cannot relay AddSkip outside an open reporting session"
        );
    }
}
