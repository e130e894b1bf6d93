// Relay command vocabulary
// Names and argument schemas for the outcome commands the coordinator accepts

use std::fmt;

use serde::Serialize;

/// Commands understood by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayCommand {
    AddSuccess,
    AddError,
    AddFailure,
    AddSkip,
    AddExpectedFailure,
    AddUnexpectedSuccess,
}

impl RelayCommand {
    /// Stable wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            RelayCommand::AddSuccess => "AddSuccess",
            RelayCommand::AddError => "AddError",
            RelayCommand::AddFailure => "AddFailure",
            RelayCommand::AddSkip => "AddSkip",
            RelayCommand::AddExpectedFailure => "AddExpectedFailure",
            RelayCommand::AddUnexpectedSuccess => "AddUnexpectedSuccess",
        }
    }
}

impl fmt::Display for RelayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Arguments for `AddSuccess`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessArgs {
    pub test_name: String,
}

/// Arguments for `AddError`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorArgs {
    pub test_name: String,
    pub error: String,
    pub error_class: String,
    pub frames: Vec<String>,
}

/// Arguments for `AddFailure`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureArgs {
    pub test_name: String,
    pub fail: String,
    pub fail_class: String,
    pub frames: Vec<String>,
}

/// Arguments for `AddSkip`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipArgs {
    pub test_name: String,
    pub reason: String,
}

/// Arguments for `AddExpectedFailure`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedFailureArgs {
    pub test_name: String,
    pub error: String,
    pub todo: String,
}

/// Arguments for `AddUnexpectedSuccess`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnexpectedSuccessArgs {
    pub test_name: String,
    pub todo: String,
}
