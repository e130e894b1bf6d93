// Relay channel seam and pending call handles

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::commands::RelayCommand;

/// Failure of one relay attempt
///
/// Never returned synchronously by an outcome method; always resolved
/// through the corresponding [`PendingRelay`].
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The named arguments could not be encoded
    #[error("could not encode arguments for {command}: {source}")]
    Encode {
        command: RelayCommand,
        #[source]
        source: serde_json::Error,
    },

    /// The transport failed to deliver the call
    #[error("transport failure: {0}")]
    Transport(String),

    /// The coordinator refused the command
    #[error("coordinator rejected {command}: {message}")]
    Rejected {
        command: RelayCommand,
        message: String,
    },

    /// The relay task was torn down before resolving
    #[error("relay task failed: {0}")]
    TaskFailed(String),
}

/// Remote-call channel to the coordinator
///
/// Implementations own framing, addressing and timeouts; the reporter only
/// issues named commands through this seam.
#[async_trait]
pub trait RelayChannel: Send + Sync {
    /// Issue one named command with its named-argument object
    async fn call_remote(&self, command: RelayCommand, args: Value) -> Result<(), RelayError>;
}

/// Handle for one in-flight or resolved relay call
#[derive(Debug)]
pub struct PendingRelay {
    command: RelayCommand,
    test_name: String,
    task: JoinHandle<Result<(), RelayError>>,
}

impl PendingRelay {
    pub(crate) fn new(
        command: RelayCommand,
        test_name: impl Into<String>,
        task: JoinHandle<Result<(), RelayError>>,
    ) -> Self {
        Self {
            command,
            test_name: test_name.into(),
            task,
        }
    }

    /// Get the command this relay carries
    pub fn command(&self) -> RelayCommand {
        self.command
    }

    /// Get the test the relayed outcome belongs to
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Check whether the relay has already resolved, either way
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the relay to resolve
    ///
    /// Task teardown folds into [`RelayError::TaskFailed`] so callers see a
    /// single failure channel.
    pub async fn outcome(self) -> Result<(), RelayError> {
        match self.task.await {
            Ok(result) => result,
            Err(join_error) => Err(RelayError::TaskFailed(join_error.to_string())),
        }
    }
}
