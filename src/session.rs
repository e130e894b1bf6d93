// Reporting sessions
// Append-only tracking of the relays issued while an outcome scope is open

use tracing::{debug, warn};

use crate::commands::RelayCommand;
use crate::relay::{PendingRelay, RelayError};

/// Tracks every relay issued while a reporting scope is open
///
/// The session only grows; nothing is pruned when a relay resolves. Once
/// the scope closes the owner holds the complete set and can drain it.
/// Only the reporter and its scope helpers construct sessions.
#[derive(Debug)]
pub struct ReportingSession {
    pending: Vec<PendingRelay>,
}

impl ReportingSession {
    pub(crate) fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Append one pending relay, keeping issue order
    pub fn record(&mut self, relay: PendingRelay) {
        self.pending.push(relay);
    }

    /// Get the relays recorded so far, in issue order
    pub fn pending(&self) -> &[PendingRelay] {
        &self.pending
    }

    /// Consume the session, yielding the recorded relays in issue order
    pub fn into_pending(self) -> Vec<PendingRelay> {
        self.pending
    }

    /// Get the number of recorded relays
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Await every recorded relay and report how delivery went
    ///
    /// Handles are awaited in issue order; the underlying calls may have
    /// resolved in any order long before this runs.
    pub async fn drain(self) -> SessionReport {
        let total = self.pending.len();
        let mut delivered = 0;
        let mut failed = Vec::new();

        for relay in self.pending {
            let command = relay.command();
            let test_name = relay.test_name().to_string();
            match relay.outcome().await {
                Ok(()) => delivered += 1,
                Err(error) => {
                    warn!(%command, test = %test_name, %error, "relay failed");
                    failed.push(FailedRelay {
                        command,
                        test_name,
                        error,
                    });
                }
            }
        }

        debug!(
            total,
            delivered,
            failed = failed.len(),
            "reporting session drained"
        );
        SessionReport { delivered, failed }
    }
}

/// One relay that did not reach the coordinator
#[derive(Debug)]
pub struct FailedRelay {
    pub command: RelayCommand,
    pub test_name: String,
    pub error: RelayError,
}

/// Result of draining a session
#[derive(Debug, Default)]
pub struct SessionReport {
    /// Relays acknowledged by the coordinator
    pub delivered: usize,
    /// Relays that failed, in issue order
    pub failed: Vec<FailedRelay>,
}

impl SessionReport {
    /// Check if every relay was delivered
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Get the number of relays drained in total
    pub fn total(&self) -> usize {
        self.delivered + self.failed.len()
    }
}
