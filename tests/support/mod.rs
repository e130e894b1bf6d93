// Shared test support: a scripted relay channel double

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use testrelay::{RelayChannel, RelayCommand, RelayError};

/// Relay channel that records every call and lets tests script failures or
/// hold completions open.
#[derive(Default)]
pub struct ScriptedChannel {
    calls: Mutex<Vec<(RelayCommand, Value)>>,
    failures: Mutex<HashMap<RelayCommand, VecDeque<String>>>,
    gates: Mutex<HashMap<RelayCommand, VecDeque<oneshot::Receiver<Result<(), RelayError>>>>>,
}

impl ScriptedChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All calls seen so far, in the order they reached the channel
    pub fn calls(&self) -> Vec<(RelayCommand, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Commands seen so far, one entry per call
    pub fn commands(&self) -> Vec<RelayCommand> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(command, _)| *command)
            .collect()
    }

    /// Script the next call to `command` to fail with a transport error
    pub fn fail_next(&self, command: RelayCommand, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .entry(command)
            .or_default()
            .push_back(message.to_string());
    }

    /// Hold the next call to `command` open until the returned sender
    /// resolves it
    pub fn hold_next(&self, command: RelayCommand) -> oneshot::Sender<Result<(), RelayError>> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .entry(command)
            .or_default()
            .push_back(rx);
        tx
    }
}

#[async_trait]
impl RelayChannel for ScriptedChannel {
    async fn call_remote(&self, command: RelayCommand, args: Value) -> Result<(), RelayError> {
        self.calls.lock().unwrap().push((command, args));

        let gate = self
            .gates
            .lock()
            .unwrap()
            .get_mut(&command)
            .and_then(|queue| queue.pop_front());
        if let Some(rx) = gate {
            return rx
                .await
                .unwrap_or_else(|_| Err(RelayError::Transport("gate dropped".to_string())));
        }

        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&command)
            .and_then(|queue| queue.pop_front());
        if let Some(message) = failure {
            return Err(RelayError::Transport(message));
        }

        Ok(())
    }
}
