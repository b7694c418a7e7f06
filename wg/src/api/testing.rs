//! Scripted in-memory data sources for tests
//!
//! Unit and integration tests share these; no network involved.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::actions::ApiResponse;
use crate::errors::FetchError;
use crate::tiles::QueryArgs;

use super::client::DataSource;

/// Canned outcomes, returned in call order, each after its configured delay
///
/// Delays compose with `tokio::time::pause()` for deterministic ordering
/// tests. An exhausted script answers with an internal error rather than
/// panicking inside a spawned task.
pub struct ScriptedSource {
    script: Mutex<VecDeque<(Duration, Result<ApiResponse, FetchError>)>>,
    calls: Mutex<Vec<QueryArgs>>,
}

impl ScriptedSource {
    pub fn new(
        outcomes: impl IntoIterator<Item = (Duration, Result<ApiResponse, FetchError>)>,
    ) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Outcomes with zero delay
    pub fn immediate(outcomes: impl IntoIterator<Item = Result<ApiResponse, FetchError>>) -> Self {
        Self::new(outcomes.into_iter().map(|o| (Duration::ZERO, o)))
    }

    /// Every wire argument set this source has been called with
    pub fn calls(&self) -> Vec<QueryArgs> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    async fn fetch(&self, args: &QueryArgs) -> Result<ApiResponse, FetchError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(args.clone());

        let (delay, outcome) = self
            .script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                (
                    Duration::ZERO,
                    Err(FetchError::InternalError("script exhausted".to_string())),
                )
            });

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}
