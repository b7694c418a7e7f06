//! Tile State Store - the per-tile state machine driven by the bus
//!
//! Each store owns exactly one tile's state. It reacts only to actions
//! addressed to its tile id (isolation guarantee: nothing another tile does
//! can mutate this state directly), spawns the asynchronous fetch, and turns
//! the completion back into bus actions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::actions::{
    Action, ActionHandler, ApiResponse, Effects, FreqRange, QueryOverride, SubqueryPayload,
    SubqueryValue,
};
use crate::api::DataSource;
use crate::errors::FetchError;

use super::args::{TileQuery, build_query_args};
use super::state::{TilePhase, TileSnapshot, TileState};

/// How a producer tile derives its subquery value from a fresh result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubqueryExtract {
    /// Concordance persistence id from the response envelope
    ConcId,
    /// Largest row count
    MaxCount,
    /// Observed min/max count range
    FreqRange,
}

impl SubqueryExtract {
    /// Derive the subquery value from a successful response
    ///
    /// Returns `None` when the response carries nothing to derive it from
    /// (no rows, or no concordance id); dependent tiles simply stay put.
    pub fn extract(self, response: &ApiResponse) -> Option<SubqueryValue> {
        match self {
            SubqueryExtract::ConcId => response
                .conc_persistence_id
                .clone()
                .map(SubqueryValue::ConcId),
            SubqueryExtract::MaxCount => response
                .rows
                .iter()
                .map(|row| row.count)
                .max()
                .map(SubqueryValue::MaxCount),
            SubqueryExtract::FreqRange => {
                let min = response.rows.iter().map(|row| row.count).min();
                let max = response.rows.iter().map(|row| row.count).max();
                match (min, max) {
                    (Some(min), Some(max)) => Some(SubqueryValue::FreqRange(FreqRange { min, max })),
                    _ => None,
                }
            }
        }
    }
}

/// One tile's state machine
pub struct TileStore {
    tile_id: String,
    state: TileState,
    source: Arc<dyn DataSource>,
    /// Spawned fetch tasks complete back through this channel
    completion_tx: mpsc::Sender<Action>,
    snapshot_tx: watch::Sender<TileSnapshot>,
    /// Subquery rule when this tile feeds other tiles
    subquery: Option<SubqueryExtract>,
    /// True when a dependency edge feeds this tile: it ignores the broadcast
    /// query trigger and waits for the propagator instead
    waits_for_subquery: bool,
    /// Sequence number of the most recent request. A response tagged with
    /// anything older is stale and must be discarded, or an out-of-order
    /// completion would overwrite newer data.
    latest_seq: u64,
}

impl TileStore {
    pub fn new(
        tile_id: impl Into<String>,
        query: TileQuery,
        source: Arc<dyn DataSource>,
        completion_tx: mpsc::Sender<Action>,
        subquery: Option<SubqueryExtract>,
        waits_for_subquery: bool,
    ) -> (Self, watch::Receiver<TileSnapshot>) {
        let tile_id = tile_id.into();
        let state = TileState::new(query);
        let (snapshot_tx, snapshot_rx) = watch::channel(TileSnapshot::of(&tile_id, &state));
        (
            Self {
                tile_id,
                state,
                source,
                completion_tx,
                snapshot_tx,
                subquery,
                waits_for_subquery,
                latest_seq: 0,
            },
            snapshot_rx,
        )
    }

    pub fn tile_id(&self) -> &str {
        &self.tile_id
    }

    /// Current state (test aid; production readers use the watch snapshots)
    pub fn state(&self) -> &TileState {
        &self.state
    }

    fn publish(&self) {
        // Nobody watching is fine
        let _ = self
            .snapshot_tx
            .send(TileSnapshot::of(&self.tile_id, &self.state));
    }

    /// Enter `Loading` and spawn the fetch for the current (possibly
    /// overridden) query parameters
    fn begin_request(&mut self, overrides: Option<&QueryOverride>, effects: &mut Effects) {
        self.state.phase = TilePhase::Loading;
        self.state.error = None;
        self.latest_seq += 1;
        let request_seq = self.latest_seq;

        let args = build_query_args(&self.state.query, overrides);
        debug!(
            tile_id = %self.tile_id,
            request_seq,
            limit = %args.limit,
            "tile request: starting fetch"
        );

        let source = Arc::clone(&self.source);
        let tx = self.completion_tx.clone();
        let tile_id = self.tile_id.clone();
        effects.fetch_started();
        tokio::spawn(async move {
            let outcome = source.fetch(&args).await;
            // The session may already be gone; that is a normal teardown
            let _ = tx
                .send(Action::TileResponse {
                    tile_id,
                    request_seq,
                    outcome,
                })
                .await;
        });

        self.publish();
    }

    fn apply_response(
        &mut self,
        request_seq: u64,
        outcome: &Result<ApiResponse, FetchError>,
        effects: &mut Effects,
    ) {
        if request_seq != self.latest_seq {
            debug!(
                tile_id = %self.tile_id,
                request_seq,
                latest_seq = self.latest_seq,
                "discarding stale response"
            );
            return;
        }

        match outcome {
            Ok(response) => {
                self.state.phase = TilePhase::Loaded;
                self.state.error = None;
                self.state.data = Some(Arc::from(response.rows.clone()));

                let subquery = self
                    .subquery
                    .and_then(|extract| extract.extract(response))
                    .map(|value| SubqueryPayload {
                        tile_id: self.tile_id.clone(),
                        value,
                    });
                if self.subquery.is_some() && subquery.is_none() {
                    warn!(
                        tile_id = %self.tile_id,
                        "producer result yielded no subquery value; dependents stay put"
                    );
                }

                effects.dispatch(Action::TileDataLoaded {
                    tile_id: self.tile_id.clone(),
                    is_empty: response.rows.is_empty(),
                    subquery,
                });
            }
            Err(err) => {
                self.state.phase = TilePhase::Failed;
                self.state.error = Some(err.to_string());
                // `data` is intentionally left alone: a stale result on
                // screen beats an empty tile

                effects.dispatch(Action::TileDataFailed {
                    tile_id: self.tile_id.clone(),
                    error: err.to_string(),
                });
            }
        }

        self.publish();
    }
}

impl ActionHandler for TileStore {
    fn handle(&mut self, action: &Action, effects: &mut Effects) {
        match action {
            Action::QuerySubmitted { .. } if !self.waits_for_subquery => {
                // Trampolined: the request lands after the broadcast has
                // reached every subscriber
                effects.dispatch(Action::TileRequestData {
                    tile_id: self.tile_id.clone(),
                    overrides: None,
                });
            }
            Action::TileRequestData { tile_id, overrides } if *tile_id == self.tile_id => {
                self.begin_request(overrides.as_ref(), effects);
            }
            Action::TileResponse {
                tile_id,
                request_seq,
                outcome,
            } if *tile_id == self.tile_id => {
                self.apply_response(*request_seq, outcome, effects);
            }
            _ => {}
        }
    }
}
