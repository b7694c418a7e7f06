//! Action vocabulary for the dashboard
//!
//! Every component communicates exclusively through these actions. The enum
//! is the closed vocabulary; its serde encoding (`name` tag, `payload`
//! content) is also the wire and log shape `{ name, payload? }`, so a
//! malformed payload surfaces as a decode error at the boundary instead of a
//! runtime surprise inside a handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::FetchError;

/// One row of a frequency-distribution result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRow {
    pub value: String,
    pub count: u64,
}

/// Response envelope returned by a tile's data source
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    /// Persistence id of the concordance the rows were computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conc_persistence_id: Option<String>,
    pub rows: Vec<DataRow>,
}

/// Inclusive range of observed counts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreqRange {
    pub min: u64,
    pub max: u64,
}

/// Value a producer tile derives from its result for dependent tiles
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum SubqueryValue {
    ConcId(String),
    MaxCount(u64),
    FreqRange(FreqRange),
}

/// Attached to a data-loaded action when the tile's output feeds other tiles
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubqueryPayload {
    pub tile_id: String,
    pub value: SubqueryValue,
}

/// Query-parameter overrides injected into a consumer tile's request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Count window for range-driven tiles, rendered as `srchRange=min,max`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srch_range: Option<FreqRange>,
}

impl QueryOverride {
    pub fn is_empty(&self) -> bool {
        self.conc_id.is_none() && self.limit.is_none() && self.srch_range.is_none()
    }
}

/// Core action enum - the vocabulary of dashboard activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "payload")]
pub enum Action {
    /// A query was submitted; tiles without producer dependencies reload
    QuerySubmitted { query: String },

    /// Request addressed to one tile, optionally carrying injected overrides
    TileRequestData {
        tile_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        overrides: Option<QueryOverride>,
    },

    /// Completion of an async fetch re-entering the serialized world
    ///
    /// `request_seq` identifies which request the outcome belongs to; the
    /// owning store discards anything older than its latest request.
    TileResponse {
        tile_id: String,
        request_seq: u64,
        outcome: Result<ApiResponse, FetchError>,
    },

    /// A tile finished loading; carries the subquery payload for producers
    TileDataLoaded {
        tile_id: String,
        is_empty: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subquery: Option<SubqueryPayload>,
    },

    /// A tile's fetch failed; `error` is the classified human-readable message
    TileDataFailed { tile_id: String, error: String },
}

impl Action {
    /// Get the action name (the wire tag)
    pub fn name(&self) -> &'static str {
        match self {
            Action::QuerySubmitted { .. } => "QuerySubmitted",
            Action::TileRequestData { .. } => "TileRequestData",
            Action::TileResponse { .. } => "TileResponse",
            Action::TileDataLoaded { .. } => "TileDataLoaded",
            Action::TileDataFailed { .. } => "TileDataFailed",
        }
    }

    /// Tile the action is addressed to, if any
    pub fn tile_id(&self) -> Option<&str> {
        match self {
            Action::QuerySubmitted { .. } => None,
            Action::TileRequestData { tile_id, .. }
            | Action::TileResponse { tile_id, .. }
            | Action::TileDataLoaded { tile_id, .. }
            | Action::TileDataFailed { tile_id, .. } => Some(tile_id),
        }
    }
}

/// A timestamped entry for the JSONL action log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub action: Action,
}

impl ActionLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(action: Action) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
        }
    }
}
