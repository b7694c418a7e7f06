//! Per-tile state, mutated only by the owning store

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::actions::DataRow;

use super::args::TileQuery;

/// Lifecycle phase of a tile
///
/// `Loaded` and `Failed` both return to `Loading` on a fresh request; there
/// is no terminal phase while the session lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TilePhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// State of one tile
#[derive(Clone, Debug, Default)]
pub struct TileState {
    pub phase: TilePhase,
    /// Failure message; `Some` only in `Failed`, cleared on the next request
    pub error: Option<String>,
    /// Last successful result. Replaced wholesale by reference swap; a stale
    /// value outlives later failures until a new success overwrites it.
    pub data: Option<Arc<[DataRow]>>,
    /// Configuration-supplied query parameters
    pub query: TileQuery,
}

impl TileState {
    pub fn new(query: TileQuery) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    /// True strictly between request dispatch and its loaded/failed action
    pub fn is_busy(&self) -> bool {
        self.phase == TilePhase::Loading
    }
}

/// Copy of a tile's observable state, published after every transition
#[derive(Clone, Debug, Default)]
pub struct TileSnapshot {
    pub tile_id: String,
    pub phase: TilePhase,
    pub error: Option<String>,
    pub data: Option<Arc<[DataRow]>>,
}

impl TileSnapshot {
    pub fn of(tile_id: &str, state: &TileState) -> Self {
        Self {
            tile_id: tile_id.to_string(),
            phase: state.phase,
            error: state.error.clone(),
            data: state.data.clone(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase == TilePhase::Loading
    }
}
