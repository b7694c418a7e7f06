//! WordGlance - corpus dashboard coordination engine
//!
//! A dashboard is a set of independently configured tiles, each querying one
//! remote corpus statistics source. This crate is the coordination core that
//! holds them together:
//!
//! - [`actions`] - the action bus and the closed action vocabulary; the only
//!   way components communicate
//! - [`tiles`] - the per-tile state machine (`Idle → Loading → Loaded/Failed`)
//!   and the pure query-argument builder
//! - [`subquery`] - dependency edges between tiles and the propagator that
//!   turns a producer tile's result into a consumer tile's query
//! - [`session`] - the actor owning one isolated dashboard instance
//! - [`api`] - the data-source abstraction and its HTTP implementation
//! - [`errors`] - the closed error taxonomy and its status-code mapping
//! - [`config`] - YAML configuration (tiles, query defaults, edges)
//!
//! A tile's failure never crosses tile boundaries: a failing producer simply
//! never reports, and its consumers keep whatever they last showed.

pub mod actions;
pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod session;
pub mod subquery;
pub mod tiles;

// Re-export commonly used types
pub use actions::{
    Action, ActionBus, ActionHandler, ActionLogEntry, ActionLogger, ApiResponse, DataRow,
    DispatchReport, Effects, FreqRange, QueryOverride, SubqueryPayload, SubqueryValue,
    SubscriptionId, read_action_log,
};
pub use api::{DataSource, HttpDataSource};
pub use config::{Config, TileConfig};
pub use errors::{ErrorKind, FetchError, status_for_tag};
pub use session::{DashboardSession, SessionHandle};
pub use subquery::{DependencyEdge, GraphError, Projection, SubqueryPropagator, validate_edges};
pub use tiles::{
    QueryArgs, SubqueryExtract, TilePhase, TileQuery, TileSnapshot, TileState, TileStore,
    build_query_args,
};
