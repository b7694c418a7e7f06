//! Action-dispatch core
//!
//! One bus, one closed action vocabulary, one serialization point. Tile
//! stores and the subquery propagator subscribe to the bus; the session actor
//! feeds it.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       ACTION BUS                          │
//! │        synchronous, ordered, trampolined dispatch         │
//! └──────────────────────────────────────────────────────────┘
//!     ↑ dispatch                 ↓ handle (in subscription order)
//!
//!  Session actor          TileStore (per tile)     SubqueryPropagator
//!  - external triggers    - RequestData → fetch    - DataLoaded payloads
//!  - fetch completions    - Response → Loaded/     - trigger consumers
//!                           Failed + DataLoaded/     with injected
//!                           DataFailed               overrides
//! ```

mod bus;
mod logger;
mod types;

pub use bus::{ActionBus, ActionHandler, DispatchReport, Effects, SubscriptionId};
pub use logger::{ActionLogger, read_action_log};
pub use types::{
    Action, ActionLogEntry, ApiResponse, DataRow, FreqRange, QueryOverride, SubqueryPayload,
    SubqueryValue,
};
