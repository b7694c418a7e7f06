//! Cross-tile data flow: dependency edges and the propagator that walks them

mod graph;
mod propagator;

pub use graph::{DependencyEdge, GraphError, Projection, validate_edges};
pub use propagator::SubqueryPropagator;
