//! Dependency-edge configuration and its startup validation
//!
//! The edge set is static; everything that can be wrong with it is caught
//! once, before the session starts, and refuses startup. A dashboard with a
//! malformed graph never runs half-wired.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::actions::{QueryOverride, SubqueryValue};
use crate::tiles::SubqueryExtract;

/// How a producer's subquery value lands in the consumer's query
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Projection {
    /// `MaxCount` becomes the consumer's `limit`
    CountAsLimit,
    /// `ConcId` replaces the consumer's own concordance id
    ConcIdAsQuery,
    /// `FreqRange` becomes the consumer's `srchRange` window
    RangeAsSearchWindow,
}

impl Projection {
    /// Whether this projection can consume what the producer extracts
    fn accepts(self, extract: SubqueryExtract) -> bool {
        matches!(
            (self, extract),
            (Projection::CountAsLimit, SubqueryExtract::MaxCount)
                | (Projection::ConcIdAsQuery, SubqueryExtract::ConcId)
                | (Projection::RangeAsSearchWindow, SubqueryExtract::FreqRange)
        )
    }

    /// Merge a producer value into a consumer override
    pub fn apply(self, value: &SubqueryValue, overrides: &mut QueryOverride) {
        match (self, value) {
            (Projection::CountAsLimit, SubqueryValue::MaxCount(count)) => {
                overrides.limit = Some(*count);
            }
            (Projection::ConcIdAsQuery, SubqueryValue::ConcId(id)) => {
                overrides.conc_id = Some(id.clone());
            }
            (Projection::RangeAsSearchWindow, SubqueryValue::FreqRange(range)) => {
                overrides.srch_range = Some(*range);
            }
            // Kind mismatches are rejected by validate_edges before a
            // session ever runs
            _ => {}
        }
    }
}

/// Static producer→consumer wiring
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub producer: String,
    pub consumer: String,
    pub projection: Projection,
}

/// Defects in the edge configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Edge references unknown producer tile: {0}")]
    UnknownProducer(String),

    #[error("Edge references unknown consumer tile: {0}")]
    UnknownConsumer(String),

    #[error("Producer tile {0} declares no subquery rule")]
    MissingSubquery(String),

    #[error("Edge {producer} -> {consumer}: projection cannot consume the producer's subquery value")]
    ProjectionMismatch { producer: String, consumer: String },

    #[error("Duplicate edge: {producer} -> {consumer}")]
    DuplicateEdge { producer: String, consumer: String },

    #[error("Dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// Validate the edge set against the declared tiles
///
/// `tiles` maps every tile id to its subquery rule (or `None` for plain
/// consumers). Cycle detection is DFS with a recursion stack: a back edge is
/// a cycle.
pub fn validate_edges(
    tiles: &HashMap<String, Option<SubqueryExtract>>,
    edges: &[DependencyEdge],
) -> Result<(), GraphError> {
    let mut seen_pairs = HashSet::new();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

    for edge in edges {
        let Some(extract) = tiles.get(&edge.producer) else {
            return Err(GraphError::UnknownProducer(edge.producer.clone()));
        };
        if !tiles.contains_key(&edge.consumer) {
            return Err(GraphError::UnknownConsumer(edge.consumer.clone()));
        }
        let Some(extract) = extract else {
            return Err(GraphError::MissingSubquery(edge.producer.clone()));
        };
        if !edge.projection.accepts(*extract) {
            return Err(GraphError::ProjectionMismatch {
                producer: edge.producer.clone(),
                consumer: edge.consumer.clone(),
            });
        }
        if !seen_pairs.insert((edge.producer.as_str(), edge.consumer.as_str())) {
            return Err(GraphError::DuplicateEdge {
                producer: edge.producer.clone(),
                consumer: edge.consumer.clone(),
            });
        }
        adjacency
            .entry(edge.producer.as_str())
            .or_default()
            .push(edge.consumer.as_str());
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();
    let nodes: Vec<&str> = adjacency.keys().copied().collect();
    for node in nodes {
        if !visited.contains(node)
            && has_cycle_dfs(node, &adjacency, &mut visited, &mut rec_stack, &mut path)
        {
            return Err(GraphError::Cycle(path));
        }
    }

    debug!(edges = edges.len(), "dependency edges validated");
    Ok(())
}

/// DFS helper for cycle detection
fn has_cycle_dfs<'a>(
    node: &'a str,
    adjacency: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<String>,
) -> bool {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node.to_string());

    if let Some(consumers) = adjacency.get(node) {
        for consumer in consumers {
            if !visited.contains(consumer) {
                if has_cycle_dfs(consumer, adjacency, visited, rec_stack, path) {
                    return true;
                }
            } else if rec_stack.contains(consumer) {
                path.push((*consumer).to_string());
                return true;
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    false
}
