//! Subquery Propagator - turns producer results into consumer queries
//!
//! The propagator is the only place one tile influences another. It watches
//! data-loaded actions for subquery payloads and, once a consumer has heard
//! from every one of its producers, fires that consumer exactly once with the
//! merged overrides. A failing producer simply never reports, so its
//! consumers keep whatever they last showed.

use std::collections::HashMap;

use tracing::debug;

use crate::actions::{Action, ActionHandler, Effects, QueryOverride, SubqueryValue};

use super::graph::DependencyEdge;

/// Bus subscriber that drives dependent tiles
pub struct SubqueryPropagator {
    edges: Vec<DependencyEdge>,
    /// consumer -> (producer -> latest value since the consumer last fired)
    ///
    /// Cleared per consumer on trigger, so every new round of producer
    /// completions re-arms it; a producer reporting twice before the round
    /// completes just refreshes its value.
    pending: HashMap<String, HashMap<String, SubqueryValue>>,
}

impl SubqueryPropagator {
    pub fn new(edges: Vec<DependencyEdge>) -> Self {
        Self {
            edges,
            pending: HashMap::new(),
        }
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }
}

impl ActionHandler for SubqueryPropagator {
    fn handle(&mut self, action: &Action, effects: &mut Effects) {
        let Action::TileDataLoaded {
            subquery: Some(payload),
            ..
        } = action
        else {
            return;
        };

        // Record the fresh value on every edge this producer feeds
        let mut touched: Vec<String> = Vec::new();
        for edge in &self.edges {
            if edge.producer != payload.tile_id {
                continue;
            }
            self.pending
                .entry(edge.consumer.clone())
                .or_default()
                .insert(edge.producer.clone(), payload.value.clone());
            if !touched.contains(&edge.consumer) {
                touched.push(edge.consumer.clone());
            }
        }

        // Fire each consumer whose producers have now all reported
        for consumer in touched {
            let ready = self
                .edges
                .iter()
                .filter(|edge| edge.consumer == consumer)
                .all(|edge| {
                    self.pending
                        .get(&consumer)
                        .is_some_and(|values| values.contains_key(&edge.producer))
                });
            if !ready {
                debug!(%consumer, "consumer still waiting for other producers");
                continue;
            }

            let values = self.pending.remove(&consumer).unwrap_or_default();
            let mut overrides = QueryOverride::default();
            for edge in self.edges.iter().filter(|edge| edge.consumer == consumer) {
                if let Some(value) = values.get(&edge.producer) {
                    edge.projection.apply(value, &mut overrides);
                }
            }

            debug!(%consumer, ?overrides, "triggering dependent tile");
            effects.dispatch(Action::TileRequestData {
                tile_id: consumer,
                overrides: Some(overrides),
            });
        }
    }
}
