//! Action Bus - the single ordered dispatch channel
//!
//! Every tile-state transition and every cross-tile data flow goes through
//! one bus. Delivery is synchronous and in dispatch order; there is no other
//! shared mutable state, which makes dispatch the global serialization point.

use std::collections::VecDeque;

use tracing::trace;

use super::types::Action;

/// A registered bus subscriber
///
/// Handlers never call back into the bus; follow-up actions go through the
/// [`Effects`] sink and are delivered after the current action has reached
/// every subscriber. Taking the bus by `&mut self` in `dispatch` makes
/// re-entrant dispatch unrepresentable, so the trampoline is enforced by the
/// borrow checker rather than a runtime flag.
pub trait ActionHandler: Send {
    fn handle(&mut self, action: &Action, effects: &mut Effects);
}

/// Side-effect sink handed to handlers during delivery
#[derive(Debug, Default)]
pub struct Effects {
    queued: Vec<Action>,
    fetches_started: u32,
}

impl Effects {
    /// Queue a follow-up action; drained once the current one is delivered
    pub fn dispatch(&mut self, action: Action) {
        self.queued.push(action);
    }

    /// Record that an async fetch was spawned while handling the action
    pub fn fetch_started(&mut self) {
        self.fetches_started += 1;
    }

    /// Actions queued so far (test aid)
    pub fn queued(&self) -> &[Action] {
        &self.queued
    }

    /// Fetches started so far (test aid)
    pub fn fetches_started(&self) -> u32 {
        self.fetches_started
    }
}

/// Identifies a subscription for later removal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// What a single `dispatch` call ended up doing, trampolined actions included
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub actions_delivered: u32,
    pub fetches_started: u32,
}

/// The ordered dispatch channel all components subscribe to
pub struct ActionBus {
    handlers: Vec<(SubscriptionId, Box<dyn ActionHandler>)>,
    next_id: u64,
}

impl ActionBus {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a handler; it receives every subsequent action in order
    pub fn subscribe(&mut self, handler: Box<dyn ActionHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    /// Remove a handler; returns false when the id is unknown
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }

    /// Deliver `action` to every subscriber, then drain queued re-dispatches
    ///
    /// Each action (the external one and everything trampolined off it) is
    /// fully delivered to all subscribers before the next queued one starts.
    pub fn dispatch(&mut self, action: Action) -> DispatchReport {
        let mut queue = VecDeque::new();
        queue.push_back(action);

        let mut report = DispatchReport::default();
        while let Some(action) = queue.pop_front() {
            trace!(name = action.name(), tile_id = ?action.tile_id(), "dispatch");
            let mut effects = Effects::default();
            for (_, handler) in self.handlers.iter_mut() {
                handler.handle(&action, &mut effects);
            }
            report.actions_delivered += 1;
            report.fetches_started += effects.fetches_started;
            queue.extend(effects.queued);
        }
        report
    }
}

impl Default for ActionBus {
    fn default() -> Self {
        Self::new()
    }
}
