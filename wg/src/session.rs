//! Dashboard session - the actor that owns the bus and every store
//!
//! One session is one isolated dashboard: its own bus, its own stores, its
//! own propagator. Nothing here is process-global, so tests (and several
//! dashboards in one process) run side by side without touching each other.
//!
//! The session task is the single logical thread of control: external
//! triggers and fetch completions both arrive as channel messages and are
//! dispatched one at a time. Spawned fetches are the only concurrency, and
//! they re-enter through the completion channel.

use std::collections::HashMap;
use std::sync::Arc;

use eyre::{Result, WrapErr, eyre};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::actions::{Action, ActionBus, ActionHandler, ActionLogger, SubscriptionId};
use crate::api::DataSource;
use crate::config::Config;
use crate::subquery::{SubqueryPropagator, validate_edges};
use crate::tiles::{SubqueryExtract, TileSnapshot, TileStore};

const CHANNEL_BUFFER: usize = 256;

/// Commands accepted by the session actor
enum SessionCommand {
    Dispatch(Action),
    AwaitIdle { reply: oneshot::Sender<()> },
    Shutdown,
}

/// One dashboard session, ready to run
pub struct DashboardSession {
    session_id: uuid::Uuid,
    bus: ActionBus,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    completion_rx: mpsc::Receiver<Action>,
    /// Fetches spawned but not yet completed
    in_flight: u32,
    idle_waiters: Vec<oneshot::Sender<()>>,
}

/// Cloneable handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
    snapshots: HashMap<String, watch::Receiver<TileSnapshot>>,
}

impl std::fmt::Debug for DashboardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardSession")
            .field("session_id", &self.session_id)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("tiles", &self.snapshots.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl DashboardSession {
    /// Build a session from configuration plus one data source per tile
    ///
    /// Refuses to build when the dependency-edge configuration is defective
    /// (cycles, unknown ids, projection mismatches) or a tile has no source.
    pub fn build(
        config: &Config,
        mut sources: HashMap<String, Arc<dyn DataSource>>,
    ) -> Result<(Self, SessionHandle)> {
        let session_id = uuid::Uuid::now_v7();

        let tiles: HashMap<String, Option<SubqueryExtract>> = config
            .tiles
            .iter()
            .map(|tile| (tile.id.clone(), tile.subquery))
            .collect();
        validate_edges(&tiles, &config.edges).wrap_err("invalid dependency-edge configuration")?;

        let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (completion_tx, completion_rx) = mpsc::channel(CHANNEL_BUFFER);

        let mut bus = ActionBus::new();
        let mut snapshots = HashMap::new();
        for tile in &config.tiles {
            let source = sources
                .remove(&tile.id)
                .ok_or_else(|| eyre!("No data source for tile {}", tile.id))?;
            let waits_for_subquery = config.edges.iter().any(|edge| edge.consumer == tile.id);
            let (store, snapshot_rx) = TileStore::new(
                tile.id.clone(),
                tile.query.clone(),
                source,
                completion_tx.clone(),
                tile.subquery,
                waits_for_subquery,
            );
            snapshots.insert(tile.id.clone(), snapshot_rx);
            bus.subscribe(Box::new(store));
        }
        bus.subscribe(Box::new(SubqueryPropagator::new(config.edges.clone())));

        if let Some(dir) = &config.action_log_dir {
            let logger = ActionLogger::create(dir, session_id)
                .wrap_err("failed to set up the action log")?;
            debug!(path = %logger.path().display(), "action log enabled");
            bus.subscribe(Box::new(logger));
        }

        info!(
            %session_id,
            tiles = config.tiles.len(),
            edges = config.edges.len(),
            "dashboard session ready"
        );

        Ok((
            Self {
                session_id,
                bus,
                cmd_rx,
                completion_rx,
                in_flight: 0,
                idle_waiters: Vec::new(),
            },
            SessionHandle { cmd_tx, snapshots },
        ))
    }

    /// Attach an additional bus subscriber (metrics, alternative logs)
    pub fn observe(&mut self, handler: Box<dyn ActionHandler>) -> SubscriptionId {
        self.bus.subscribe(handler)
    }

    /// Run the session until shutdown or until every handle is dropped
    ///
    /// This consumes the session. Completions still in flight at teardown
    /// are never processed.
    pub async fn run(mut self) {
        debug!(session_id = %self.session_id, "session loop started");

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(SessionCommand::Dispatch(action)) => self.process(action),
                    Some(SessionCommand::AwaitIdle { reply }) => {
                        if self.in_flight == 0 {
                            let _ = reply.send(());
                        } else {
                            self.idle_waiters.push(reply);
                        }
                    }
                    Some(SessionCommand::Shutdown) | None => break,
                },
                Some(action) = self.completion_rx.recv() => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.process(action);
                }
            }
        }

        info!(session_id = %self.session_id, "session stopped");
    }

    fn process(&mut self, action: Action) {
        let report = self.bus.dispatch(action);
        self.in_flight += report.fetches_started;
        if self.in_flight == 0 {
            for waiter in self.idle_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }
}

impl SessionHandle {
    /// Put an action on the session's bus
    pub async fn dispatch(&self, action: Action) -> Result<()> {
        self.cmd_tx
            .send(SessionCommand::Dispatch(action))
            .await
            .map_err(|_| eyre!("Session closed"))
    }

    /// Broadcast a query: every tile without producer dependencies reloads
    pub async fn submit_query(&self, query: impl Into<String>) -> Result<()> {
        self.dispatch(Action::QuerySubmitted {
            query: query.into(),
        })
        .await
    }

    /// Resolve once no fetch is in flight
    ///
    /// Propagator-triggered follow-up fetches count as in flight, so after
    /// this returns the whole dependency cascade has settled.
    pub async fn settled(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::AwaitIdle { reply: tx })
            .await
            .map_err(|_| eyre!("Session closed"))?;
        rx.await.map_err(|_| eyre!("Session closed"))
    }

    /// Latest observable state of one tile
    pub fn tile(&self, tile_id: &str) -> Option<TileSnapshot> {
        self.snapshots.get(tile_id).map(|rx| rx.borrow().clone())
    }

    /// Ids of all configured tiles (unordered)
    pub fn tile_ids(&self) -> impl Iterator<Item = &str> {
        self.snapshots.keys().map(String::as_str)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.cmd_tx
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| eyre!("Session closed"))
    }
}
