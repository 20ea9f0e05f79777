//! Background loop that reports phase transitions

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::GameStatusService;
use crate::domain::GamePhase;
use crate::error::Result;
use crate::persistence::GameFilter;

/// A game moved between phases since the previous poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseChange {
    pub game_id: String,
    pub from: Option<GamePhase>,
    pub to: Option<GamePhase>,
    pub at: DateTime<Utc>,
}

pub struct PhaseMonitor {
    status: Arc<GameStatusService>,
    poll_interval: Duration,
    last_seen: HashMap<String, Option<GamePhase>>,
}

impl PhaseMonitor {
    pub fn new(status: Arc<GameStatusService>, poll_interval: Duration) -> Self {
        Self {
            status,
            poll_interval,
            last_seen: HashMap::new(),
        }
    }

    /// Recompute every phase and return the ones that changed.
    ///
    /// A game seen for the first time is recorded without producing a change.
    pub async fn poll_once(&mut self) -> Result<Vec<PhaseChange>> {
        let at = self.status.now();
        let statuses = self.status.statuses_at(at, &GameFilter::all()).await?;
        let mut changes = Vec::new();

        for status in statuses {
            match self.last_seen.insert(status.game.game_id.clone(), status.phase) {
                Some(previous) if previous != status.phase => changes.push(PhaseChange {
                    game_id: status.game.game_id,
                    from: previous,
                    to: status.phase,
                    at,
                }),
                _ => {}
            }
        }

        debug!(
            "Polled {} games, {} phase changes",
            self.last_seen.len(),
            changes.len()
        );
        Ok(changes)
    }

    /// Poll on an interval, forwarding changes to `tx` until `shutdown` turns true
    /// or the receiver goes away. A full channel never delays shutdown.
    pub fn spawn(
        mut self,
        tx: mpsc::Sender<PhaseChange>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut stop = shutdown.clone();
            info!("Phase monitor started, polling every {:?}", self.poll_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let changes = match self.poll_once().await {
                            Ok(changes) => changes,
                            Err(e) => {
                                warn!("Phase poll failed: {}", e);
                                continue;
                            }
                        };

                        for change in changes {
                            info!(
                                "Game {} moved {:?} -> {:?}",
                                change.game_id, change.from, change.to
                            );
                            if !forward(&tx, change, &mut stop).await {
                                info!("Phase monitor stopped while delivering changes");
                                return;
                            }
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Phase monitor stopped");
        })
    }
}

/// Send one change, giving up when shutdown is requested first.
/// Returns false when the monitor should stop.
async fn forward(
    tx: &mpsc::Sender<PhaseChange>,
    change: PhaseChange,
    stop: &mut watch::Receiver<bool>,
) -> bool {
    let send = tx.send(change);
    tokio::pin!(send);

    loop {
        tokio::select! {
            sent = &mut send => {
                if sent.is_err() {
                    debug!("Phase change receiver closed");
                }
                return sent.is_ok();
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    return false;
                }
            }
        }
    }
}
