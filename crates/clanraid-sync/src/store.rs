//! Client-side mirror of the shared boss state.
//!
//! The store holds the most recently applied snapshot and a local revision
//! counter. Two writers exist (the long-poll loop and the action dispatcher)
//! and the rule between them is last-applied-wins: each snapshot replaces
//! the previous one wholesale and bumps the revision. Readers either take
//! the current view or subscribe to changes through a `tokio::sync::watch`
//! channel.

use std::sync::Arc;

use clanraid_types::{BossState, Roster};
use tokio::sync::watch;

/// Where an applied snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// The `get_data` call at session start.
    Bootstrap,
    /// A long-poll response.
    Poll,
    /// A successful action response, tagged with the action name.
    Action(&'static str),
}

impl core::fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bootstrap => write!(f, "bootstrap"),
            Self::Poll => write!(f, "poll"),
            Self::Action(action) => write!(f, "action:{action}"),
        }
    }
}

/// The store's current contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreView {
    /// Last applied snapshot.
    pub boss: BossState,
    /// Number of snapshots applied since bootstrap (bootstrap is `0`).
    pub revision: u64,
    /// Origin of the last applied snapshot.
    pub source: SnapshotSource,
}

/// Cheaply cloneable handle to the boss state mirror.
#[derive(Debug, Clone)]
pub struct SharedStore {
    tx: Arc<watch::Sender<StoreView>>,
    roster: Arc<Roster>,
}

impl SharedStore {
    pub(crate) fn new(boss: BossState, roster: Roster) -> Self {
        let (tx, _rx) = watch::channel(StoreView {
            boss,
            revision: 0,
            source: SnapshotSource::Bootstrap,
        });
        Self {
            tx: Arc::new(tx),
            roster: Arc::new(roster),
        }
    }

    /// Replace the snapshot and return the new revision.
    ///
    /// Server snapshots are applied as delivered, even ones outside the
    /// usual health invariants.
    pub(crate) fn apply(&self, boss: BossState, source: SnapshotSource) -> u64 {
        if let Err(anomaly) = boss.check() {
            tracing::warn!(source = %source, %anomaly, "applying irregular boss snapshot");
        }
        let mut revision = 0;
        self.tx.send_modify(|view| {
            view.boss = boss;
            view.revision = view.revision.saturating_add(1);
            view.source = source;
            revision = view.revision;
        });
        tracing::debug!(
            revision,
            source = %source,
            cycle = boss.cycle,
            num = boss.num,
            health = boss.health,
            "boss snapshot applied"
        );
        revision
    }

    /// Current boss snapshot.
    pub fn boss(&self) -> BossState {
        self.tx.borrow().boss
    }

    /// Current snapshot with its revision and origin.
    pub fn view(&self) -> StoreView {
        *self.tx.borrow()
    }

    /// Receiver that wakes on every applied snapshot.
    pub fn subscribe(&self) -> watch::Receiver<StoreView> {
        self.tx.subscribe()
    }

    /// Roster fetched at bootstrap.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Display label of the member holding the turn, if any.
    pub fn challenger_label(&self) -> Option<String> {
        self.boss().challenger.map(|id| self.roster.label(id))
    }
}
