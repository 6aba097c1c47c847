//! Boss state snapshot and the boss-number target used by subscriptions.
//!
//! A server snapshot is authoritative: decoding through [`RawBossState`]
//! accepts whatever the server holds, including states an admin override
//! can leave behind (health above the pool, boss number `0`). Callers that
//! care use [`BossState::check`]. [`BossState::new`] is the validated
//! constructor for locally built states.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::ids::MemberId;

/// Ways a boss snapshot breaks the usual health invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// Boss numbers start at 1.
    #[error("boss number must be at least 1")]
    ZeroBossNum,

    /// A boss with no health pool cannot be fought.
    #[error("full health must be positive")]
    ZeroFullHealth,

    /// Remaining health is larger than the boss's health pool.
    #[error("health {health} exceeds full health {full_health}")]
    HealthExceedsFull {
        /// Remaining health reported by the server.
        health: u64,
        /// Full health reported by the server.
        full_health: u64,
    },
}

/// The shared boss state every client mirrors.
///
/// Replaced wholesale on every snapshot; the client never patches single
/// fields or decrements health locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawBossState")]
pub struct BossState {
    /// Raid cycle (day / rotation counter).
    pub cycle: u32,
    /// Which boss of the rotation is current, starting at 1.
    pub num: u32,
    /// Remaining health. Normally at most `full_health`, but an admin
    /// override may push it above.
    pub health: u64,
    /// Health pool of the current boss.
    pub full_health: u64,
    /// Member currently holding the turn application, if any.
    pub challenger: Option<MemberId>,
}

/// Unvalidated wire form of a boss snapshot.
///
/// The server reports "no challenger" either as `null` or as `0`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBossState {
    /// Raid cycle.
    pub cycle: u32,
    /// Boss number.
    pub num: u32,
    /// Remaining health.
    pub health: u64,
    /// Health pool.
    pub full_health: u64,
    /// Challenger id, `0` or absent when nobody holds the turn.
    #[serde(default)]
    pub challenger: Option<u64>,
}

impl From<RawBossState> for BossState {
    fn from(raw: RawBossState) -> Self {
        Self {
            cycle: raw.cycle,
            num: raw.num,
            health: raw.health,
            full_health: raw.full_health,
            challenger: raw.challenger.filter(|id| *id != 0).map(MemberId),
        }
    }
}

impl BossState {
    /// Build a validated snapshot with no challenger.
    pub const fn new(
        cycle: u32,
        num: u32,
        health: u64,
        full_health: u64,
    ) -> Result<Self, SnapshotError> {
        let state = Self {
            cycle,
            num,
            health,
            full_health,
            challenger: None,
        };
        match state.check() {
            Ok(()) => Ok(state),
            Err(e) => Err(e),
        }
    }

    /// Whether the snapshot keeps `num >= 1` and `health <= full_health > 0`.
    pub const fn check(&self) -> Result<(), SnapshotError> {
        if self.num == 0 {
            return Err(SnapshotError::ZeroBossNum);
        }
        if self.full_health == 0 {
            return Err(SnapshotError::ZeroFullHealth);
        }
        if self.health > self.full_health {
            return Err(SnapshotError::HealthExceedsFull {
                health: self.health,
                full_health: self.full_health,
            });
        }
        Ok(())
    }

    /// Return a copy with the given challenger.
    #[must_use]
    pub const fn with_challenger(mut self, challenger: Option<MemberId>) -> Self {
        self.challenger = challenger;
        self
    }

    /// Remaining health in thousandths of the full pool, capped at 1000.
    pub fn health_per_mille(&self) -> u64 {
        u128::from(self.health)
            .saturating_mul(1000)
            .checked_div(u128::from(self.full_health))
            .map_or(1000, |scaled| u64::try_from(scaled.min(1000)).unwrap_or(1000))
    }
}

impl core::fmt::Display for BossState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "cycle {}, boss {}: {}/{}",
            self.cycle, self.num, self.health, self.full_health
        )
    }
}

/// Target of a subscribe/unsubscribe command.
///
/// On the wire this is a plain integer where `0` is a sentinel the server
/// interprets as "the current boss" (in chat bot terms,
/// "hanging on the tree"). The client never resolves it to a real index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum BossTarget {
    /// The `0` sentinel.
    Current,
    /// An explicit boss number.
    Boss(NonZeroU32),
}

impl BossTarget {
    /// Build a target from a boss number; `0` maps to [`BossTarget::Current`].
    pub const fn from_num(num: u32) -> Self {
        match NonZeroU32::new(num) {
            Some(num) => Self::Boss(num),
            None => Self::Current,
        }
    }

    /// The integer sent as `boss_num`.
    pub const fn wire_value(self) -> u32 {
        match self {
            Self::Current => 0,
            Self::Boss(num) => num.get(),
        }
    }
}

impl From<u32> for BossTarget {
    fn from(num: u32) -> Self {
        Self::from_num(num)
    }
}

impl From<BossTarget> for u32 {
    fn from(target: BossTarget) -> Self {
        target.wire_value()
    }
}
