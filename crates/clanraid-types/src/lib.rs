//! Shared wire vocabulary for the clan raid boss tracker.
//!
//! Both the synchronization client and the in-process fake backends used
//! by its tests speak these types, so the JSON shape lives in one place.
//!
//! # Modules
//!
//! - [`ids`] -- Integer newtypes for members and groups
//! - [`boss`] -- Validated boss snapshot and the subscription boss target
//! - [`member`] -- Participants and the bootstrap roster
//! - [`api`] -- Action-tagged requests, the response envelope, server codes

pub mod api;
pub mod boss;
pub mod ids;
pub mod member;

// Re-export all public types at crate root for convenience.
pub use api::{
    ApiRequest, ApiResponse, GroupData, PayloadError, ServerCode, SessionData, Subscriber,
    members_from,
};
pub use boss::{BossState, BossTarget, RawBossState, SnapshotError};
pub use ids::{GroupId, MemberId};
pub use member::{Member, Roster};
