//! Long-poll state synchronization client for the clan raid boss tracker.
//!
//! Every participant's client mirrors one shared boss state. The client
//! keeps a single long-poll call outstanding to learn about changes made
//! by anyone, and applies inline snapshots returned by its own actions so
//! the caller sees their effect without waiting for the next poll.
//!
//! # Modules
//!
//! - [`config`] -- Endpoint, credentials and timeouts from env or YAML
//! - [`error`] -- `ApiError`, `ConfigError`, `SessionError`
//! - [`transport`] -- The `Transport` seam and its `reqwest` implementation
//! - [`store`] -- Last-applied-wins mirror of the boss state
//! - [`poller`] -- The cancellable long-poll loop
//! - [`dispatcher`] -- One-shot user actions
//! - [`surface`] -- Notices, failures and retry prompts for the user
//! - [`session`] -- Bootstrap and lifecycle

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod poller;
pub mod session;
pub mod store;
pub mod surface;
pub mod transport;

pub use config::SyncConfig;
pub use dispatcher::{ActionDispatcher, ActionOutcome};
pub use error::{ApiError, ConfigError, SessionError};
pub use poller::{PollExit, PollHandle, PollSettings, PollState};
pub use session::Session;
pub use store::{SharedStore, SnapshotSource, StoreView};
pub use surface::{ChannelSurface, Notice, NoticeOrigin, RetryDecision, SurfaceEvent, UserSurface};
pub use transport::{HttpTransport, Transport};
