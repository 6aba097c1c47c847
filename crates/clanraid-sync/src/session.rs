//! Session lifecycle: bootstrap, polling, teardown.
//!
//! A [`Session`] owns the transport, the user surface, the shared store,
//! and the cancellation token of its single long-poll loop. Bootstrap
//! fetches group data and the roster once; if either call fails the error
//! is returned and no session exists.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clanraid_types::{ApiRequest, Roster, SessionData, members_from};
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::dispatcher::ActionDispatcher;
use crate::error::{SessionError, into_success};
use crate::poller::{PollHandle, PollLoop, PollSettings};
use crate::store::SharedStore;
use crate::surface::UserSurface;
use crate::transport::{HttpTransport, Transport};

/// A bootstrapped connection to one group's boss tracker.
pub struct Session<T, S> {
    transport: Arc<T>,
    surface: Arc<S>,
    store: SharedStore,
    data: SessionData,
    settings: PollSettings,
    cancel: CancellationToken,
    polling: AtomicBool,
}

impl<S: UserSurface> Session<HttpTransport, S> {
    /// Build the HTTP transport from configuration and bootstrap.
    pub async fn connect(config: &SyncConfig, surface: S) -> Result<Self, SessionError> {
        config.validate()?;
        let transport = HttpTransport::new(config)?;
        tracing::info!(
            endpoint = transport.endpoint(),
            group_id = %config.group_id,
            "connecting to clan battle endpoint"
        );
        Self::bootstrap(transport, surface, config.poll_settings()?).await
    }
}

impl<T: Transport, S: UserSurface> Session<T, S> {
    /// Fetch group data and the roster, then build the store.
    ///
    /// The snapshot from `get_data` becomes store revision `0`.
    pub async fn bootstrap(
        transport: T,
        surface: S,
        settings: PollSettings,
    ) -> Result<Self, SessionError> {
        let response = into_success(transport.call(&ApiRequest::GetData, None).await?)?;
        let data = SessionData::try_from(&response)?;

        let response = into_success(transport.call(&ApiRequest::GetMemberList, None).await?)?;
        let roster = Roster::from_members(members_from(&response)?);

        tracing::info!(
            group_id = %data.group.group_id,
            game_server = %data.group.game_server,
            members = roster.len(),
            is_admin = data.is_admin,
            boss = %data.boss,
            "session bootstrapped"
        );

        Ok(Self {
            transport: Arc::new(transport),
            surface: Arc::new(surface),
            store: SharedStore::new(data.boss, roster),
            data,
            settings,
            cancel: CancellationToken::new(),
            polling: AtomicBool::new(false),
        })
    }

    /// Data returned by `get_data` at bootstrap.
    pub const fn data(&self) -> &SessionData {
        &self.data
    }

    /// Handle to the shared boss state.
    pub const fn store(&self) -> &SharedStore {
        &self.store
    }

    /// A dispatcher for user actions. Cheap to clone and use concurrently.
    pub fn dispatcher(&self) -> ActionDispatcher<T, S> {
        ActionDispatcher::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.surface),
            self.store.clone(),
        )
    }

    /// Start the session's long-poll loop.
    ///
    /// A session polls at most once in its lifetime: an abandoned loop is
    /// not restarted by calling this again.
    pub fn start_polling(&self) -> Result<PollHandle, SessionError> {
        if self.polling.swap(true, Ordering::AcqRel) {
            return Err(SessionError::AlreadyPolling);
        }
        Ok(PollLoop::spawn(
            Arc::clone(&self.transport),
            Arc::clone(&self.surface),
            self.store.clone(),
            self.settings,
            self.cancel.child_token(),
        ))
    }

    /// Cancel the long-poll loop, if running. Idempotent.
    pub fn shutdown(&self) {
        tracing::info!("session shutting down");
        self.cancel.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
