//! The long-poll loop.
//!
//! One task keeps exactly one `update_boss` call outstanding. The server
//! holds each call for up to the wait budget and answers either with a new
//! snapshot or with the "not changed" code; the client guards each call
//! with a strictly larger hard timeout so a silent server still surfaces as
//! a failure. Any failure suspends the loop until the user decides to retry
//! or abandon. Session teardown cancels the loop through a
//! [`CancellationToken`] without prompting.

use std::sync::Arc;
use std::time::Duration;

use clanraid_types::{ApiRequest, ServerCode};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, ConfigError, into_success};
use crate::store::{SharedStore, SnapshotSource};
use crate::surface::{Notice, NoticeOrigin, RetryDecision, UserSurface};
use crate::transport::Transport;

/// Timing of each long-poll call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    wait_budget: Duration,
    hard_timeout: Duration,
}

impl PollSettings {
    /// Validate and build poll timing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] unless the wait budget is at least
    /// one second and the hard timeout is strictly larger than it.
    pub fn new(wait_budget: Duration, hard_timeout: Duration) -> Result<Self, ConfigError> {
        if wait_budget.as_secs() == 0 {
            return Err(ConfigError::Invalid(String::from(
                "poll wait budget must be at least one second",
            )));
        }
        if hard_timeout <= wait_budget {
            return Err(ConfigError::Invalid(format!(
                "poll hard timeout ({}s) must exceed the wait budget ({}s)",
                hard_timeout.as_secs(),
                wait_budget.as_secs()
            )));
        }
        Ok(Self {
            wait_budget,
            hard_timeout,
        })
    }

    /// How long the server may hold the call.
    pub const fn wait_budget(&self) -> Duration {
        self.wait_budget
    }

    /// Client-side deadline for the call.
    pub const fn hard_timeout(&self) -> Duration {
        self.hard_timeout
    }

    /// The `update_boss` request issued every iteration.
    pub const fn request(&self) -> ApiRequest {
        ApiRequest::UpdateBoss {
            timeout: self.wait_budget.as_secs(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            wait_budget: Duration::from_secs(30),
            hard_timeout: Duration::from_secs(40),
        }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// Session teardown.
    Cancelled,
    /// The user chose not to retry after a failure.
    Abandoned,
}

/// Observable state of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Created, not yet running.
    Idle,
    /// A long-poll call is outstanding.
    Awaiting,
    /// A call failed; waiting for the user's retry/abandon decision.
    BackoffPrompt,
    /// Stopped for good.
    Terminated(PollExit),
}

impl PollState {
    /// Whether the loop has stopped.
    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

/// Result of one successful round trip.
enum PollOutcome {
    Changed,
    Unchanged,
}

pub(crate) struct PollLoop<T, S> {
    transport: Arc<T>,
    surface: Arc<S>,
    store: SharedStore,
    settings: PollSettings,
    cancel: CancellationToken,
    state: watch::Sender<PollState>,
}

impl<T: Transport, S: UserSurface> PollLoop<T, S> {
    /// Start the loop on the current runtime.
    pub(crate) fn spawn(
        transport: Arc<T>,
        surface: Arc<S>,
        store: SharedStore,
        settings: PollSettings,
        cancel: CancellationToken,
    ) -> PollHandle {
        let (state, state_rx) = watch::channel(PollState::Idle);
        let poll = Self {
            transport,
            surface,
            store,
            settings,
            cancel: cancel.clone(),
            state,
        };
        PollHandle {
            cancel,
            state: state_rx,
            task: tokio::spawn(poll.run()),
        }
    }

    async fn run(self) -> PollExit {
        tracing::info!(
            wait_budget_secs = self.settings.wait_budget.as_secs(),
            hard_timeout_secs = self.settings.hard_timeout.as_secs(),
            "long-poll loop started"
        );

        let exit = loop {
            if self.cancel.is_cancelled() {
                break PollExit::Cancelled;
            }
            self.state.send_replace(PollState::Awaiting);

            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break PollExit::Cancelled,
                outcome = self.poll_once() => outcome,
            };

            let error = match outcome {
                Ok(PollOutcome::Changed | PollOutcome::Unchanged) => continue,
                Err(ApiError::Cancelled) => break PollExit::Cancelled,
                Err(error) => error,
            };

            tracing::warn!(error = %error, "long-poll failed, waiting for user decision");
            self.state.send_replace(PollState::BackoffPrompt);

            let decision = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break PollExit::Cancelled,
                decision = self.surface.prompt_retry(&error) => decision,
            };
            match decision {
                RetryDecision::Retry => tracing::info!("retrying long-poll"),
                RetryDecision::Abandon => break PollExit::Abandoned,
            }
        };

        self.state.send_replace(PollState::Terminated(exit));
        tracing::info!(exit = ?exit, "long-poll loop stopped");
        exit
    }

    async fn poll_once(&self) -> Result<PollOutcome, ApiError> {
        let request = self.settings.request();
        let hard_timeout = self.settings.hard_timeout;

        let response = tokio::time::timeout(
            hard_timeout,
            self.transport.call(&request, Some(hard_timeout)),
        )
        .await
        .map_err(|_elapsed| ApiError::Timeout(hard_timeout))??;

        if response.server_code() == ServerCode::NotChanged {
            tracing::trace!("long-poll wait budget elapsed without a change");
            return Ok(PollOutcome::Unchanged);
        }

        let response = into_success(response)?;
        let boss = response.boss_data.ok_or_else(|| {
            ApiError::Decode(String::from("successful poll response carried no bossData"))
        })?;
        self.store.apply(boss, SnapshotSource::Poll);

        if let Some(notice) = response
            .notice
            .and_then(|text| Notice::new(text, NoticeOrigin::Poll))
        {
            self.surface.notify(notice);
        }
        Ok(PollOutcome::Changed)
    }
}

/// Control handle of a running long-poll loop.
#[derive(Debug)]
pub struct PollHandle {
    cancel: CancellationToken,
    state: watch::Receiver<PollState>,
    task: JoinHandle<PollExit>,
}

impl PollHandle {
    /// Current loop state.
    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Receiver that wakes on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    /// Request cancellation. The loop stops without prompting.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the loop to stop.
    pub async fn join(self) -> PollExit {
        match self.task.await {
            Ok(exit) => exit,
            Err(e) => {
                tracing::error!(error = %e, "long-poll task failed");
                PollExit::Cancelled
            }
        }
    }
}
