//! The user-facing boundary of the sync client.
//!
//! Notices, failed actions, and retry prompts all leave the client through
//! [`UserSurface`]. A console front end, a GUI, or a test harness implements
//! it; [`ChannelSurface`] forwards everything onto an mpsc channel so the
//! consumer can handle events in its own task.

use std::future::Future;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::error::ApiError;

/// Which response carried a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeOrigin {
    /// A long-poll response.
    Poll,
    /// A successful action, tagged with the action name.
    Action(&'static str),
}

/// A one-shot, server-authored message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Message text, never empty.
    pub text: String,
    /// Response that carried it.
    pub origin: NoticeOrigin,
    /// When the client received it.
    pub received_at: DateTime<Utc>,
}

impl Notice {
    /// Wrap a server notice, dropping empty text.
    pub fn new(text: impl Into<String>, origin: NoticeOrigin) -> Option<Self> {
        let text = text.into();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text,
            origin,
            received_at: Utc::now(),
        })
    }
}

/// The user's answer to a long-poll failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Issue the long-poll again.
    Retry,
    /// Stop the long-poll loop for this session.
    Abandon,
}

/// Where notices, failures and retry prompts are delivered.
pub trait UserSurface: Send + Sync + 'static {
    /// Show a notice once.
    fn notify(&self, notice: Notice);

    /// Report a failed user action with the server's message.
    fn report_failure(&self, action: &'static str, error: &ApiError);

    /// Ask whether to retry a failed long-poll. Resolves when the user answers.
    fn prompt_retry(&self, error: &ApiError) -> impl Future<Output = RetryDecision> + Send;
}

/// An event emitted by [`ChannelSurface`].
#[derive(Debug)]
pub enum SurfaceEvent {
    /// A notice to display.
    Notice(Notice),
    /// A user action failed.
    ActionFailed {
        /// Wire action tag.
        action: &'static str,
        /// What went wrong.
        error: ApiError,
    },
    /// The long-poll failed and waits for a decision.
    RetryPrompt {
        /// What went wrong.
        error: ApiError,
        /// Answer channel; dropping it counts as [`RetryDecision::Abandon`].
        reply: oneshot::Sender<RetryDecision>,
    },
}

/// [`UserSurface`] that forwards every event onto an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSurface {
    tx: mpsc::UnboundedSender<SurfaceEvent>,
}

impl ChannelSurface {
    /// Create the surface and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SurfaceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: SurfaceEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("surface receiver dropped, event discarded");
        }
    }
}

impl UserSurface for ChannelSurface {
    fn notify(&self, notice: Notice) {
        self.emit(SurfaceEvent::Notice(notice));
    }

    fn report_failure(&self, action: &'static str, error: &ApiError) {
        self.emit(SurfaceEvent::ActionFailed {
            action,
            error: error.clone(),
        });
    }

    async fn prompt_retry(&self, error: &ApiError) -> RetryDecision {
        let (reply, answer) = oneshot::channel();
        self.emit(SurfaceEvent::RetryPrompt {
            error: error.clone(),
            reply,
        });
        answer.await.unwrap_or(RetryDecision::Abandon)
    }
}
