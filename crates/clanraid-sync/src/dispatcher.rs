//! User intents translated into one-shot API calls.
//!
//! Every intent is exactly one call with a fixed payload shape. A
//! successful response may carry an inline boss snapshot, which is applied
//! to the store the same way a poll result is, and an optional notice for
//! the user. A failed call is reported to the surface with the server's
//! message and leaves the store untouched. Actions never retry and never
//! interact with the long-poll loop.

use std::sync::Arc;

use clanraid_types::{ApiRequest, ApiResponse, BossState, BossTarget, MemberId, Subscriber};

use crate::error::{ApiError, into_success};
use crate::store::{SharedStore, SnapshotSource};
use crate::surface::{Notice, NoticeOrigin, UserSurface};
use crate::transport::Transport;

/// What a successful action changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Snapshot applied from the response, if it carried one.
    pub snapshot: Option<BossState>,
    /// Store revision after applying the snapshot.
    pub revision: Option<u64>,
    /// Notice text delivered to the surface.
    pub notice: Option<String>,
}

/// Issues user actions against the shared transport.
pub struct ActionDispatcher<T, S> {
    transport: Arc<T>,
    surface: Arc<S>,
    store: SharedStore,
}

impl<T, S> Clone for ActionDispatcher<T, S> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            surface: Arc::clone(&self.surface),
            store: self.store.clone(),
        }
    }
}

impl<T: Transport, S: UserSurface> ActionDispatcher<T, S> {
    pub(crate) const fn new(transport: Arc<T>, surface: Arc<S>, store: SharedStore) -> Self {
        Self {
            transport,
            surface,
            store,
        }
    }

    /// The store this dispatcher writes inline snapshots to.
    pub const fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Record a hit for the caller, or for `behalf` when reporting for
    /// someone else.
    pub async fn record_damage(
        &self,
        damage: u64,
        behalf: Option<MemberId>,
    ) -> Result<ActionOutcome, ApiError> {
        self.dispatch(ApiRequest::AddRecord {
            defeat: false,
            damage: Some(damage),
            behalf,
        })
        .await
    }

    /// Record a hit that finished the boss.
    pub async fn record_defeat(&self, behalf: Option<MemberId>) -> Result<ActionOutcome, ApiError> {
        self.dispatch(ApiRequest::AddRecord {
            defeat: true,
            damage: None,
            behalf,
        })
        .await
    }

    /// Undo the caller's last record.
    pub async fn undo(&self) -> Result<ActionOutcome, ApiError> {
        self.dispatch(ApiRequest::Undo).await
    }

    /// Apply for the exclusive attack turn.
    pub async fn apply_for_turn(&self) -> Result<ActionOutcome, ApiError> {
        self.dispatch(ApiRequest::Apply).await
    }

    /// Release the attack turn.
    pub async fn cancel_application(&self) -> Result<ActionOutcome, ApiError> {
        self.dispatch(ApiRequest::CancelApply).await
    }

    /// Subscribe to a boss. [`BossTarget::Current`] is sent as the `0`
    /// sentinel and resolved by the server.
    pub async fn subscribe(&self, target: BossTarget) -> Result<ActionOutcome, ApiError> {
        self.dispatch(ApiRequest::AddSubscribe { boss_num: target })
            .await
    }

    /// Drop a subscription.
    pub async fn unsubscribe(&self, target: BossTarget) -> Result<ActionOutcome, ApiError> {
        self.dispatch(ApiRequest::CancelSubscribe { boss_num: target })
            .await
    }

    /// Admin override of the boss position and health. Authority is
    /// checked by the server.
    pub async fn modify_boss(
        &self,
        cycle: u32,
        boss_num: u32,
        health: u64,
    ) -> Result<ActionOutcome, ApiError> {
        self.dispatch(ApiRequest::Modify {
            cycle,
            boss_num,
            health,
        })
        .await
    }

    /// Admin: remind the listed members.
    pub async fn send_remind(&self, members: Vec<MemberId>) -> Result<ActionOutcome, ApiError> {
        self.dispatch(ApiRequest::SendRemind {
            memberlist: members,
        })
        .await
    }

    /// Admin: remove the listed members from the group.
    pub async fn drop_members(&self, members: Vec<MemberId>) -> Result<ActionOutcome, ApiError> {
        self.dispatch(ApiRequest::DropMember {
            memberlist: members,
        })
        .await
    }

    /// Current subscriptions of the group.
    pub async fn subscribers(&self) -> Result<Vec<Subscriber>, ApiError> {
        let request = ApiRequest::GetSubscribers;
        let action = request.action();
        let result = self
            .call(&request)
            .await
            .and_then(|response| response.field("subscribers").map_err(ApiError::from));
        if let Err(error) = &result {
            self.report(action, error);
        }
        result
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<ActionOutcome, ApiError> {
        let action = request.action();
        match self.call(&request).await {
            Ok(response) => Ok(self.absorb(action, response)),
            Err(error) => {
                self.report(action, &error);
                Err(error)
            }
        }
    }

    async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        tracing::debug!(action = request.action(), "dispatching action");
        into_success(self.transport.call(request, None).await?)
    }

    fn absorb(&self, action: &'static str, response: ApiResponse) -> ActionOutcome {
        let revision = response
            .boss_data
            .map(|boss| self.store.apply(boss, SnapshotSource::Action(action)));
        let notice = response.notice.filter(|text| !text.is_empty());
        if let Some(notice) = notice
            .clone()
            .and_then(|text| Notice::new(text, NoticeOrigin::Action(action)))
        {
            self.surface.notify(notice);
        }
        tracing::info!(action, applied = revision.is_some(), "action succeeded");
        ActionOutcome {
            snapshot: response.boss_data,
            revision,
            notice,
        }
    }

    fn report(&self, action: &'static str, error: &ApiError) {
        tracing::warn!(action, error = %error, "action failed");
        self.surface.report_failure(action, error);
    }
}
