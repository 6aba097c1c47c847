//! Shared fixtures: a scripted transport and canned server responses.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clanraid_sync::{
    ApiError, ChannelSurface, PollSettings, Session, SurfaceEvent, Transport,
};
use clanraid_types::{ApiRequest, ApiResponse, BossState, MemberId};
use tokio::sync::{mpsc, oneshot, watch};

/// One scripted reaction to a call.
pub enum Step {
    /// Answer immediately.
    Respond(Result<ApiResponse, ApiError>),
    /// Never answer.
    Hang,
    /// Answer when the test sends on the paired channel.
    Gate(oneshot::Receiver<Result<ApiResponse, ApiError>>),
}

struct Inner {
    script: Mutex<BTreeMap<&'static str, VecDeque<Step>>>,
    calls: Mutex<Vec<(ApiRequest, Option<Duration>)>>,
    count: watch::Sender<usize>,
}

/// Transport answering from per-action scripts. Calls beyond the script
/// hang forever, like a server holding a long-poll open.
#[derive(Clone)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                script: Mutex::new(BTreeMap::new()),
                calls: Mutex::new(Vec::new()),
                count: watch::channel(0).0,
            }),
        }
    }
}

impl ScriptedTransport {
    pub fn push(&self, action: &'static str, step: Step) {
        self.inner
            .script
            .lock()
            .unwrap()
            .entry(action)
            .or_default()
            .push_back(step);
    }

    pub fn respond(&self, action: &'static str, response: ApiResponse) {
        self.push(action, Step::Respond(Ok(response)));
    }

    pub fn fail(&self, action: &'static str, error: ApiError) {
        self.push(action, Step::Respond(Err(error)));
    }

    /// Script a response the test releases later.
    pub fn gate(&self, action: &'static str) -> oneshot::Sender<Result<ApiResponse, ApiError>> {
        let (tx, rx) = oneshot::channel();
        self.push(action, Step::Gate(rx));
        tx
    }

    pub fn calls(&self) -> Vec<(ApiRequest, Option<Duration>)> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, action: &str) -> Vec<(ApiRequest, Option<Duration>)> {
        self.calls()
            .into_iter()
            .filter(|(request, _)| request.action() == action)
            .collect()
    }

    /// Wait until at least `n` calls of `action` were made.
    pub async fn wait_for_calls(&self, action: &str, n: usize) {
        let mut rx = self.inner.count.subscribe();
        rx.wait_for(|_| self.calls_of(action).len() >= n)
            .await
            .unwrap();
    }
}

impl Transport for ScriptedTransport {
    async fn call(
        &self,
        request: &ApiRequest,
        deadline: Option<Duration>,
    ) -> Result<ApiResponse, ApiError> {
        let step = {
            let mut script = self.inner.script.lock().unwrap();
            script
                .get_mut(request.action())
                .and_then(VecDeque::pop_front)
        };
        self.inner
            .calls
            .lock()
            .unwrap()
            .push((request.clone(), deadline));
        self.inner.count.send_modify(|n| *n = n.saturating_add(1));

        match step {
            Some(Step::Respond(result)) => result,
            Some(Step::Gate(rx)) => match rx.await {
                Ok(result) => result,
                Err(_) => std::future::pending().await,
            },
            Some(Step::Hang) | None => std::future::pending().await,
        }
    }
}

pub fn boss(cycle: u32, num: u32, health: u64, full_health: u64) -> BossState {
    BossState::new(cycle, num, health, full_health).unwrap()
}

pub fn get_data_response(boss: BossState) -> ApiResponse {
    ApiResponse::success()
        .with_boss(boss)
        .with_field(
            "groupData",
            serde_json::json!({
                "group_id": 1234,
                "group_name": "Gourmet Guild",
                "game_server": "jp",
                "level_4": false
            }),
        )
        .with_field("is_admin", serde_json::json!(true))
        .with_field("self_id", serde_json::json!(10001))
}

pub fn member_list_response() -> ApiResponse {
    ApiResponse::success().with_field(
        "members",
        serde_json::json!([
            {"qqid": 10001, "nickname": "Pecorine"},
            {"qqid": 10002, "nickname": "Kokkoro"},
            {"qqid": 10003, "nickname": null}
        ]),
    )
}

pub fn snapshot(boss: BossState) -> ApiResponse {
    ApiResponse::success().with_boss(boss)
}

/// Successful response decoded from the JSON the server would send.
pub fn decoded_snapshot(boss_data: serde_json::Value) -> ApiResponse {
    serde_json::from_value(serde_json::json!({"code": 0, "bossData": boss_data})).unwrap()
}

pub const SELF_ID: MemberId = MemberId(10001);

pub type TestSession = Session<ScriptedTransport, ChannelSurface>;

/// Bootstrap a session at `initial` with default poll timing.
pub async fn start(
    transport: &ScriptedTransport,
    initial: BossState,
) -> (TestSession, mpsc::UnboundedReceiver<SurfaceEvent>) {
    transport.respond("get_data", get_data_response(initial));
    transport.respond("get_member_list", member_list_response());
    let (surface, events) = ChannelSurface::new();
    let session = Session::bootstrap(transport.clone(), surface, PollSettings::default())
        .await
        .unwrap();
    (session, events)
}

/// Next surface event, failing the test after a few seconds of silence.
pub async fn next_event(events: &mut mpsc::UnboundedReceiver<SurfaceEvent>) -> SurfaceEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap()
}
