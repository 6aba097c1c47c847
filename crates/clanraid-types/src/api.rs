//! Request and response envelopes for the single clan battle API endpoint.
//!
//! Every call is a JSON object POSTed to the same URL; the `action` tag
//! selects the server behavior. Every response carries an integer `code`
//! where `0` is success and `1` is the long-poll "not changed" signal.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::boss::{BossState, BossTarget};
use crate::ids::{GroupId, MemberId};
use crate::member::Member;

/// A request to the clan battle API, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ApiRequest {
    /// Group metadata, boss snapshot, admin flag and viewer id.
    #[serde(rename = "get_data")]
    GetData,

    /// Participant roster.
    #[serde(rename = "get_member_list")]
    GetMemberList,

    /// Long-poll for the next boss state change.
    #[serde(rename = "update_boss")]
    UpdateBoss {
        /// Server-side wait budget in seconds.
        timeout: u64,
    },

    /// Record a hit or a defeat.
    #[serde(rename = "addrecord")]
    AddRecord {
        /// Whether this hit finished the boss.
        defeat: bool,
        /// Damage dealt; omitted for defeats.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        damage: Option<u64>,
        /// Member the hit is recorded for. Always sent, `null` for self.
        #[serde(default)]
        behalf: Option<MemberId>,
    },

    /// Undo the caller's last record.
    #[serde(rename = "undo")]
    Undo,

    /// Apply for the exclusive attack turn.
    #[serde(rename = "apply")]
    Apply,

    /// Release the attack turn.
    #[serde(rename = "cancelapply")]
    CancelApply,

    /// Subscribe to a boss.
    #[serde(rename = "addsubscribe")]
    AddSubscribe {
        /// Boss to watch; `0` is the current-boss sentinel.
        boss_num: BossTarget,
    },

    /// Drop a subscription.
    #[serde(rename = "cancelsubscribe")]
    CancelSubscribe {
        /// Boss to stop watching; `0` is the current-boss sentinel.
        boss_num: BossTarget,
    },

    /// Admin override of the boss position and health.
    #[serde(rename = "modify")]
    Modify {
        /// Replacement cycle.
        cycle: u32,
        /// Replacement boss number.
        boss_num: u32,
        /// Replacement remaining health.
        health: u64,
    },

    /// List current subscriptions of the group.
    #[serde(rename = "get_subscribers")]
    GetSubscribers,

    /// Admin: remind members who still have attacks left.
    #[serde(rename = "send_remind")]
    SendRemind {
        /// Members to remind.
        memberlist: Vec<MemberId>,
    },

    /// Admin: remove members from the group.
    #[serde(rename = "drop_member")]
    DropMember {
        /// Members to remove.
        memberlist: Vec<MemberId>,
    },
}

impl ApiRequest {
    /// The wire `action` tag, for logging.
    pub const fn action(&self) -> &'static str {
        match self {
            Self::GetData => "get_data",
            Self::GetMemberList => "get_member_list",
            Self::UpdateBoss { .. } => "update_boss",
            Self::AddRecord { .. } => "addrecord",
            Self::Undo => "undo",
            Self::Apply => "apply",
            Self::CancelApply => "cancelapply",
            Self::AddSubscribe { .. } => "addsubscribe",
            Self::CancelSubscribe { .. } => "cancelsubscribe",
            Self::Modify { .. } => "modify",
            Self::GetSubscribers => "get_subscribers",
            Self::SendRemind { .. } => "send_remind",
            Self::DropMember { .. } => "drop_member",
        }
    }
}

/// Status codes the backend is known to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerCode {
    /// `0`: success.
    Ok,
    /// `1`: long-poll wait budget elapsed without a change.
    NotChanged,
    /// `10`: operation rejected (also "not logged in").
    Rejected,
    /// `11`: insufficient authority.
    Forbidden,
    /// `20`: the group does not exist.
    GroupNotFound,
    /// `30`: body was not a JSON object.
    InvalidPayload,
    /// `31`: a required payload key was missing.
    MissingKey,
    /// `32`: the action tag is unknown.
    UnknownAction,
    /// `40`: unhandled server error.
    ServerError,
    /// Any other code, kept verbatim.
    Other(i64),
}

impl From<i64> for ServerCode {
    fn from(code: i64) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::NotChanged,
            10 => Self::Rejected,
            11 => Self::Forbidden,
            20 => Self::GroupNotFound,
            30 => Self::InvalidPayload,
            31 => Self::MissingKey,
            32 => Self::UnknownAction,
            40 => Self::ServerError,
            other => Self::Other(other),
        }
    }
}

impl ServerCode {
    /// The integer code on the wire.
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Ok => 0,
            Self::NotChanged => 1,
            Self::Rejected => 10,
            Self::Forbidden => 11,
            Self::GroupNotFound => 20,
            Self::InvalidPayload => 30,
            Self::MissingKey => 31,
            Self::UnknownAction => 32,
            Self::ServerError => 40,
            Self::Other(code) => code,
        }
    }
}

impl core::fmt::Display for ServerCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// Errors reading a typed field out of a response envelope.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The field is absent.
    #[error("response is missing field `{0}`")]
    Missing(&'static str),

    /// The field is present but has the wrong shape.
    #[error("response field `{field}` is malformed: {source}")]
    Malformed {
        /// Field name.
        field: &'static str,
        /// Underlying decode error.
        source: serde_json::Error,
    },
}

/// The response envelope shared by every action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Status code, see [`ServerCode`].
    pub code: i64,
    /// Human-readable message, present on errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Inline boss snapshot.
    #[serde(rename = "bossData", default, skip_serializing_if = "Option::is_none")]
    pub boss_data: Option<BossState>,
    /// One-shot notice for the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    /// Action-specific fields (`groupData`, `members`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ApiResponse {
    /// A bare `code: 0` response.
    pub fn success() -> Self {
        Self::with_code(ServerCode::Ok)
    }

    /// The long-poll "not changed" response.
    pub fn not_changed() -> Self {
        Self::with_code(ServerCode::NotChanged).with_message("not changed")
    }

    /// An error response with a message.
    pub fn error(code: ServerCode, message: impl Into<String>) -> Self {
        Self::with_code(code).with_message(message)
    }

    fn with_code(code: ServerCode) -> Self {
        Self {
            code: code.as_i64(),
            message: None,
            boss_data: None,
            notice: None,
            extra: Map::new(),
        }
    }

    /// Attach a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a boss snapshot.
    #[must_use]
    pub fn with_boss(mut self, boss: BossState) -> Self {
        self.boss_data = Some(boss);
        self
    }

    /// Attach a notice.
    #[must_use]
    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }

    /// Attach an action-specific field.
    #[must_use]
    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_owned(), value);
        self
    }

    /// The status code as a [`ServerCode`].
    pub fn server_code(&self) -> ServerCode {
        ServerCode::from(self.code)
    }

    /// Decode an action-specific field.
    pub fn field<T: DeserializeOwned>(&self, name: &'static str) -> Result<T, PayloadError> {
        let value = self.extra.get(name).ok_or(PayloadError::Missing(name))?;
        serde_json::from_value(value.clone())
            .map_err(|source| PayloadError::Malformed { field: name, source })
    }
}

/// Group metadata from `get_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupData {
    /// Group identifier.
    pub group_id: GroupId,
    /// Group display name.
    #[serde(default)]
    pub group_name: Option<String>,
    /// Game server region code (`jp`, `tw`, `kr`, `cn`).
    pub game_server: String,
    /// Whether the fourth difficulty tier is enabled.
    #[serde(default)]
    pub level_4: bool,
}

/// Everything `get_data` returns, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    /// Group metadata.
    pub group: GroupData,
    /// Initial boss snapshot.
    pub boss: BossState,
    /// Whether the viewer may use admin actions.
    pub is_admin: bool,
    /// The viewer's own member id.
    pub self_id: MemberId,
}

impl TryFrom<&ApiResponse> for SessionData {
    type Error = PayloadError;

    fn try_from(response: &ApiResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            group: response.field("groupData")?,
            boss: response.boss_data.ok_or(PayloadError::Missing("bossData"))?,
            is_admin: response.field("is_admin")?,
            self_id: response.field("self_id")?,
        })
    }
}

/// One subscription entry from `get_subscribers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Subscribed boss; [`BossTarget::Current`] for the `0` sentinel.
    pub boss: BossTarget,
    /// Subscribed member.
    pub qqid: MemberId,
    /// Free-form comment attached at subscription time.
    #[serde(default)]
    pub comment: Value,
}

/// Decode the roster out of a `get_member_list` response.
pub fn members_from(response: &ApiResponse) -> Result<Vec<Member>, PayloadError> {
    response.field("members")
}
