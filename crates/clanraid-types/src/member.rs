//! Raid participants and the roster used for id → name lookup.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::MemberId;

/// A raid participant as returned by `get_member_list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Participant identifier.
    #[serde(rename = "qqid", alias = "id")]
    pub id: MemberId,
    /// Name shown to other participants. Empty when the server has none.
    #[serde(
        rename = "nickname",
        alias = "displayName",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub display_name: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Member list fetched once at session bootstrap.
///
/// Polling never refreshes it, so members who join mid-session show up
/// by id only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    members: BTreeMap<MemberId, Member>,
}

impl Roster {
    /// Build a roster; later duplicates of an id win.
    pub fn from_members(members: impl IntoIterator<Item = Member>) -> Self {
        Self {
            members: members.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    /// Display name of a member, if known and non-empty.
    pub fn display_name(&self, id: MemberId) -> Option<&str> {
        self.members
            .get(&id)
            .map(|m| m.display_name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Display name, falling back to the numeric id.
    pub fn label(&self, id: MemberId) -> String {
        self.display_name(id)
            .map_or_else(|| id.to_string(), ToOwned::to_owned)
    }

    /// Number of known members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
