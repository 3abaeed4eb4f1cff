//! Voice channel model as reported by the chat platform.
//!
//! The platform owns membership; these types are read-only views pushed into
//! the recorder through membership events and channel syncs.

pub mod directory;
pub mod gateway;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use directory::ChannelDirectory;
pub use gateway::{bounded, notify, LogGateway, NotificationSink, VoiceLink, WebhookGateway, DEFAULT_TIMEOUT};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Bot accounts never count towards the quorum.
    #[serde(default)]
    pub automated: bool,
}

impl Occupant {
    pub fn member(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            automated: false,
        }
    }

    pub fn bot(user_id: impl Into<String>) -> Self {
        Self {
            automated: true,
            ..Self::member(user_id)
        }
    }
}

/// Occupancy of one voice channel at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub id: ChannelId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub occupants: Vec<Occupant>,
}

impl ChannelSnapshot {
    pub fn new(id: impl Into<String>, name: impl Into<String>, occupants: Vec<Occupant>) -> Self {
        Self {
            id: ChannelId::new(id),
            name: name.into(),
            occupants,
        }
    }

    /// Number of occupants that count towards the quorum.
    pub fn human_count(&self) -> usize {
        self.occupants.iter().filter(|o| !o.automated).count()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.occupants.iter().any(|o| o.user_id == user_id)
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// A member joined, left or moved between voice channels.
///
/// `before` and `after` carry the occupancy of the old and new channel after
/// the change was applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipEvent {
    pub member: Occupant,
    #[serde(default)]
    pub before: Option<ChannelSnapshot>,
    #[serde(default)]
    pub after: Option<ChannelSnapshot>,
}

impl MembershipEvent {
    /// Channels to re-evaluate, old channel first, without duplicates.
    pub fn affected_channels(&self) -> Vec<&ChannelSnapshot> {
        let mut channels: Vec<&ChannelSnapshot> = Vec::with_capacity(2);
        for snapshot in [self.before.as_ref(), self.after.as_ref()].into_iter().flatten() {
            if !channels.iter().any(|c| c.id == snapshot.id) {
                channels.push(snapshot);
            }
        }
        channels
    }
}
