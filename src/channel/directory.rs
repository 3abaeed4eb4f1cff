use std::collections::BTreeMap;

use super::{ChannelId, ChannelSnapshot, MembershipEvent};

/// Last known occupancy of every voice channel the recorder has seen.
#[derive(Debug, Default)]
pub struct ChannelDirectory {
    channels: BTreeMap<ChannelId, ChannelSnapshot>,
}

impl ChannelDirectory {
    pub fn replace_all(&mut self, snapshots: Vec<ChannelSnapshot>) {
        self.channels = snapshots
            .into_iter()
            .map(|snapshot| (snapshot.id.clone(), snapshot))
            .collect();
    }

    pub fn upsert(&mut self, snapshot: ChannelSnapshot) {
        self.channels.insert(snapshot.id.clone(), snapshot);
    }

    pub fn apply(&mut self, event: &MembershipEvent) {
        for snapshot in event.affected_channels() {
            self.upsert(snapshot.clone());
        }
    }

    pub fn get(&self, id: &ChannelId) -> Option<&ChannelSnapshot> {
        self.channels.get(id)
    }

    pub fn snapshots(&self) -> Vec<ChannelSnapshot> {
        self.channels.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
