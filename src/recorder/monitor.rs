//! Quorum decisions for voice channel membership changes.
//!
//! The monitor is pure: given a channel's current occupancy and the channel
//! currently being recorded (if any) it says whether recording should start
//! or stop. Applying the decision is the controller's job.

use crate::channel::{ChannelId, ChannelSnapshot};

use super::StopReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuorumDecision {
    Start(ChannelId),
    Stop(ChannelId, StopReason),
}

#[derive(Debug, Clone, Copy)]
pub struct MembershipMonitor {
    threshold: usize,
}

impl MembershipMonitor {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn has_quorum(&self, channel: &ChannelSnapshot) -> bool {
        channel.human_count() >= self.threshold
    }

    /// Decide what a change in `channel` means while `recording` is active.
    ///
    /// Only one channel is ever recorded: a channel reaching quorum while
    /// another one is being recorded yields no decision.
    pub fn evaluate(
        &self,
        channel: &ChannelSnapshot,
        recording: Option<&ChannelId>,
    ) -> Option<QuorumDecision> {
        let quorum = self.has_quorum(channel);
        match recording {
            None if quorum => Some(QuorumDecision::Start(channel.id.clone())),
            Some(active) if !quorum && *active == channel.id => Some(QuorumDecision::Stop(
                channel.id.clone(),
                StopReason::AutoQuorumLoss,
            )),
            _ => None,
        }
    }
}
