//! Text posted to channels and command replies.

use super::StopReason;

pub fn recording_started(threshold: usize) -> String {
    format!("🎙️ Recording started - {threshold} or more members detected in channel")
}

pub fn recording_stopped(reason: StopReason, threshold: usize) -> String {
    match reason {
        StopReason::AutoQuorumLoss => {
            format!("Recording stopped - less than {threshold} members in channel")
        }
        StopReason::Error => "Recording stopped due to an error".to_string(),
        StopReason::Manual => "Recording stopped manually".to_string(),
        StopReason::ForcedByAdmin => "Recording force stopped by an administrator".to_string(),
    }
}

pub fn recording_saved(name: &str) -> String {
    format!("Recording saved as: {name}")
}

pub const SAVE_FAILED: &str = "Error saving recording";
pub const NOTHING_CAPTURED: &str = "Recording stopped before any audio was captured";

pub const NOT_RECORDING: &str = "Not currently recording!";
pub const STOPPED_BY_COMMAND: &str = "Recording stopped by command";
pub const NOT_IN_CHANNEL: &str = "You must be in the recording channel to stop it";
pub const FORCE_STOPPED: &str = "Recording force stopped by admin";
pub const ADMIN_ONLY: &str = "Only administrators can force stop recordings";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_mention_threshold() {
        assert!(recording_started(3).contains("3 or more members"));
        assert!(recording_stopped(StopReason::AutoQuorumLoss, 4).contains("less than 4"));
    }

    #[test]
    fn test_each_reason_has_distinct_notice() {
        let texts: Vec<String> = [
            StopReason::Manual,
            StopReason::AutoQuorumLoss,
            StopReason::ForcedByAdmin,
            StopReason::Error,
        ]
        .into_iter()
        .map(|r| recording_stopped(r, 3))
        .collect();

        for (i, a) in texts.iter().enumerate() {
            for b in texts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
