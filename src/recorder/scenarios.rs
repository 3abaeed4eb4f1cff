//! End-to-end recorder behavior driven through the controller handle.

use std::time::Duration;

use crate::channel::{ChannelId, Occupant};
use crate::commands::{self, Command};

use super::testing::{
    joined, left, members, read_samples, wav_files, CountingBackend, Recorder, CHUNK_FRAMES,
};
use super::{notices, Applied, Intent, RecorderPhase, Requester, StopReason};

fn requester(user_id: &str, voice_channel: Option<&str>, is_admin: bool) -> Requester {
    Requester {
        user_id: user_id.to_string(),
        name: None,
        voice_channel: voice_channel.map(ChannelId::new),
        is_admin,
    }
}

#[tokio::test]
async fn test_quorum_crossings_produce_two_recordings() {
    let recorder = Recorder::spawn(CountingBackend::default(), 3);
    let handle = &recorder.handle;

    // Counts go 1, 2, 3, 2, 4, 1.
    handle.membership(joined("c1", 0, 1)).await.unwrap();
    handle.membership(joined("c1", 1, 2)).await.unwrap();
    handle.membership(joined("c1", 2, 3)).await.unwrap();
    recorder
        .wait_for(|s| s.phase == RecorderPhase::Recording)
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    handle.membership(left("c1", 2, 2)).await.unwrap();
    recorder.wait_for(|s| s.sessions_completed == 1).await;

    handle.membership(joined("c1", 3, 4)).await.unwrap();
    recorder
        .wait_for(|s| s.phase == RecorderPhase::Recording)
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    handle.membership(left("c1", 3, 1)).await.unwrap();
    let status = recorder.wait_for(|s| s.sessions_completed == 2).await;

    assert_eq!(status.phase, RecorderPhase::Idle);
    assert_eq!(recorder.recordings().len(), 2);
    assert_eq!(recorder.backend.closes(), 2);
    assert_eq!(recorder.gateway.leaves(), 2);

    let started = notices::recording_started(3);
    let stopped = notices::recording_stopped(StopReason::AutoQuorumLoss, 3);
    let posted = recorder.gateway.notices_to("c1");
    assert_eq!(posted.iter().filter(|n| **n == started).count(), 2);
    assert_eq!(posted.iter().filter(|n| **n == stopped).count(), 2);
}

#[tokio::test]
async fn test_device_failure_saves_captured_frames() {
    let recorder = Recorder::spawn(CountingBackend::failing_after(5), 3);
    recorder
        .handle
        .sync_channels(vec![members("c1", 3)])
        .await
        .unwrap();

    let status = recorder
        .wait_for(|s| s.sessions_completed == 1 && s.last_error.is_some())
        .await;
    assert_eq!(status.phase, RecorderPhase::Idle);

    let files = recorder.recordings();
    assert_eq!(files.len(), 1);
    assert_eq!(status.last_file.as_ref(), Some(&files[0]));

    let samples = read_samples(&files[0]);
    assert_eq!(samples.len(), 5 * CHUNK_FRAMES);
    for (chunk, values) in samples.chunks(CHUNK_FRAMES).enumerate() {
        assert!(values.iter().all(|v| *v == chunk as i16));
    }

    assert_eq!(status.last_error.as_deref(), Some("Failed to read from capture device: device unplugged"));
    let posted = recorder.gateway.notices();
    assert!(posted.contains(&notices::recording_stopped(StopReason::Error, 3)));
    assert_eq!(recorder.backend.closes(), 1);
}

#[tokio::test]
async fn test_bots_do_not_count_towards_quorum() {
    let recorder = Recorder::spawn(CountingBackend::default(), 3);
    let mut channel = members("c1", 2);
    channel
        .occupants
        .push(Occupant::bot("music-bot"));
    recorder.handle.sync_channels(vec![channel]).await.unwrap();

    // A request submitted after the sync is applied after it.
    let reply = recorder
        .handle
        .submit(Intent::ForceStop(requester("admin", None, true)))
        .await;
    assert!(reply.unwrap_err().is_not_active());
    assert_eq!(recorder.status.get().await.phase, RecorderPhase::Idle);
    assert!(recorder.recordings().is_empty());
}

#[tokio::test]
async fn test_second_stop_reports_not_active() {
    let recorder = Recorder::spawn(CountingBackend::default(), 2);
    recorder
        .handle
        .sync_channels(vec![members("c1", 2)])
        .await
        .unwrap();
    recorder
        .wait_for(|s| s.phase == RecorderPhase::Recording)
        .await;

    let admin = requester("admin", None, true);
    let first = recorder
        .handle
        .submit(Intent::ForceStop(admin.clone()))
        .await
        .unwrap();
    match first {
        Applied::Stopped(report) => {
            assert_eq!(report.reason, StopReason::ForcedByAdmin);
            assert_eq!(report.channel, ChannelId::new("c1"));
        }
        other => panic!("expected a stop, got {other:?}"),
    }

    let second = recorder.handle.submit(Intent::ForceStop(admin)).await;
    assert!(second.unwrap_err().is_not_active());
    assert_eq!(recorder.status.get().await.sessions_completed, 1);
    assert_eq!(recorder.gateway.leaves(), 1);
}

#[tokio::test]
async fn test_stop_commands_check_permissions() {
    let recorder = Recorder::spawn(CountingBackend::default(), 3);
    recorder
        .handle
        .sync_channels(vec![members("c1", 3), members("c2", 1)])
        .await
        .unwrap();
    recorder
        .wait_for(|s| s.phase == RecorderPhase::Recording)
        .await;
    let text = ChannelId::new("text");
    let gateway = recorder.gateway.as_ref();

    let outsider = requester("stranger", Some("c2"), false);
    let reply = commands::dispatch(
        &recorder.handle,
        gateway,
        Command::Stop,
        outsider.clone(),
        &text,
    )
    .await;
    assert!(!reply.accepted);
    assert_eq!(reply.message, notices::NOT_IN_CHANNEL);

    let reply = commands::dispatch(
        &recorder.handle,
        gateway,
        Command::ForceStop,
        outsider,
        &text,
    )
    .await;
    assert!(!reply.accepted);
    assert_eq!(reply.message, notices::ADMIN_ONLY);
    assert_eq!(recorder.status.get().await.phase, RecorderPhase::Recording);

    // Presence falls back to the channel directory when the platform
    // does not report the requester's voice channel.
    let member = requester("user1", None, false);
    let reply = commands::dispatch(
        &recorder.handle,
        gateway,
        Command::Stop,
        member.clone(),
        &text,
    )
    .await;
    assert!(reply.accepted);
    assert_eq!(reply.message, notices::STOPPED_BY_COMMAND);

    let reply = commands::dispatch(
        &recorder.handle,
        gateway,
        Command::Stop,
        member,
        &text,
    )
    .await;
    assert!(!reply.accepted);
    assert_eq!(reply.message, notices::NOT_RECORDING);

    let replies = recorder.gateway.notices_to("text");
    assert_eq!(
        replies,
        vec![
            notices::NOT_IN_CHANNEL,
            notices::ADMIN_ONLY,
            notices::STOPPED_BY_COMMAND,
            notices::NOT_RECORDING,
        ]
    );
}

#[tokio::test]
async fn test_shutdown_saves_active_recording() {
    let recorder = Recorder::spawn(CountingBackend::default(), 1);
    recorder
        .handle
        .sync_channels(vec![members("c1", 1)])
        .await
        .unwrap();
    recorder
        .wait_for(|s| s.phase == RecorderPhase::Recording)
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    recorder.handle.shutdown().await.unwrap();
    recorder.task.await.unwrap();

    assert_eq!(wav_count(&recorder.dir), 1);
    assert_eq!(recorder.backend.closes(), 1);
}

fn wav_count(dir: &tempfile::TempDir) -> usize {
    wav_files(dir.path()).len()
}
