use crate::api::{ApiServer, AppState};
use crate::audio::CpalBackend;
use crate::channel::{LogGateway, NotificationSink, VoiceLink, WebhookGateway};
use crate::config::Config;
use crate::recorder::{
    FileWriter, MembershipMonitor, RecorderController, RecorderStatusHandle, RecordingSession,
    SessionOptions,
};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub async fn run_service(config: Config) -> Result<()> {
    info!("Starting Nouncil service");
    config.validate()?;

    let (voice, notifier) = build_gateway(&config)?;
    let backend = Arc::new(CpalBackend::new(config.audio.device_name()));
    let writer = FileWriter::new(
        config.recorder.recordings_dir()?,
        config.recorder.file_prefix.clone(),
    );
    info!("Recordings will be saved to {}", writer.dir().display());

    let (session, events) = RecordingSession::new(
        backend,
        voice,
        notifier.clone(),
        writer,
        SessionOptions::new(
            config.audio.capture_config(),
            config.recorder.quorum_threshold,
        )
        .with_gateway_timeout(config.gateway.timeout()),
    );

    let status_handle = RecorderStatusHandle::default();
    let controller = RecorderController::new(
        session,
        MembershipMonitor::new(config.recorder.quorum_threshold),
        status_handle.clone(),
    );
    let (handle, controller_task) = controller.spawn(events);

    let state = AppState::new(handle.clone(), status_handle, notifier, &config)?;
    let api_server = ApiServer::new(state, &config);
    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {:#}", e);
        }
    });

    info!(
        "Nouncil is ready! Recording starts when {} or more members share a voice channel",
        config.recorder.quorum_threshold
    );
    info!(
        "Send the channel list once connected: curl -X POST http://{}:{}/channels/sync -d '[...]'",
        config.api.host, config.api.port
    );

    shutdown_signal().await;
    info!("Shutdown requested");

    let grace = Duration::from_secs(config.recorder.shutdown_grace_seconds);
    match tokio::time::timeout(grace, handle.shutdown()).await {
        Ok(Ok(())) => {
            if let Err(e) = controller_task.await {
                warn!("Recorder controller task ended abnormally: {}", e);
            }
        }
        Ok(Err(e)) => warn!("Recorder controller already gone: {}", e),
        Err(_) => warn!(
            "Active recording was not saved within {}s, exiting anyway",
            grace.as_secs()
        ),
    }

    api_task.abort();
    info!("Nouncil stopped");
    Ok(())
}

fn build_gateway(config: &Config) -> Result<(Arc<dyn VoiceLink>, Arc<dyn NotificationSink>)> {
    let pair = match config.gateway.webhook_url() {
        Some(url) => {
            info!("Forwarding notices and voice requests to {}", url);
            let gateway = Arc::new(WebhookGateway::new(url, config.gateway.timeout())?);
            let voice: Arc<dyn VoiceLink> = gateway.clone();
            let notifier: Arc<dyn NotificationSink> = gateway;
            (voice, notifier)
        }
        None => {
            warn!("No gateway webhook configured, notices will only be logged");
            let gateway = Arc::new(LogGateway);
            let voice: Arc<dyn VoiceLink> = gateway.clone();
            let notifier: Arc<dyn NotificationSink> = gateway;
            (voice, notifier)
        }
    };
    Ok(pair)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
