use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use kalm_core::{
    config::Config,
    ingestion::{Ingestion, UpdateMode},
    messaging::{
        port::ChatTransport,
        throttled::{ThrottleConfig, ThrottledTransport},
    },
    pending::PendingVoiceSet,
    pipeline::{Pipeline, PipelineDeps, SpawningDispatcher},
    voice_store::JsonFileVoiceStore,
};
use kalm_elevenlabs::ElevenLabsClient;
use kalm_openai::OpenAiClient;

use crate::{
    server::{self, ApiState, WebhookRegistrar},
    TelegramTransport,
};

/// Wire every collaborator, start the configured update source and serve HTTP
/// until Ctrl-C.
pub async fn run(cfg: Arc<Config>) -> anyhow::Result<()> {
    let telegram = Arc::new(TelegramTransport::connect(
        &cfg.telegram_bot_token,
        cfg.poll_timeout,
    )?);

    match telegram.username().await {
        Ok(name) => tracing::info!(bot = %format!("@{name}"), "kalm started"),
        Err(e) => tracing::warn!(error = %e, "getMe failed"),
    }

    let openai = Arc::new(OpenAiClient::new(
        cfg.openai_api_key.clone(),
        cfg.openai_model.clone(),
        cfg.request_timeout,
    )?);
    let elevenlabs = Arc::new(ElevenLabsClient::new(
        cfg.elevenlabs_api_key.clone(),
        cfg.elevenlabs_voice_id.clone(),
        cfg.elevenlabs_model.clone(),
        cfg.request_timeout,
    )?);
    let voices = Arc::new(
        JsonFileVoiceStore::open(cfg.voice_store_path.clone())
            .await
            .context("opening voice store")?,
    );

    let transport: Arc<dyn ChatTransport> = Arc::new(ThrottledTransport::new(
        telegram.clone(),
        ThrottleConfig::default(),
    ));

    let pipeline = Arc::new(Pipeline::new(PipelineDeps {
        transport: transport.clone(),
        generator: openai.clone(),
        classifier: openai,
        synthesizer: elevenlabs.clone(),
        voices,
        pending: Arc::new(PendingVoiceSet::new()),
        live_call_url: cfg.live_call_url.clone(),
    }));
    if cfg.live_call_url.is_none() {
        tracing::warn!("LIVE_CALL_URL not set; /call will report the call as unavailable");
    }

    let ingestion = Arc::new(Ingestion::new(
        telegram.clone(),
        Arc::new(SpawningDispatcher::new(pipeline)),
        cfg.poll_settings(),
    ));

    match cfg.update_mode {
        UpdateMode::Polling => {
            // Telegram refuses getUpdates while a webhook is set.
            if let Err(e) = telegram.delete_webhook().await {
                tracing::warn!(error = %e, "deleteWebhook failed");
            }
            ingestion.start(UpdateMode::Polling).await?;
        }
        UpdateMode::Webhook => {
            let url = cfg
                .webhook_url
                .as_deref()
                .context("WEBHOOK_URL is required in webhook mode")?;
            telegram
                .register_webhook(url, cfg.webhook_secret.as_deref())
                .await
                .context("registering webhook")?;
            tracing::info!(url = %url, "webhook registered");
            ingestion.start(UpdateMode::Webhook).await?;
        }
    }

    let app = server::router(ApiState {
        ingestion: ingestion.clone(),
        transport,
        synthesizer: elevenlabs,
        webhooks: telegram,
        webhook_url: cfg.webhook_url.clone(),
        webhook_secret: cfg.webhook_secret.clone(),
    });

    let listener = TcpListener::bind(cfg.http_bind)
        .await
        .with_context(|| format!("failed to bind HTTP server on {}", cfg.http_bind))?;
    tracing::info!(addr = %cfg.http_bind, "HTTP server listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    ingestion.stop().await;
    served.context("HTTP server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
