mod telegram;

use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;
use teloxide::Bot;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wakely_config::Config;
use wakely_core::{DeviceRegistry, Engine, MessageGateway, SessionId, UdpBroadcastSender};

use crate::telegram::TelegramGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` is optional; real environment variables win either way.
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::load().context("loading configuration")?;
    let registry = DeviceRegistry::load(&config.registry_file);
    info!(
        devices = registry.list().len(),
        path = %config.registry_file.display(),
        "registry loaded"
    );

    let bot = Bot::new(config.bot_token.expose_secret());
    if let Err(e) = telegram::register_commands(&bot).await {
        warn!(error = %e, "failed to register bot commands");
    }

    let operator = SessionId(config.chat_id);
    let gateway = Arc::new(TelegramGateway::new(bot.clone()));
    let sender = Arc::new(UdpBroadcastSender::new(config.broadcast_ip, config.port));
    let engine = Engine::new(registry, operator, gateway.clone(), sender);

    // Greet the operator with the current device keyboard.
    let names: Vec<String> = engine
        .registry()
        .list()
        .iter()
        .map(|d| d.name.clone())
        .collect();
    if let Err(e) = gateway.send_text(operator, "Started bot").await {
        warn!(error = %e, "failed to send startup notice");
    }
    if let Err(e) = gateway.refresh_keyboard(operator, &names).await {
        warn!(error = %e, "failed to send startup keyboard");
    }

    info!(chat = config.chat_id, broadcast = %config.broadcast_ip, "bot started");
    telegram::run(bot, Arc::new(Mutex::new(engine))).await;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
