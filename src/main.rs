use anyhow::Result;
use serenity::{
    model::{
        gateway::GatewayIntents,
        id::{ChannelId, GuildId},
    },
    Client,
};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

mod audio;
mod bot;
mod config;
mod error;
mod sources;
mod ui;

use crate::audio::{player::PlaybackController, sink::SongbirdSink};
use crate::bot::MapleMusicBot;
use crate::config::Config;
use crate::sources::YtDlpResolver;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("maple_music=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Starting Maple Music v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    info!("{}", config.summary());

    let manager = Songbird::serenity();
    let (sink_events_tx, sink_events_rx) = mpsc::unbounded_channel();
    let (notices_tx, notices_rx) = mpsc::unbounded_channel();

    let sink = Arc::new(SongbirdSink::new(
        manager.clone(),
        GuildId::new(config.guild_id),
        ChannelId::new(config.music_voice_channel_id),
        sink_events_tx,
    ));
    let resolver = Arc::new(YtDlpResolver::new(&config));
    let controller = PlaybackController::new(&config, resolver, sink, notices_tx);
    let _event_loop = controller.spawn_event_loop(sink_events_rx);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let config = Arc::new(config);
    let handler = MapleMusicBot::new(config.clone(), controller.clone(), notices_rx);
    let cleanup = handler.cleanup.clone();

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(manager)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Shutdown signal received, closing...");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot started");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    cleanup.shutdown();
    controller.stop().await;
    info!("👋 Bye");

    Ok(())
}

async fn health_check(config: &Config) -> Result<()> {
    let version = YtDlpResolver::new(config).verify().await?;
    info!("yt-dlp {}", version);
    println!("OK");
    Ok(())
}
