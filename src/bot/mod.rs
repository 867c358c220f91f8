//! # Bot Module
//!
//! Discord side of Maple Music: text commands, player notices and channel
//! housekeeping.
//!
//! ## Architecture
//!
//! [`MapleMusicBot`] implements Serenity's [`EventHandler`] trait and owns:
//!
//! - the shared [`PlaybackController`] every command goes through
//! - the [`CleanupScheduler`] for periodic channel purges
//! - the receiving end of the controller's [`PlayerNotice`] channel, which is
//!   forwarded to the command channel once the gateway is ready
//!
//! Commands are only accepted from the configured command channel.

use parking_lot::Mutex;
use serenity::{
    all::{ActivityData, ChannelId, Context, EventHandler, GuildId, Message, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub mod cleanup;
pub mod commands;
pub mod events;
pub mod handlers;

use crate::{
    audio::player::{PlaybackController, PlayerNotice},
    config::Config,
    ui::embeds,
};
use cleanup::CleanupScheduler;
use commands::Parsed;

pub struct MapleMusicBot {
    config: Arc<Config>,
    pub controller: PlaybackController,
    pub cleanup: Arc<CleanupScheduler>,
    /// Taken by the first `ready` event.
    notices: Mutex<Option<mpsc::UnboundedReceiver<PlayerNotice>>>,
}

impl MapleMusicBot {
    pub fn new(
        config: Arc<Config>,
        controller: PlaybackController,
        notices: mpsc::UnboundedReceiver<PlayerNotice>,
    ) -> Self {
        let cleanup = Arc::new(CleanupScheduler::new(
            config.clean_channels.clone(),
            config.clean_purge_limit,
        ));

        Self {
            config,
            controller,
            cleanup,
            notices: Mutex::new(Some(notices)),
        }
    }

    fn command_channel(&self) -> ChannelId {
        ChannelId::new(self.config.command_channel_id)
    }

    fn guild(&self) -> GuildId {
        GuildId::new(self.config.guild_id)
    }
}

#[async_trait]
impl EventHandler for MapleMusicBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} is online!", ready.user.name);
        info!("📊 Connected to {} guilds", ready.guilds.len());

        self.cleanup.start_all(ctx.http.clone());

        // Ready fires again after a reconnect; the forwarder keeps running
        let notices = self.notices.lock().take();
        if let Some(notices) = notices {
            let channel = self.command_channel();
            tokio::spawn(forward_notices(ctx, channel, notices));
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let Some(parsed) = commands::parse(&self.config.command_prefix, &msg.content) else {
            return;
        };

        if msg.channel_id != self.command_channel() {
            debug!("Command from {} outside the command channel", msg.author.name);
            let notice = format!("❗ This command can only be used in <#{}>.", self.config.command_channel_id);
            if let Err(e) = msg.channel_id.say(&ctx.http, notice).await {
                warn!("Could not send channel notice: {:?}", e);
            }
            return;
        }

        let result = match parsed {
            Parsed::Command(command) => handlers::handle_command(&ctx, &msg, self, command).await,
            Parsed::Usage(help) => {
                handlers::reply(
                    &ctx,
                    msg.channel_id,
                    embeds::usage_embed(&self.config.command_prefix, help),
                )
                .await
            }
        };

        if let Err(e) = result {
            error!("Error handling command: {:?}", e);
        }
    }

    /// Stops playback when someone else disconnects the bot from voice.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || new.guild_id != Some(self.guild()) {
            return;
        }

        let was_connected = old.and_then(|state| state.channel_id).is_some();
        if was_connected && new.channel_id.is_none() && self.controller.handle_external_disconnect().await {
            info!("🔌 Bot was disconnected from voice in guild {}", self.guild());
            ctx.set_activity(None);
        }
    }
}

/// Posts player notices to the command channel and mirrors the current
/// track in the bot's presence.
async fn forward_notices(ctx: Context, channel: ChannelId, mut notices: mpsc::UnboundedReceiver<PlayerNotice>) {
    while let Some(notice) = notices.recv().await {
        let embed = match &notice {
            PlayerNotice::NowPlaying(track) => {
                ctx.set_activity(Some(ActivityData::listening(track.title())));
                embeds::now_playing_embed(track)
            }
            PlayerNotice::TrackFailed { track, reason } => embeds::track_failed_embed(track, reason),
            PlayerNotice::QueueFinished => {
                ctx.set_activity(None);
                embeds::queue_finished_embed()
            }
        };

        if let Err(e) = handlers::reply(&ctx, channel, embed).await {
            warn!("Could not post player notice: {:?}", e);
        }
    }

    debug!("Player notice channel closed");
}
