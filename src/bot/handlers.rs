use anyhow::Result;
use serenity::{
    builder::{CreateEmbed, CreateMessage},
    model::{channel::Message, id::ChannelId},
    prelude::Context,
};
use tracing::{info, warn};

use crate::{
    audio::player::SkipOutcome,
    bot::{commands::BotCommand, MapleMusicBot},
    error::PlaybackError,
    ui::embeds,
};

/// Runs a parsed command and replies in the channel it came from.
pub async fn handle_command(ctx: &Context, msg: &Message, bot: &MapleMusicBot, command: BotCommand) -> Result<()> {
    info!("📝 {:?} by {} in {}", command, msg.author.name, msg.channel_id);

    let embed = match command {
        BotCommand::Play { position, query } => handle_play(ctx, msg, bot, position, &query).await,
        BotCommand::List => embeds::queue_embed(&bot.controller.snapshot().await),
        BotCommand::Remove(index) => match bot.controller.remove(index).await {
            Ok(track) => embeds::success_embed("Removed", &format!("**{}** was removed from the queue", track.title())),
            Err(e) => playback_error_embed(&e),
        },
        BotCommand::Move { from, to } => match bot.controller.reorder(from, to).await {
            Ok((track, position)) => {
                embeds::success_embed("Moved", &format!("↕️ **{}** is now at position {}", track.title(), position))
            }
            Err(e) => playback_error_embed(&e),
        },
        BotCommand::Clear => {
            let removed = bot.controller.clear().await;
            embeds::success_embed("Queue Cleared", &format!("🗑️ Removed {} tracks", removed))
        }
        BotCommand::Repeat => {
            if bot.controller.toggle_repeat().await {
                embeds::success_embed("Repeat On", "🔂 The current track will repeat")
            } else {
                embeds::success_embed("Repeat Off", "➡️ The queue continues after this track")
            }
        }
        BotCommand::Stop => {
            bot.controller.stop().await;
            ctx.set_activity(None);
            embeds::success_embed("Stopped", "⏹️ Playback stopped and the queue was cleared")
        }
        BotCommand::PauseOrResume => embeds::pause_embed(bot.controller.pause_or_resume().await),
        BotCommand::Volume(percent) => match bot.controller.set_volume(percent).await {
            Ok(outcome) => embeds::volume_embed(outcome),
            Err(e) => playback_error_embed(&e),
        },
        BotCommand::Skip => match bot.controller.skip().await {
            SkipOutcome::Skipped(track) => embeds::success_embed("Skipped", &format!("⏭️ **{}**", track.title())),
            SkipOutcome::NotPlaying => embeds::info_embed("Nothing Playing", "There is nothing to skip"),
        },
        BotCommand::Help => embeds::help_embed(&bot.config.command_prefix),
        BotCommand::Cleanup { channel_id, minutes } => handle_cleanup(ctx, msg, bot, channel_id, minutes).await?,
    };

    reply(ctx, msg.channel_id, embed).await
}

async fn handle_play(
    ctx: &Context,
    msg: &Message,
    bot: &MapleMusicBot,
    position: Option<usize>,
    query: &str,
) -> CreateEmbed {
    if let Err(e) = msg.channel_id.broadcast_typing(&ctx.http).await {
        warn!("Could not show typing indicator: {:?}", e);
    }

    match bot.controller.enqueue(query, position).await {
        Ok(outcome) => embeds::track_added_embed(&outcome),
        Err(e) => playback_error_embed(&e),
    }
}

async fn handle_cleanup(
    ctx: &Context,
    msg: &Message,
    bot: &MapleMusicBot,
    channel_id: u64,
    minutes: u64,
) -> Result<CreateEmbed> {
    if !can_manage_messages(ctx, msg).await? {
        return Ok(embeds::error_embed(
            "Missing Permission",
            "You need the Manage Messages permission to change cleanup schedules",
        ));
    }

    let channel = ChannelId::new(channel_id);
    Ok(match bot.cleanup.schedule(ctx.http.clone(), channel, minutes) {
        Ok(()) => embeds::success_embed(
            "Cleanup Scheduled",
            &format!("🧹 <#{}> will be cleaned every {} minutes", channel, minutes),
        ),
        Err(e) => embeds::error_embed("Cleanup Not Changed", &e.to_string()),
    })
}

async fn can_manage_messages(ctx: &Context, msg: &Message) -> Result<bool> {
    let Some(guild_id) = msg.guild_id else {
        return Ok(false);
    };
    let member = guild_id.member(ctx, msg.author.id).await?;

    let permissions = {
        let Some(guild) = ctx.cache.guild(guild_id) else {
            return Ok(false);
        };
        let Some(channel) = guild.channels.get(&msg.channel_id) else {
            return Ok(false);
        };
        guild.user_permissions_in(channel, &member)
    };

    Ok(permissions.manage_messages())
}

fn playback_error_embed(error: &PlaybackError) -> CreateEmbed {
    if !error.is_range_error() {
        warn!("⚠️ Command failed: {}", error);
    }

    let title = match error {
        PlaybackError::Resolution { .. } => "Track Not Found",
        PlaybackError::ResolutionTimeout { .. } => "Search Timed Out",
        PlaybackError::VolumeOutOfRange(_) => "Invalid Volume",
        PlaybackError::IndexOutOfRange { .. } => "Invalid Position",
        PlaybackError::QueueFull { .. } => "Queue Full",
        PlaybackError::PlaybackStart { .. } | PlaybackError::Connection(_) => "Playback Error",
    };
    embeds::error_embed(title, &error.to_string())
}

pub async fn reply(ctx: &Context, channel_id: ChannelId, embed: CreateEmbed) -> Result<()> {
    channel_id
        .send_message(&ctx.http, CreateMessage::new().embed(embed))
        .await?;
    Ok(())
}
