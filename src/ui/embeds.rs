use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::{
    audio::player::{EnqueueOutcome, PauseOutcome, PlaybackSnapshot, VolumeOutcome},
    bot::commands::{CommandHelp, COMMANDS},
    sources::Track,
};

/// Queue entries shown before the list is cut off.
const QUEUE_PREVIEW_LEN: usize = 20;

/// Standard colour palette for the bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const WARNING_ORANGE: Colour = Colour::from_rgb(255, 193, 7);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

const STANDARD_FOOTER: &str = "🎵 Maple Music";

fn base_embed() -> CreateEmbed {
    CreateEmbed::default()
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn track_duration(track: &Track) -> String {
    if track.duration_secs() == 0 {
        "🔴 Live / unknown".to_string()
    } else {
        format_duration(track.duration())
    }
}

fn with_page_url(embed: CreateEmbed, track: &Track) -> CreateEmbed {
    match track.page_url() {
        Some(url) => embed.url(url),
        None => embed,
    }
}

pub fn now_playing_embed(track: &Track) -> CreateEmbed {
    let embed = base_embed()
        .title("🎵 Now Playing")
        .description(format!("**{}**", track.title()))
        .color(colors::MUSIC_PURPLE)
        .field("⏱️ Duration", track_duration(track), true);
    with_page_url(embed, track)
}

/// Reply to `play`; says whether the track started right away.
pub fn track_added_embed(outcome: &EnqueueOutcome) -> CreateEmbed {
    let (title, footer) = if outcome.started {
        ("▶️ Playing", "Started right away")
    } else {
        ("✅ Added to Queue", "Plays automatically when its turn comes")
    };

    let mut embed = CreateEmbed::default()
        .title(title)
        .description(format!("**{}**", outcome.track.title()))
        .color(colors::SUCCESS_GREEN)
        .field("⏱️ Duration", track_duration(&outcome.track), true)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(footer));

    if !outcome.started {
        embed = embed.field("📍 Position", outcome.position.to_string(), true);
    }

    with_page_url(embed, &outcome.track)
}

pub fn track_failed_embed(track: &Track, reason: &str) -> CreateEmbed {
    base_embed()
        .title("⚠️ Skipped Unplayable Track")
        .description(format!("**{}** could not be played and was skipped.", track.title()))
        .field("Reason", truncate(reason, 1000), false)
        .color(colors::WARNING_ORANGE)
}

pub fn queue_finished_embed() -> CreateEmbed {
    base_embed()
        .title("📭 Queue Finished")
        .description("Nothing left to play, leaving the voice channel.")
        .color(colors::NEUTRAL_GRAY)
}

pub fn queue_embed(snapshot: &PlaybackSnapshot) -> CreateEmbed {
    let mut embed = base_embed().title("📋 Queue").color(colors::INFO_BLUE);

    match &snapshot.current {
        Some(current) => {
            let status = if snapshot.is_paused() {
                "⏸️"
            } else if snapshot.repeat {
                "🔂"
            } else {
                "▶️"
            };
            embed = embed.field(
                format!("{} Now Playing", status),
                format!("**{}** `[{}]`", current.title(), track_duration(current)),
                false,
            );
        }
        None => {
            embed = embed.field("⏹️ Now Playing", "Nothing", false);
        }
    }

    if snapshot.queue.is_empty() {
        return embed
            .description("😴 **The queue is empty**")
            .color(colors::NEUTRAL_GRAY);
    }

    let mut info = format!("**Total:** {} tracks", snapshot.queue.len());
    if snapshot.queue_duration > Duration::ZERO {
        info.push_str(&format!(" • **Duration:** {}", format_duration(snapshot.queue_duration)));
    }
    info.push_str(&format!(" • **Volume:** {}%", (snapshot.volume * 100.0).round() as u32));
    if snapshot.repeat {
        info.push_str(" • 🔂 **Repeat**");
    }

    embed
        .description(queue_lines(&snapshot.queue))
        .field("Info", info, false)
}

/// Numbered queue listing; numbers are the indexes `remove` takes.
fn queue_lines(queue: &[Track]) -> String {
    let mut lines: Vec<String> = queue
        .iter()
        .take(QUEUE_PREVIEW_LEN)
        .enumerate()
        .map(|(i, track)| format!("**{}**. {} `[{}]`", i, truncate(track.title(), 80), track_duration(track)))
        .collect();

    if queue.len() > QUEUE_PREVIEW_LEN {
        lines.push(format!("... and {} more", queue.len() - QUEUE_PREVIEW_LEN));
    }

    lines.join("\n")
}

pub fn help_embed(prefix: &str) -> CreateEmbed {
    let commands: Vec<String> = COMMANDS.iter().map(|cmd| help_line(prefix, cmd)).collect();

    base_embed()
        .title("🎵 Maple Music - Commands")
        .description(commands.join("\n"))
        .color(colors::INFO_BLUE)
}

fn help_line(prefix: &str, cmd: &CommandHelp) -> String {
    let aliases = if cmd.aliases.is_empty() {
        String::new()
    } else {
        format!(
            " ({})",
            cmd.aliases
                .iter()
                .map(|alias| format!("`{}{}`", prefix, alias))
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    format!("`{}{}`{} - {}", prefix, cmd.usage, aliases, cmd.description)
}

pub fn usage_embed(prefix: &str, cmd: &CommandHelp) -> CreateEmbed {
    base_embed()
        .title("❓ Usage")
        .description(help_line(prefix, cmd))
        .color(colors::WARNING_ORANGE)
}

pub fn pause_embed(outcome: PauseOutcome) -> CreateEmbed {
    match outcome {
        PauseOutcome::Paused => success_embed("Paused", "⏸️ Playback paused"),
        PauseOutcome::Resumed => success_embed("Resumed", "▶️ Playback resumed"),
        PauseOutcome::Idle => info_embed("Nothing Playing", "There is nothing to pause or resume"),
    }
}

pub fn volume_embed(outcome: VolumeOutcome) -> CreateEmbed {
    let (volume, note) = match outcome {
        VolumeOutcome::Applied(volume) => (volume, "Applied to the current track"),
        VolumeOutcome::NotPlaying(volume) => (volume, "Nothing is playing, used for the next track"),
    };
    let percent = (volume * 100.0).round() as u32;
    let emoji = match percent {
        0 => "🔈",
        1..=50 => "🔉",
        _ => "🔊",
    };

    base_embed()
        .title(format!("{} Volume {}%", emoji, percent))
        .description(volume_bar(volume))
        .field("🎛️ Status", note, false)
        .color(colors::INFO_BLUE)
}

fn volume_bar(volume: f32) -> String {
    let segments = 20;
    let filled = ((volume.clamp(0.0, 1.0) * segments as f32).round() as usize).min(segments);
    format!("`[{}{}]`", "█".repeat(filled), "▒".repeat(segments - filled))
}

pub fn error_embed(title: &str, description: &str) -> CreateEmbed {
    base_embed()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
}

pub fn success_embed(title: &str, description: &str) -> CreateEmbed {
    base_embed()
        .title(format!("✅ {}", title))
        .description(description)
        .color(colors::SUCCESS_GREEN)
}

pub fn info_embed(title: &str, description: &str) -> CreateEmbed {
    base_embed()
        .title(format!("ℹ️ {}", title))
        .description(description)
        .color(colors::INFO_BLUE)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut)
}

/// Formats a duration as `m:ss` or `h:mm:ss`.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
