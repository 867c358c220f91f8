use anyhow::{Context, Result};
use std::time::Duration;

/// Shortest and longest allowed cleanup interval, in minutes.
pub const CLEAN_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 1..=1440;

/// Cleanup schedule for one text channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanChannel {
    pub channel_id: u64,
    pub interval_minutes: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: u64,
    pub command_channel_id: u64,
    pub music_voice_channel_id: u64,
    pub command_prefix: String,

    // Playback
    pub default_volume: f32,
    pub max_queue_size: usize,
    pub resolve_timeout_secs: u64,
    pub playback_retry_delay_ms: u64,
    pub max_playback_retries: u32,

    // Housekeeping
    pub clean_channels: Vec<CleanChannel>,
    pub clean_purge_limit: u8,

    // yt-dlp
    pub ytdlp_path: String,
    pub ytdlp_cookies: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let command_channel_id: u64 = std::env::var("COMMAND_CHANNEL_ID")
            .context("COMMAND_CHANNEL_ID is not set")?
            .parse()?;

        let clean_channels = match std::env::var("CLEAN_CHANNELS") {
            Ok(val) if !val.trim().is_empty() => parse_clean_channels(&val)?,
            _ => vec![CleanChannel {
                channel_id: command_channel_id,
                interval_minutes: 60,
            }],
        };

        let config = Self {
            // TOKEN is accepted as a legacy name
            discord_token: std::env::var("DISCORD_TOKEN")
                .or_else(|_| std::env::var("TOKEN"))
                .context("DISCORD_TOKEN is not set")?,
            guild_id: std::env::var("GUILD_ID")
                .context("GUILD_ID is not set")?
                .parse()?,
            command_channel_id,
            music_voice_channel_id: std::env::var("MUSIC_VOICE_CHANNEL_ID")
                .context("MUSIC_VOICE_CHANNEL_ID is not set")?
                .parse()?,
            command_prefix: std::env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".to_string()),

            default_volume: std::env::var("DEFAULT_VOLUME")
                .unwrap_or_else(|_| "0.5".to_string())
                .parse()?,
            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            resolve_timeout_secs: std::env::var("RESOLVE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            playback_retry_delay_ms: std::env::var("PLAYBACK_RETRY_DELAY_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()?,
            max_playback_retries: std::env::var("MAX_PLAYBACK_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,

            clean_channels,
            clean_purge_limit: std::env::var("CLEAN_PURGE_LIMIT")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
            ytdlp_cookies: std::env::var("YTDLP_COOKIES")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Volume must be between 0.0 and 1.0
    /// - Queue size and resolve timeout must be greater than 0
    /// - Cleanup intervals must be within 1..=1440 minutes
    /// - Purge limit must be within 1..=100 (Discord bulk-delete cap)
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.default_volume) {
            anyhow::bail!(
                "Default volume must be between 0.0 and 1.0, got: {}",
                self.default_volume
            );
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.resolve_timeout_secs == 0 {
            anyhow::bail!("Resolve timeout must be greater than 0");
        }

        if self.command_prefix.is_empty() {
            anyhow::bail!("Command prefix cannot be empty");
        }

        if self.guild_id == 0 || self.command_channel_id == 0 || self.music_voice_channel_id == 0 {
            anyhow::bail!("Guild, command channel and voice channel ids must be non-zero");
        }

        for clean in &self.clean_channels {
            if clean.channel_id == 0 {
                anyhow::bail!("Cleanup channel id must be non-zero");
            }
            if !CLEAN_INTERVAL_RANGE.contains(&clean.interval_minutes) {
                anyhow::bail!(
                    "Cleanup interval for channel {} must be 1..=1440 minutes, got: {}",
                    clean.channel_id,
                    clean.interval_minutes
                );
            }
        }

        if !(1..=100).contains(&self.clean_purge_limit) {
            anyhow::bail!(
                "Cleanup purge limit must be between 1 and 100, got: {}",
                self.clean_purge_limit
            );
        }

        Ok(())
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn playback_retry_delay(&self) -> Duration {
        Duration::from_millis(self.playback_retry_delay_ms)
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: guild {} (commands in {}, voice in {}, prefix '{}')\n  \
            Playback: {}% vol, {} queue, {}s resolve timeout, {} retries every {}ms\n  \
            Cleanup: {} channel(s), {} messages per pass",
            self.guild_id,
            self.command_channel_id,
            self.music_voice_channel_id,
            self.command_prefix,
            (self.default_volume * 100.0).round() as u32,
            self.max_queue_size,
            self.resolve_timeout_secs,
            self.max_playback_retries,
            self.playback_retry_delay_ms,
            self.clean_channels.len(),
            self.clean_purge_limit,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            guild_id: 0,
            command_channel_id: 0,
            music_voice_channel_id: 0,
            command_prefix: "!".to_string(),

            default_volume: 0.5,
            max_queue_size: 100,
            resolve_timeout_secs: 30,
            playback_retry_delay_ms: 2000,
            max_playback_retries: 3,

            clean_channels: Vec::new(),
            clean_purge_limit: 100,

            ytdlp_path: "yt-dlp".to_string(),
            ytdlp_cookies: None,
        }
    }
}

/// Parses `id:minutes` pairs separated by commas, e.g. `123:60,456:30`.
pub fn parse_clean_channels(raw: &str) -> Result<Vec<CleanChannel>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, minutes) = entry
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("Invalid CLEAN_CHANNELS entry '{}', expected id:minutes", entry))?;
            Ok(CleanChannel {
                channel_id: id.trim().parse().with_context(|| format!("Invalid channel id in '{}'", entry))?,
                interval_minutes: minutes
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid minutes in '{}'", entry))?,
            })
        })
        .collect()
}
