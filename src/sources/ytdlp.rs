use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{is_direct_url, Track, TrackResolver};
use crate::config::Config;

/// Resolves queries by shelling out to yt-dlp.
///
/// URLs are extracted directly; anything else becomes a `ytsearch1:` query
/// and the first hit wins.
pub struct YtDlpResolver {
    executable: String,
    cookies: Option<String>,
    // Limit concurrent yt-dlp processes to avoid rate limiting
    rate_limiter: Semaphore,
}

/// Subset of yt-dlp's `--dump-json` output we rely on.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    url: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    is_live: Option<bool>,
    entries: Option<Vec<YtDlpInfo>>,
}

impl YtDlpResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            executable: config.ytdlp_path.clone(),
            cookies: config.ytdlp_cookies.clone(),
            rate_limiter: Semaphore::new(3),
        }
    }

    fn build_args(&self, query: &str) -> Vec<String> {
        let target = if is_direct_url(query) {
            query.trim().to_string()
        } else {
            format!("ytsearch1:{}", query.trim())
        };

        let mut args: Vec<String> = [
            "--no-playlist",
            "-f",
            "bestaudio/best",
            "--dump-json",
            "--no-warnings",
            "--quiet",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if let Some(cookies) = &self.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.clone());
        }

        args.push(target);
        args
    }

    /// Checks that the executable can run at all. Used by `--health-check`.
    pub async fn verify(&self) -> Result<String> {
        let output = Command::new(&self.executable)
            .arg("--version")
            .output()
            .await
            .with_context(|| format!("could not execute {}", self.executable))?;

        if !output.status.success() {
            anyhow::bail!("{} --version exited with {}", self.executable, output.status);
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> Result<Track> {
        let _permit = self.rate_limiter.acquire().await?;

        info!("🔍 Resolving: {}", query);
        let args = self.build_args(query);
        debug!("yt-dlp args: {:?}", args);

        let output = Command::new(&self.executable)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .context("Error running yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            warn!("❌ yt-dlp failed for '{}': {}", query, error.trim());
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }

        let track = parse_dump_json(&String::from_utf8_lossy(&output.stdout))?;
        info!("✅ Resolved '{}' -> {}", query, track.title());
        Ok(track)
    }
}

/// Picks the first usable entry out of yt-dlp's JSON output.
///
/// Search queries print one object per line; some versions wrap results in
/// an `entries` array instead.
fn parse_dump_json(stdout: &str) -> Result<Track> {
    let info = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(|line| serde_json::from_str::<YtDlpInfo>(line).ok())
        .ok_or_else(|| anyhow::anyhow!("No results found"))?;

    let info = match info.entries {
        Some(entries) => entries
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No results found"))?,
        None => info,
    };

    let stream_url = info
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| anyhow::anyhow!("yt-dlp returned no playable stream"))?;

    if info.is_live.unwrap_or(false) {
        debug!("Resolved a live stream, duration unknown");
    }

    let mut track = Track::new(
        info.title.unwrap_or_else(|| "Unknown title".to_string()),
        stream_url,
        info.duration.map(|d| d.max(0.0) as u64).unwrap_or(0),
    );

    if let Some(page) = info.webpage_url {
        track = track.with_page_url(page);
    }

    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolver(cookies: Option<&str>) -> YtDlpResolver {
        YtDlpResolver::new(&Config {
            ytdlp_cookies: cookies.map(String::from),
            ..Config::default()
        })
    }

    #[test]
    fn search_queries_use_ytsearch() {
        let args = resolver(None).build_args("  iu palette ");
        assert_eq!(args.last().unwrap(), "ytsearch1:iu palette");
        assert!(!args.contains(&"--cookies".to_string()));
    }

    #[test]
    fn urls_are_passed_through_with_cookies() {
        let args = resolver(Some("cookies.txt")).build_args("https://youtu.be/abc");
        assert_eq!(args.last().unwrap(), "https://youtu.be/abc");
        let pos = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[pos + 1], "cookies.txt");
    }

    #[test]
    fn parses_single_object_output() {
        let stdout = r#"{"title":"Palette","url":"https://cdn.example/a.m4a","duration":217.4,"webpage_url":"https://www.youtube.com/watch?v=abc"}"#;
        let track = parse_dump_json(stdout).unwrap();
        assert_eq!(track.title(), "Palette");
        assert_eq!(track.stream_url(), "https://cdn.example/a.m4a");
        assert_eq!(track.duration_secs(), 217);
        assert_eq!(track.page_url(), Some("https://www.youtube.com/watch?v=abc"));
    }

    #[test]
    fn parses_wrapped_entries() {
        let stdout = r#"{"title":"search","entries":[{"title":"First","url":"https://cdn.example/1"},{"title":"Second","url":"https://cdn.example/2"}]}"#;
        let track = parse_dump_json(stdout).unwrap();
        assert_eq!(track.title(), "First");
        assert_eq!(track.duration_secs(), 0);
    }

    #[test]
    fn rejects_output_without_stream() {
        assert!(parse_dump_json("").is_err());
        assert!(parse_dump_json(r#"{"title":"x"}"#).is_err());
        assert!(parse_dump_json(r#"{"title":"x","entries":[]}"#).is_err());
    }
}
