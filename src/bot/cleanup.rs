use anyhow::Result;
use chrono::Utc;
use dashmap::DashMap;
use serenity::{
    builder::GetMessages,
    http::Http,
    model::{
        channel::Message,
        id::{ChannelId, MessageId},
    },
};
use std::{future::Future, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{CleanChannel, CLEAN_INTERVAL_RANGE};

/// Discord only bulk-deletes messages younger than 14 days. A minute of
/// slack keeps borderline messages out of the bulk request.
const BULK_DELETE_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60 - 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CleanupError {
    #[error("<#{0}> is not a channel that can be cleaned")]
    NotEligible(ChannelId),

    #[error("interval must be between 1 and 1440 minutes, got {0}")]
    IntervalOutOfRange(u64),
}

/// Periodic purge of non-pinned messages, one independent task per channel.
pub struct CleanupScheduler {
    eligible: Vec<CleanChannel>,
    purge_limit: u8,
    tasks: DashMap<ChannelId, CancellationToken>,
}

impl CleanupScheduler {
    pub fn new(eligible: Vec<CleanChannel>, purge_limit: u8) -> Self {
        Self {
            eligible,
            purge_limit,
            tasks: DashMap::new(),
        }
    }

    /// Starts every configured channel with its configured interval.
    /// Channels that already run keep their current schedule.
    pub fn start_all(&self, http: Arc<Http>) {
        for channel in &self.eligible {
            let channel_id = ChannelId::new(channel.channel_id);
            if self.tasks.contains_key(&channel_id) {
                continue;
            }
            if let Err(e) = self.schedule(http.clone(), channel_id, channel.interval_minutes) {
                warn!("⚠️ Not cleaning {}: {}", channel_id, e);
            }
        }
    }

    /// Replaces the cleanup task of `channel_id` with one running every
    /// `minutes`.
    pub fn schedule(&self, http: Arc<Http>, channel_id: ChannelId, minutes: u64) -> Result<(), CleanupError> {
        if !self.eligible.iter().any(|c| c.channel_id == channel_id.get()) {
            return Err(CleanupError::NotEligible(channel_id));
        }
        if !CLEAN_INTERVAL_RANGE.contains(&minutes) {
            return Err(CleanupError::IntervalOutOfRange(minutes));
        }

        let token = CancellationToken::new();
        if let Some(previous) = self.tasks.insert(channel_id, token.clone()) {
            previous.cancel();
        }

        let period = Duration::from_secs(minutes * 60);
        let limit = self.purge_limit;
        tokio::spawn(async move {
            run_cleanup(http, channel_id, period, limit, token).await;
        });

        info!("🧹 Cleaning {} every {} minutes", channel_id, minutes);
        Ok(())
    }

    pub fn is_scheduled(&self, channel_id: ChannelId) -> bool {
        self.tasks
            .get(&channel_id)
            .map(|token| !token.is_cancelled())
            .unwrap_or(false)
    }

    pub fn shutdown(&self) {
        for entry in self.tasks.iter() {
            entry.value().cancel();
        }
        self.tasks.clear();
    }
}

async fn run_cleanup(http: Arc<Http>, channel_id: ChannelId, period: Duration, limit: u8, token: CancellationToken) {
    let http = &http;
    run_periodic(period, token, move || async move {
        match purge_channel(http, channel_id, limit).await {
            Ok(0) => debug!("🧹 Nothing to clean in {}", channel_id),
            Ok(deleted) => info!("🧹 Deleted {} messages in {}", deleted, channel_id),
            Err(e) => warn!("❌ Cleanup of {} failed: {:?}", channel_id, e),
        }
    })
    .await;
    debug!("Cleanup task for {} cancelled", channel_id);
}

/// Runs `job` right away, then once per `period` until `token` is cancelled.
async fn run_periodic<F, Fut>(period: Duration, token: CancellationToken, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => job().await,
        }
    }
}

/// What the purge needs to know about a message.
#[derive(Debug, Clone, Copy)]
struct PurgeCandidate {
    id: MessageId,
    created_at: i64,
    pinned: bool,
}

impl From<&Message> for PurgeCandidate {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            created_at: message.timestamp.unix_timestamp(),
            pinned: message.pinned,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct DeletionPlan {
    bulk: Vec<MessageId>,
    single: Vec<MessageId>,
}

/// Skips pinned messages and splits the rest by whether Discord still
/// accepts them in a bulk delete.
fn plan_deletion(candidates: &[PurgeCandidate], now: i64) -> DeletionPlan {
    let mut plan = DeletionPlan::default();
    for candidate in candidates.iter().filter(|c| !c.pinned) {
        if now - candidate.created_at < BULK_DELETE_MAX_AGE_SECS {
            plan.bulk.push(candidate.id);
        } else {
            plan.single.push(candidate.id);
        }
    }
    plan
}

/// Deletes up to `limit` recent non-pinned messages from `channel_id` and
/// returns how many were removed.
pub async fn purge_channel(http: &Http, channel_id: ChannelId, limit: u8) -> Result<usize> {
    let messages = channel_id.messages(http, GetMessages::new().limit(limit)).await?;
    let candidates: Vec<PurgeCandidate> = messages.iter().map(PurgeCandidate::from).collect();
    let plan = plan_deletion(&candidates, Utc::now().timestamp());

    match plan.bulk.as_slice() {
        [] => {}
        [only] => channel_id.delete_message(http, *only).await?,
        ids => channel_id.delete_messages(http, ids).await?,
    }

    let mut deleted = plan.bulk.len();
    for id in plan.single {
        match channel_id.delete_message(http, id).await {
            Ok(()) => deleted += 1,
            Err(e) => warn!("Could not delete old message {}: {:?}", id, e),
        }
    }

    Ok(deleted)
}
