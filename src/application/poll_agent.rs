use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::state_cache::{self, SharedCache};
use crate::api::SabClient;
use crate::notify::NotificationSink;
use crate::utils::truncate;

/// Most recent history entries fetched per cycle
const HISTORY_LIMIT: u32 = 10;
/// Longest download name shown in a notification
const NAME_DISPLAY_LEN: usize = 20;

/// Periodically fetches queue and history snapshots, updates the cache and
/// announces completed downloads.
///
/// The agent is the only writer of the queue/history cache fields. A failed
/// fetch leaves the previous snapshot untouched and is retried implicitly by
/// the next cycle; nothing is surfaced to callers.
pub struct PollAgent {
    client: SabClient,
    cache: SharedCache,
    sink: Arc<dyn NotificationSink>,
}

impl PollAgent {
    pub fn new(client: SabClient, cache: SharedCache, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            client,
            cache,
            sink,
        }
    }

    /// One poll cycle. The two fetches run concurrently and fail
    /// independently of each other.
    pub async fn tick(&self) {
        futures::join!(self.poll_queue(), self.poll_history());
    }

    async fn poll_queue(&self) {
        match self.client.get_queue().await {
            Ok(queue) => {
                let count = state_cache::lock(&self.cache).apply_queue(queue);
                self.sink.set_badge(Some(count));
            }
            Err(e) => debug!("queue poll failed: {}", e),
        }
    }

    async fn poll_history(&self) {
        match self.client.get_history(Some(HISTORY_LIMIT)).await {
            Ok(history) => {
                let completed = state_cache::lock(&self.cache).apply_history(history);
                for slot in completed {
                    self.sink.notify(
                        "Download complete",
                        &truncate(&slot.name, NAME_DISPLAY_LEN),
                    );
                }
            }
            Err(e) => debug!("history poll failed: {}", e),
        }
    }
}

/// Recurring driver for [`PollAgent::tick`].
///
/// Rearming aborts the armed task before spawning its replacement, so two
/// loops never run for the same timer. The first tick fires one full interval
/// after arming; callers wanting an immediate poll run one themselves.
#[derive(Debug, Default)]
pub struct PollTimer {
    task: Option<JoinHandle<()>>,
}

impl PollTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rearm<F, Fut>(&mut self, every: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.disarm();
        self.task = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(every);
            // interval() yields immediately once; skip that tick
            timer.tick().await;
            loop {
                timer.tick().await;
                tick().await;
            }
        }));
    }

    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
