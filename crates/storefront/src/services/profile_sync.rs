//! Ordered, version-stamped profile writes.
//!
//! The checkout wizard issues two kinds of writes against one profile: the
//! full upsert when the form is saved and a theme-only update when a template
//! is picked. The theme update runs in a background task, so without
//! coordination a slow full save could land after it and reset the theme.
//!
//! [`ProfileWriteQueue`] hands out a version per profile at submission time
//! and runs writes for the same profile one at a time. A write whose version
//! is older than the last one applied is skipped. Lanes for profiles with
//! no writes for a while are dropped.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use pgcards_core::ProfileId;

const LANE_IDLE: Duration = Duration::from_secs(10 * 60);

/// Result of a queued write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<T> {
    Applied(T),
    /// A newer write for the same profile was applied first.
    Superseded,
}

impl<T> WriteOutcome<T> {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Position of a write in its profile's sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTicket {
    profile_id: ProfileId,
    version: u64,
}

impl WriteTicket {
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Default)]
struct Lane {
    next_version: AtomicU64,
    /// Holds the last applied version.
    applied: tokio::sync::Mutex<u64>,
}

/// Per-profile write serialiser shared through `AppState`.
#[derive(Clone)]
pub struct ProfileWriteQueue {
    lanes: Cache<ProfileId, Arc<Lane>>,
}

impl Default for ProfileWriteQueue {
    fn default() -> Self {
        Self::with_idle(LANE_IDLE)
    }
}

impl ProfileWriteQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue whose lanes are dropped after `idle` without a write.
    #[must_use]
    pub fn with_idle(idle: Duration) -> Self {
        Self {
            lanes: Cache::builder().time_to_idle(idle).build(),
        }
    }

    async fn lane(&self, profile_id: &ProfileId) -> Arc<Lane> {
        self.lanes
            .get_with(profile_id.clone(), async { Arc::new(Lane::default()) })
            .await
    }

    /// Reserve the next version for a profile.
    pub async fn ticket(&self, profile_id: &ProfileId) -> WriteTicket {
        let lane = self.lane(profile_id).await;
        let version = lane.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        WriteTicket {
            profile_id: profile_id.clone(),
            version,
        }
    }

    /// Run `write` for a previously issued ticket.
    ///
    /// Waits for earlier writes on the same profile to finish. The write is
    /// skipped when a newer ticket has already been applied; a failed write
    /// does not advance the applied version.
    ///
    /// # Errors
    ///
    /// Returns whatever error `write` returns.
    pub async fn apply<T, E, F, Fut>(&self, ticket: WriteTicket, write: F) -> Result<WriteOutcome<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let lane = self.lane(&ticket.profile_id).await;
        let mut applied = lane.applied.lock().await;
        if ticket.version < *applied {
            tracing::debug!(
                profile_id = %ticket.profile_id,
                version = ticket.version,
                applied = *applied,
                "Skipping superseded profile write"
            );
            return Ok(WriteOutcome::Superseded);
        }
        let value = write().await?;
        *applied = ticket.version;
        Ok(WriteOutcome::Applied(value))
    }

    /// Reserve a ticket and run `write` with it.
    ///
    /// # Errors
    ///
    /// Returns whatever error `write` returns.
    pub async fn submit<T, E, F, Fut>(
        &self,
        profile_id: &ProfileId,
        write: F,
    ) -> Result<WriteOutcome<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let ticket = self.ticket(profile_id).await;
        self.apply(ticket, write).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[tokio::test]
    async fn test_stale_write_is_skipped() {
        let queue = ProfileWriteQueue::new();
        let id = ProfileId::new("p1");
        let full_save = queue.ticket(&id).await;
        let theme = queue.ticket(&id).await;
        assert!(theme.version() > full_save.version());

        let first = queue
            .apply(theme, || async { Ok::<_, ()>("theme") })
            .await
            .unwrap();
        assert_eq!(first, WriteOutcome::Applied("theme"));

        let mut ran = false;
        let second = queue
            .apply(full_save, || {
                ran = true;
                async { Ok::<_, ()>("save") }
            })
            .await
            .unwrap();
        assert_eq!(second, WriteOutcome::Superseded);
        assert!(!ran);
    }

    #[tokio::test]
    async fn test_same_profile_writes_run_in_submission_order() {
        let queue = ProfileWriteQueue::new();
        let id = ProfileId::new("p1");
        let log = Arc::new(Mutex::new(Vec::new()));

        let slow = {
            let log = Arc::clone(&log);
            queue.submit(&id, move || async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                log.lock().unwrap().push("full save");
                Ok::<_, ()>(())
            })
        };
        let fast = {
            let log = Arc::clone(&log);
            queue.submit(&id, move || async move {
                log.lock().unwrap().push("theme");
                Ok::<_, ()>(())
            })
        };

        let (a, b) = tokio::join!(slow, fast);
        assert!(a.unwrap().is_applied());
        assert!(b.unwrap().is_applied());
        assert_eq!(*log.lock().unwrap(), vec!["full save", "theme"]);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_advance() {
        let queue = ProfileWriteQueue::new();
        let id = ProfileId::new("p1");
        let first = queue.ticket(&id).await;
        let second = queue.ticket(&id).await;

        let failed = queue.apply(second, || async { Err::<(), _>("boom") }).await;
        assert_eq!(failed, Err("boom"));

        let outcome = queue.apply(first, || async { Ok::<_, &str>(1) }).await;
        assert_eq!(outcome, Ok(WriteOutcome::Applied(1)));
    }

    #[tokio::test]
    async fn test_profiles_are_independent() {
        let queue = ProfileWriteQueue::new();
        let a = queue.ticket(&ProfileId::new("a")).await;
        let b = queue.ticket(&ProfileId::new("b")).await;
        assert_eq!(a.version(), 1);
        assert_eq!(b.version(), 1);
    }

    #[tokio::test]
    async fn test_idle_lanes_are_dropped() {
        let queue = ProfileWriteQueue::with_idle(Duration::from_millis(50));
        let id = ProfileId::new("p1");
        assert_eq!(queue.ticket(&id).await.version(), 1);
        assert_eq!(queue.ticket(&id).await.version(), 2);

        tokio::time::sleep(Duration::from_millis(120)).await;
        queue.lanes.run_pending_tasks().await;
        assert_eq!(queue.lanes.entry_count(), 0);
        assert_eq!(queue.ticket(&id).await.version(), 1);
    }
}
