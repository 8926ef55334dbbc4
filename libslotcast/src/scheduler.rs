//! Queue orchestration
//!
//! The scheduler is the only component that changes a post's status. It owns
//! the transition points (enqueue, publish, fail) and the timestamping that
//! goes with them; the store underneath is pure keyed data access.
//!
//! Transitions are permissive, matching the queue's ledger character: a
//! second `mark_published` overwrites the first timestamp (last write wins),
//! and `mark_failed` after a publish clears `published_at` so the
//! published-at/status invariant holds on every path.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::store::PostStore;
use crate::types::{Post, PostStatus};

pub struct Scheduler {
    store: PostStore,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    /// Create a scheduler reading wall-clock time
    pub fn new(store: PostStore) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Create a scheduler with an injected time source
    pub fn with_clock(store: PostStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Enqueue a draft: transition it to scheduled and insert it
    ///
    /// Consumes the draft; the post enters the store already scheduled and
    /// the returned snapshot reflects that.
    ///
    /// # Errors
    ///
    /// A duplicate id surfaces the store's [`StoreError::Duplicate`]
    /// unchanged.
    ///
    /// [`StoreError::Duplicate`]: crate::error::StoreError::Duplicate
    pub async fn schedule_post(&self, post_id: &str, mut post: Post) -> Result<Post> {
        post.status = PostStatus::Scheduled;
        self.store.add(post_id, &post).await?;
        info!(
            "Scheduled post {} for {}",
            post_id, post.schedule.scheduled_at
        );
        Ok(post)
    }

    /// Scheduled posts whose instant has passed
    ///
    /// `now` defaults to a single clock reading captured for the whole call,
    /// in UTC. The cutoff is inclusive: a post scheduled for exactly `now`
    /// is due.
    pub async fn due_posts(&self, now: Option<DateTime<Utc>>) -> Result<Vec<Post>> {
        let now = now.unwrap_or_else(|| self.clock.now());
        self.store.due_posts(now).await
    }

    /// Record a successful publish
    ///
    /// Sets the published timestamp to `published_at`, or to the clock's now
    /// if omitted. Calling this again overwrites the timestamp.
    ///
    /// # Errors
    ///
    /// Fails with the store's [`StoreError::NotFound`] if the id was never
    /// enqueued.
    ///
    /// [`StoreError::NotFound`]: crate::error::StoreError::NotFound
    pub async fn mark_published(
        &self,
        post_id: &str,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<Post> {
        let mut post = self.store.get(post_id).await?;
        post.status = PostStatus::Published;
        post.published_at = Some(published_at.unwrap_or_else(|| self.clock.now()));
        self.store.update(post_id, &post).await?;
        info!("Marked post {} as published", post_id);
        Ok(post)
    }

    /// Record a failed publish
    ///
    /// # Errors
    ///
    /// Fails with the store's [`StoreError::NotFound`] if the id was never
    /// enqueued.
    ///
    /// [`StoreError::NotFound`]: crate::error::StoreError::NotFound
    pub async fn mark_failed(&self, post_id: &str) -> Result<Post> {
        let mut post = self.store.get(post_id).await?;
        post.status = PostStatus::Failed;
        post.published_at = None;
        self.store.update(post_id, &post).await?;
        warn!("Marked post {} as failed", post_id);
        Ok(post)
    }

    /// Snapshot of one post, for display layers
    pub async fn get(&self, post_id: &str) -> Result<Post> {
        self.store.get(post_id).await
    }

    /// Snapshot of the whole queue, for display layers
    pub async fn list_all(&self) -> Result<Vec<Post>> {
        self.store.list_all().await
    }
}
