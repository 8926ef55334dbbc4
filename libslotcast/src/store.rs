//! Keyed post storage
//!
//! The store is the authoritative holder of post records. It enforces key
//! integrity (duplicate and missing ids) and answers due-post queries; it
//! does not enforce business rules. Accessors hand out owned snapshots, so
//! callers can never mutate stored state behind the scheduler's back.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::types::{Account, Platform, Post, PostStatus, Schedule};

#[derive(Clone)]
pub struct PostStore {
    pool: SqlitePool,
}

const POST_COLUMNS: &str = "id, platform, handle, display_name, auth_token, caption, hashtags, \
     media_urls, scheduled_at, timezone_name, recurrence, platform_variant, status, created_at, \
     published_at";

impl PostStore {
    /// Open (or create) a store at the given path
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created, the
    /// database cannot be opened, or migrations fail.
    pub async fn new(db_path: &str) -> Result<Self> {
        // Expand path and create parent directories
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::Io)?;
        }

        // Forward slashes work for SQLite URLs on both Windows and Unix;
        // mode=rwc creates the database file if it doesn't exist
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(StoreError::Sqlx)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(StoreError::Migration)?;

        Ok(Self { pool })
    }

    /// Open a store that lives only for the lifetime of the process
    ///
    /// Pinned to a single long-lived connection: every in-memory SQLite
    /// connection is its own database, so the pool must never open a second
    /// one or recycle the first.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(StoreError::Sqlx)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(StoreError::Migration)?;

        Ok(Self { pool })
    }

    /// Open the store configured in `config.database.path`
    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.database.path).await
    }

    /// Insert a post under a new id
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::Duplicate`] if the id is already taken.
    pub async fn add(&self, post_id: &str, post: &Post) -> Result<()> {
        let hashtags = serde_json::to_string(&post.hashtags).map_err(StoreError::Encode)?;
        let media_urls = serde_json::to_string(&post.media_urls).map_err(StoreError::Encode)?;

        let result = sqlx::query(
            r#"
            INSERT INTO posts (id, platform, handle, display_name, auth_token, caption, hashtags,
                               media_urls, scheduled_at, timezone_name, recurrence,
                               platform_variant, status, created_at, published_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post_id)
        .bind(post.account.platform.as_str())
        .bind(&post.account.handle)
        .bind(&post.account.display_name)
        .bind(&post.account.auth_token)
        .bind(&post.caption)
        .bind(&hashtags)
        .bind(&media_urls)
        .bind(post.schedule.scheduled_at.timestamp())
        .bind(&post.schedule.timezone_name)
        .bind(&post.schedule.recurrence)
        .bind(&post.platform_variant)
        .bind(post.status.as_str())
        .bind(post.created_at.timestamp())
        .bind(post.published_at.map(|t| t.timestamp()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Duplicate {
                    id: post_id.to_string(),
                }
                .into())
            }
            Err(e) => Err(StoreError::Sqlx(e).into()),
        }
    }

    /// Fetch a snapshot of the post stored under an id
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::NotFound`] if the id is absent.
    pub async fn get(&self, post_id: &str) -> Result<Post> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Sqlx)?;

        match row {
            Some(row) => Ok(decode_post(&row)?),
            None => Err(StoreError::NotFound {
                id: post_id.to_string(),
            }
            .into()),
        }
    }

    /// Replace the post stored under an existing id
    ///
    /// Not an upsert: status mutation is only legal for posts that were
    /// properly enqueued.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::NotFound`] if the id is absent.
    pub async fn update(&self, post_id: &str, post: &Post) -> Result<()> {
        let hashtags = serde_json::to_string(&post.hashtags).map_err(StoreError::Encode)?;
        let media_urls = serde_json::to_string(&post.media_urls).map_err(StoreError::Encode)?;

        let result = sqlx::query(
            r#"
            UPDATE posts
            SET platform = ?, handle = ?, display_name = ?, auth_token = ?, caption = ?,
                hashtags = ?, media_urls = ?, scheduled_at = ?, timezone_name = ?, recurrence = ?,
                platform_variant = ?, status = ?, created_at = ?, published_at = ?
            WHERE id = ?
            "#,
        )
        .bind(post.account.platform.as_str())
        .bind(&post.account.handle)
        .bind(&post.account.display_name)
        .bind(&post.account.auth_token)
        .bind(&post.caption)
        .bind(&hashtags)
        .bind(&media_urls)
        .bind(post.schedule.scheduled_at.timestamp())
        .bind(&post.schedule.timezone_name)
        .bind(&post.schedule.recurrence)
        .bind(&post.platform_variant)
        .bind(post.status.as_str())
        .bind(post.created_at.timestamp())
        .bind(post.published_at.map(|t| t.timestamp()))
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                id: post_id.to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Snapshot of every stored post
    ///
    /// Iteration order is not contractual.
    pub async fn list_all(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts ORDER BY created_at DESC",
            POST_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Sqlx)?;

        rows.iter().map(|row| Ok(decode_post(row)?)).collect()
    }

    /// Scheduled posts whose instant has passed
    ///
    /// Returns exactly the posts with status `scheduled` and
    /// `scheduled_at <= now` (inclusive). Posts already published or failed
    /// never resurface, whatever their scheduled instant. The result is a
    /// snapshot taken at call time.
    pub async fn due_posts(&self, now: DateTime<Utc>) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts WHERE status = ? AND scheduled_at <= ? ORDER BY scheduled_at ASC",
            POST_COLUMNS
        ))
        .bind(PostStatus::Scheduled.as_str())
        .bind(now.timestamp())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Sqlx)?;

        rows.iter().map(|row| Ok(decode_post(row)?)).collect()
    }
}

/// Decode one storage row back into a post
///
/// The closed enums make illegal platform/status values unrepresentable in
/// memory, so the TEXT columns are validated here at the boundary.
fn decode_post(row: &SqliteRow) -> std::result::Result<Post, StoreError> {
    let platform = Platform::from_str(&row.get::<String, _>("platform"))
        .map_err(StoreError::Decode)?;
    let status = PostStatus::from_str(&row.get::<String, _>("status"))
        .map_err(StoreError::Decode)?;

    let hashtags: Vec<String> = serde_json::from_str(&row.get::<String, _>("hashtags"))
        .map_err(|e| StoreError::Decode(format!("hashtags: {}", e)))?;
    let media_urls: Vec<String> = serde_json::from_str(&row.get::<String, _>("media_urls"))
        .map_err(|e| StoreError::Decode(format!("media_urls: {}", e)))?;

    let scheduled_at = decode_instant(row.get("scheduled_at"), "scheduled_at")?;
    let created_at = decode_instant(row.get("created_at"), "created_at")?;
    let published_at = row
        .get::<Option<i64>, _>("published_at")
        .map(|ts| decode_instant(ts, "published_at"))
        .transpose()?;

    Ok(Post {
        account: Account {
            platform,
            handle: row.get("handle"),
            display_name: row.get("display_name"),
            auth_token: row.get("auth_token"),
        },
        caption: row.get("caption"),
        hashtags,
        media_urls,
        schedule: Schedule {
            scheduled_at,
            timezone_name: row.get("timezone_name"),
            recurrence: row.get("recurrence"),
        },
        platform_variant: row.get("platform_variant"),
        status,
        created_at,
        published_at,
    })
}

fn decode_instant(ts: i64, column: &str) -> std::result::Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| StoreError::Decode(format!("{}: timestamp {} out of range", column, ts)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SlotcastError;
    use crate::types::{Account, Platform, Schedule};
    use chrono::TimeZone;

    fn instant(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, minute, 0).unwrap()
    }

    fn sample_post(status: PostStatus, scheduled_at: DateTime<Utc>) -> Post {
        Post {
            account: Account::new(Platform::Instagram, "@creator", "Creator", "secure-token"),
            caption: "Launch teaser".to_string(),
            hashtags: vec!["#launch".to_string(), "#creator".to_string()],
            media_urls: vec!["https://example.com/asset.jpg".to_string()],
            schedule: Schedule::new(scheduled_at, "UTC", None),
            platform_variant: None,
            status,
            created_at: instant(8, 0),
            published_at: None,
        }
    }

    #[tokio::test]
    async fn test_add_then_get_returns_equal_post() {
        let store = PostStore::in_memory().await.unwrap();
        let post = sample_post(PostStatus::Scheduled, instant(10, 0));

        store.add("post-1", &post).await.unwrap();

        let retrieved = store.get("post-1").await.unwrap();
        assert_eq!(retrieved, post);
    }

    #[tokio::test]
    async fn test_add_duplicate_id_fails() {
        let store = PostStore::in_memory().await.unwrap();
        let post = sample_post(PostStatus::Scheduled, instant(10, 0));

        store.add("post-1", &post).await.unwrap();
        let result = store.add("post-1", &post).await;

        match result {
            Err(SlotcastError::Store(StoreError::Duplicate { id })) => {
                assert_eq!(id, "post-1");
            }
            other => panic!("Expected Duplicate, got {:?}", other),
        }

        // The original row is untouched
        let retrieved = store.get("post-1").await.unwrap();
        assert_eq!(retrieved.caption, post.caption);
    }

    #[tokio::test]
    async fn test_get_absent_id_fails_with_not_found() {
        let store = PostStore::in_memory().await.unwrap();

        let result = store.get("nope").await;
        match result {
            Err(SlotcastError::Store(StoreError::NotFound { id })) => assert_eq!(id, "nope"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_replaces_stored_post() {
        let store = PostStore::in_memory().await.unwrap();
        let post = sample_post(PostStatus::Scheduled, instant(10, 0));
        store.add("post-1", &post).await.unwrap();

        let mut updated = post.clone();
        updated.status = PostStatus::Published;
        updated.published_at = Some(instant(10, 5));
        store.update("post-1", &updated).await.unwrap();

        let retrieved = store.get("post-1").await.unwrap();
        assert_eq!(retrieved.status, PostStatus::Published);
        assert_eq!(retrieved.published_at, Some(instant(10, 5)));
    }

    #[tokio::test]
    async fn test_update_absent_id_is_not_an_upsert() {
        let store = PostStore::in_memory().await.unwrap();
        let post = sample_post(PostStatus::Scheduled, instant(10, 0));

        let result = store.update("never-added", &post).await;
        assert!(matches!(
            result,
            Err(SlotcastError::Store(StoreError::NotFound { .. }))
        ));

        // Nothing was inserted behind our back
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_all_returns_every_post() {
        let store = PostStore::in_memory().await.unwrap();

        for i in 0..4 {
            let mut post = sample_post(PostStatus::Scheduled, instant(10, i));
            post.caption = format!("Post {}", i);
            store.add(&format!("post-{}", i), &post).await.unwrap();
        }

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 4);
        for i in 0..4 {
            assert!(all.iter().any(|p| p.caption == format!("Post {}", i)));
        }
    }

    #[tokio::test]
    async fn test_due_posts_time_cutoff_is_inclusive() {
        let store = PostStore::in_memory().await.unwrap();
        let at = instant(10, 0);
        store
            .add("exact", &sample_post(PostStatus::Scheduled, at))
            .await
            .unwrap();

        // Exactly `now` is due
        let due = store.due_posts(at).await.unwrap();
        assert_eq!(due.len(), 1);

        // One second earlier it is not
        let due = store
            .due_posts(at - chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn test_due_posts_excludes_terminal_statuses() {
        let store = PostStore::in_memory().await.unwrap();
        let past = instant(9, 0);

        store
            .add("scheduled", &sample_post(PostStatus::Scheduled, past))
            .await
            .unwrap();

        let mut published = sample_post(PostStatus::Published, past);
        published.published_at = Some(instant(9, 30));
        store.add("published", &published).await.unwrap();

        store
            .add("failed", &sample_post(PostStatus::Failed, past))
            .await
            .unwrap();

        store
            .add("draft", &sample_post(PostStatus::Draft, past))
            .await
            .unwrap();

        let due = store.due_posts(instant(12, 0)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].status, PostStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_due_posts_is_restartable() {
        let store = PostStore::in_memory().await.unwrap();
        store
            .add("early", &sample_post(PostStatus::Scheduled, instant(9, 0)))
            .await
            .unwrap();
        store
            .add("late", &sample_post(PostStatus::Scheduled, instant(11, 0)))
            .await
            .unwrap();

        assert_eq!(store.due_posts(instant(10, 0)).await.unwrap().len(), 1);
        assert_eq!(store.due_posts(instant(12, 0)).await.unwrap().len(), 2);
        // Earlier `now` again; nothing was mutated by the previous calls
        assert_eq!(store.due_posts(instant(10, 0)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_optional_fields() {
        let store = PostStore::in_memory().await.unwrap();
        let mut post = sample_post(PostStatus::Scheduled, instant(10, 0));
        post.schedule.recurrence = Some("FREQ=DAILY".to_string());
        post.platform_variant = Some("short form".to_string());

        store.add("rich", &post).await.unwrap();
        let retrieved = store.get("rich").await.unwrap();

        assert_eq!(retrieved.schedule.recurrence.as_deref(), Some("FREQ=DAILY"));
        assert_eq!(retrieved.platform_variant.as_deref(), Some("short form"));
        assert_eq!(retrieved.schedule.timezone_name, "UTC");
    }

    #[tokio::test]
    async fn test_unknown_status_text_is_a_decode_error() {
        let store = PostStore::in_memory().await.unwrap();
        let post = sample_post(PostStatus::Scheduled, instant(10, 0));
        store.add("post-1", &post).await.unwrap();

        // Corrupt the row behind the store's API
        sqlx::query("UPDATE posts SET status = 'publishing' WHERE id = 'post-1'")
            .execute(&store.pool)
            .await
            .unwrap();

        let result = store.get("post-1").await;
        match result {
            Err(SlotcastError::Store(StoreError::Decode(message))) => {
                assert!(message.contains("publishing"));
            }
            other => panic!("Expected Decode, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_distinct_ids() {
        let store = PostStore::in_memory().await.unwrap();

        let mut handles = vec![];
        for i in 0..5 {
            let store = store.clone();
            let post = sample_post(PostStatus::Scheduled, instant(10, i));
            handles.push(tokio::spawn(async move {
                store.add(&format!("post-{}", i), &post).await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(store.list_all().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_same_id_yield_one_winner() {
        let store = PostStore::in_memory().await.unwrap();

        let mut handles = vec![];
        for i in 0..4 {
            let store = store.clone();
            let mut post = sample_post(PostStatus::Scheduled, instant(10, 0));
            post.caption = format!("Contender {}", i);
            handles.push(tokio::spawn(
                async move { store.add("contested", &post).await },
            ));
        }

        let mut successes = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(SlotcastError::Store(StoreError::Duplicate { .. })) => duplicates += 1,
                Err(other) => panic!("Unexpected error: {:?}", other),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(duplicates, 3);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_on_disk_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("queue.db");
        let store = PostStore::new(db_path.to_str().unwrap()).await.unwrap();

        let post = sample_post(PostStatus::Scheduled, instant(10, 0));
        store.add("post-1", &post).await.unwrap();
        assert_eq!(store.get("post-1").await.unwrap(), post);
    }
}
