//! Publishing boundary
//!
//! Real platform integrations live outside this crate. A publishing backend
//! takes a scheduled post plus its account credential, attempts delivery, and
//! is expected to report exactly one terminal outcome per post id back
//! through the scheduler (`mark_published` or `mark_failed`).

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{Result, SlotcastError};
use crate::types::Post;

/// A backend that can push a post to its platform
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Lowercase platform identifier
    fn name(&self) -> &str;

    /// Deliver the post, returning the platform-assigned id
    ///
    /// # Errors
    ///
    /// Returns [`SlotcastError::Publish`] when delivery fails; the caller
    /// reports the outcome to the scheduler either way.
    async fn publish(&self, post: &Post) -> Result<String>;
}

/// Mock publisher for testing
///
/// Records every caption it sees and succeeds or fails on command. Available
/// in all builds (not just tests) so integration tests can exercise the
/// scheduler's outcome reporting without credentials or network access.
pub struct MockPublisher {
    name: String,
    succeeds: bool,
    error: Option<String>,
    delivered: Arc<Mutex<Vec<String>>>,
}

impl MockPublisher {
    /// A publisher that always succeeds
    pub fn success(name: &str) -> Self {
        Self {
            name: name.to_string(),
            succeeds: true,
            error: None,
            delivered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A publisher that always fails with the given error
    pub fn failure(name: &str, error: &str) -> Self {
        Self {
            name: name.to_string(),
            succeeds: false,
            error: Some(error.to_string()),
            delivered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Captions delivered so far, in order
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }

    /// Number of delivery attempts that succeeded
    pub fn delivery_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, post: &Post) -> Result<String> {
        if self.succeeds {
            let mut delivered = self.delivered.lock().unwrap();
            delivered.push(post.caption.clone());
            Ok(format!("{}:{}", self.name, delivered.len()))
        } else {
            let message = self
                .error
                .clone()
                .unwrap_or_else(|| "Mock publishing failed".to_string());
            Err(SlotcastError::Publish(message))
        }
    }
}
