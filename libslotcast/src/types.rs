//! Core types for Slotcast

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, ScheduleError};

/// Platform a post is destined for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
    Linkedin,
    X,
    Youtube,
}

impl Platform {
    /// Lowercase identifier used in storage and display
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::Linkedin => "linkedin",
            Self::X => "x",
            Self::Youtube => "youtube",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instagram" => Ok(Self::Instagram),
            "facebook" => Ok(Self::Facebook),
            "linkedin" => Ok(Self::Linkedin),
            "x" => Ok(Self::X),
            "youtube" => Ok(Self::Youtube),
            _ => Err(format!(
                "Unknown platform: '{}'. Valid options: instagram, facebook, linkedin, x, youtube",
                s
            )),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An account on one platform
///
/// Identity is by value; accounts carry no lifecycle beyond construction.
/// The auth token is an opaque string here, managed elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub platform: Platform,
    pub handle: String,
    pub display_name: String,
    pub auth_token: String,
}

impl Account {
    pub fn new(
        platform: Platform,
        handle: impl Into<String>,
        display_name: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            handle: handle.into(),
            display_name: display_name.into(),
            auth_token: auth_token.into(),
        }
    }
}

/// When a post should go out
///
/// The instant is normalized to UTC at construction; the timezone name is
/// kept only for display. An ambiguous (offset-less) instant cannot become
/// a `Schedule` — [`Schedule::parse`] rejects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    pub scheduled_at: DateTime<Utc>,
    pub timezone_name: String,
    /// Uninterpreted recurrence rule; expansion happens outside the queue.
    pub recurrence: Option<String>,
}

impl Schedule {
    pub fn new(
        scheduled_at: DateTime<Utc>,
        timezone_name: impl Into<String>,
        recurrence: Option<String>,
    ) -> Self {
        Self {
            scheduled_at,
            timezone_name: timezone_name.into(),
            recurrence,
        }
    }

    /// Parse an RFC 3339 instant into a schedule
    ///
    /// The input must carry an explicit UTC offset ("2026-03-01T09:00:00+02:00"
    /// or a trailing "Z"). A naive local datetime is rejected with
    /// [`ScheduleError::MissingOffset`]; anything else unparseable with
    /// [`ScheduleError::Unparseable`].
    ///
    /// # Errors
    ///
    /// Returns an error if the instant is naive or cannot be parsed.
    pub fn parse(
        input: &str,
        timezone_name: impl Into<String>,
        recurrence: Option<String>,
    ) -> Result<Self> {
        match DateTime::parse_from_rfc3339(input) {
            Ok(aware) => Ok(Self::new(
                aware.with_timezone(&Utc),
                timezone_name,
                recurrence,
            )),
            Err(_) => {
                let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S").is_ok()
                    || NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S").is_ok();
                if naive {
                    Err(ScheduleError::MissingOffset(input.to_string()).into())
                } else {
                    Err(ScheduleError::Unparseable(input.to_string()).into())
                }
            }
        }
    }
}

/// Lifecycle status of a queued post
///
/// One-directional: draft posts enter the queue as scheduled and end as
/// published or failed. Terminal outcomes stay in the store; there is no
/// removal path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Published,
    Failed,
}

impl PostStatus {
    /// Lowercase identifier used for the storage TEXT column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Published => "published",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "published" => Ok(Self::Published),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown post status: '{}'", s)),
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of content queued for one account
///
/// Invariant: `published_at` is set exactly when status is `Published`.
/// Only the scheduler mutates status; everyone else sees snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub account: Account,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub media_urls: Vec<String>,
    pub schedule: Schedule,
    pub platform_variant: Option<String>,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Create a draft post
    pub fn new(
        account: Account,
        caption: impl Into<String>,
        hashtags: Vec<String>,
        media_urls: Vec<String>,
        schedule: Schedule,
    ) -> Self {
        Self {
            account,
            caption: caption.into(),
            hashtags,
            media_urls,
            schedule,
            platform_variant: None,
            status: PostStatus::Draft,
            created_at: Utc::now(),
            published_at: None,
        }
    }

    /// Attach a platform-specific caption variant
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.platform_variant = Some(variant.into());
        self
    }
}
