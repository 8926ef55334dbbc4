//! Error types for Slotcast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SlotcastError>;

#[derive(Error, Debug)]
pub enum SlotcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Publishing failed: {0}")]
    Publish(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("post_id '{id}' already exists")]
    Duplicate { id: String },

    #[error("post_id '{id}' not found")]
    NotFound { id: String },

    #[error("Database operation failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode stored post: {0}")]
    Decode(String),

    #[error("Failed to encode post field: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("scheduled instant '{0}' carries no UTC offset")]
    MissingOffset(String),

    #[error("could not parse scheduled instant '{0}'")]
    Unparseable(String),
}
