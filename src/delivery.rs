//! Alert delivery channels
//!
//! Transports sit behind [`AlertChannel`]. A failed send is reported to the
//! pipeline as `false` for that channel and never stops the run.

use chrono::{DateTime, Utc};
use inventory_anomaly::AlertRecord;
use serde::Serialize;
use std::fmt::Debug;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Failure to hand an alert to its transport
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The transport rejected or could not reach its destination
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Which delivery group a channel belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Chat webhooks, sent when alerts are enabled
    Webhook,
    /// Sent only when email delivery is requested
    Email,
}

/// A rendered alert ready to send
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertMessage {
    pub title: String,
    pub body: String,
    pub product_id: Option<String>,
    pub records: Vec<AlertRecord>,
    pub created_at: DateTime<Utc>,
}

/// A destination for alerts
pub trait AlertChannel: Debug + Send + Sync {
    /// Name used as the key of the per-channel delivery result
    fn name(&self) -> &str;

    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    fn send(&self, message: &AlertMessage) -> Result<(), DeliveryError>;
}

/// Writes alerts to the log
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: String,
}

impl LogChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new("log")
    }
}

impl AlertChannel for LogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, message: &AlertMessage) -> Result<(), DeliveryError> {
        warn!(
            channel = %self.name,
            title = %message.title,
            records = message.records.len(),
            "{}",
            message.body
        );
        Ok(())
    }
}

/// Appends alerts as JSON lines to a file picked up by an external sender
#[derive(Debug, Clone)]
pub struct OutboxChannel {
    name: String,
    kind: ChannelKind,
    path: PathBuf,
}

impl OutboxChannel {
    pub fn new(name: impl Into<String>, kind: ChannelKind, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertChannel for OutboxChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn send(&self, message: &AlertMessage) -> Result<(), DeliveryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let line = serde_json::to_string(message)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        info!(channel = %self.name, path = %self.path.display(), "Queued alert");
        Ok(())
    }
}
