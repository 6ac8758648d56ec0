//! Out-of-band notification delivery.
//!
//! Tool handlers that report progress while they run receive a
//! [`NotificationSink`] through their [`ToolContext`](crate::core::server::ToolContext).
//! Transports provide a [`ChannelSink`] that forwards messages to the client
//! connection; tests substitute their own sinks.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::error::SendError;
use crate::core::server::{MCPNotification, Outbound};

/// Severity tag carried by `notifications/message`.
///
/// Only `Info` is emitted today; the other variants are the syslog levels
/// MCP clients filter on, kept so the wire enum is complete.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

/// A single log notification. Ownership moves into the sink on send.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    /// 1-based position of this message within its job
    pub sequence: u64,
    pub level: LogLevel,
    pub text: String,
    pub emitted_at: DateTime<Utc>,
}

impl LogMessage {
    /// Build the periodic message for tick `sequence`, stamped now.
    pub fn periodic(sequence: u64) -> Self {
        let emitted_at = Utc::now();
        Self {
            sequence,
            level: LogLevel::Info,
            text: format!(
                "Periodic notification #{} at {}",
                sequence,
                emitted_at.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            emitted_at,
        }
    }

    /// Wire form: a JSON-RPC `notifications/message` notification.
    pub fn into_notification(self) -> MCPNotification {
        MCPNotification::new(
            "notifications/message",
            serde_json::json!({
                "level": self.level,
                "data": self.text,
            }),
        )
    }
}

/// Capability for delivering notifications to the client during a call.
pub trait NotificationSink: Send + Sync {
    fn send(&self, message: LogMessage) -> Result<(), SendError>;
}

/// Shared handle to a notification sink.
pub type Notifier = Arc<dyn NotificationSink>;

/// Sink that forwards notifications into a transport's outbound channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for ChannelSink {
    fn send(&self, message: LogMessage) -> Result<(), SendError> {
        self.tx
            .send(Outbound::Notification(message.into_notification()))
            .map_err(|_| SendError::Closed)
    }
}
