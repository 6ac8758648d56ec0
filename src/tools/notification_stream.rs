//! `start-notification-stream`: emits a bounded, paced sequence of log
//! notifications to the caller, then returns a completion result.
//!
//! Individual send failures are logged and skipped; they never abort the
//! job. The job stops early, without a completion result, when its
//! cancellation token fires.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::error::ToolError;
use crate::core::notify::{LogMessage, NotificationSink};
use crate::core::server::{CallToolResult, MCPTool, Registry, ToolContext};

pub const NAME: &str = "start-notification-stream";

/// Tick count used when the caller asks for `count = 0`.
///
/// Zero is a sentinel inherited from existing clients, where it meant "keep
/// going". It is capped here rather than left unbounded; new clients should
/// pass an explicit count.
pub const UNBOUNDED_COUNT: u64 = 100;

const DEFAULT_INTERVAL_MS: i64 = 100;
const DEFAULT_COUNT: i64 = 10;

fn default_interval() -> i64 {
    DEFAULT_INTERVAL_MS
}

fn default_count() -> i64 {
    DEFAULT_COUNT
}

#[derive(Deserialize, Debug)]
pub struct StreamParams {
    /// Milliseconds between notifications
    #[serde(default = "default_interval")]
    pub interval: i64,
    /// Number of notifications; 0 means [`UNBOUNDED_COUNT`]
    #[serde(default = "default_count")]
    pub count: i64,
}

/// State of one running stream. Owned exclusively by the task running it.
#[derive(Debug)]
pub struct NotificationJob {
    interval_ms: u64,
    target_count: u64,
    emitted: u64,
    started_at: DateTime<Utc>,
}

impl NotificationJob {
    /// Validate the request and build a job.
    ///
    /// Negative values are rejected here, before any notification is sent.
    pub fn new(interval_ms: i64, count: i64) -> Result<Self, ToolError> {
        let interval_ms = u64::try_from(interval_ms).map_err(|_| {
            ToolError::InvalidArgument(format!("interval must be >= 0, got {interval_ms}"))
        })?;
        let count = u64::try_from(count)
            .map_err(|_| ToolError::InvalidArgument(format!("count must be >= 0, got {count}")))?;

        Ok(Self {
            interval_ms,
            target_count: if count == 0 { UNBOUNDED_COUNT } else { count },
            emitted: 0,
            started_at: Utc::now(),
        })
    }

    pub fn target_count(&self) -> u64 {
        self.target_count
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Run every tick, suspending between ticks but not after the last one.
    pub async fn run(
        mut self,
        sink: &dyn NotificationSink,
        cancel: &CancellationToken,
    ) -> Result<CallToolResult, ToolError> {
        let interval = Duration::from_millis(self.interval_ms);
        debug!(
            interval_ms = self.interval_ms,
            target = self.target_count,
            "notification stream started"
        );

        while self.emitted < self.target_count {
            if cancel.is_cancelled() {
                return Err(self.cancelled());
            }

            self.emitted += 1;
            if let Err(e) = sink.send(LogMessage::periodic(self.emitted)) {
                warn!(sequence = self.emitted, error = %e, "error sending notification");
            }

            if self.emitted < self.target_count {
                if interval.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::select! {
                        () = cancel.cancelled() => return Err(self.cancelled()),
                        () = tokio::time::sleep(interval) => {}
                    }
                }
            }
        }

        debug!(
            emitted = self.emitted,
            elapsed_ms = (Utc::now() - self.started_at).num_milliseconds(),
            "notification stream finished"
        );
        Ok(CallToolResult::text(format!(
            "Started sending periodic notifications every {}ms",
            self.interval_ms
        )))
    }

    fn cancelled(&self) -> ToolError {
        debug!(emitted = self.emitted, target = self.target_count, "notification stream cancelled");
        ToolError::Cancelled
    }
}

async fn call(params: StreamParams, ctx: ToolContext) -> Result<CallToolResult, ToolError> {
    let job = NotificationJob::new(params.interval, params.count)?;
    job.run(ctx.notifier.as_ref(), &ctx.cancel).await
}

pub fn register(registry: &mut Registry) {
    let tool = MCPTool {
        name: NAME.to_string(),
        description: "Starts sending periodic notifications for testing resumability".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "interval": {
                    "type": "integer",
                    "minimum": 0,
                    "default": DEFAULT_INTERVAL_MS,
                    "description": "Interval in milliseconds between notifications"
                },
                "count": {
                    "type": "integer",
                    "minimum": 0,
                    "default": DEFAULT_COUNT,
                    "description": "Number of notifications to send (0 for 100)"
                }
            }
        }),
    };
    registry.register_tool(tool, call);
}
