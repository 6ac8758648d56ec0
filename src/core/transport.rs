//! MCP Transports
//!
//! Both transports decode JSON-RPC requests, hand them to the shared
//! [`Dispatcher`] and write back responses plus any notifications a tool
//! emits while it runs.
//!
//! - HTTP (Actix Web): one request per POST. Tool calls answer with a
//!   `text/event-stream` body carrying each notification followed by the
//!   final response; every other method answers with plain JSON.
//! - STDIO: line-delimited JSON-RPC. Each request runs in its own task so a
//!   long notification stream never blocks other requests; a single writer
//!   task owns stdout.

use actix_web::{
    App, HttpResponse, HttpServer, Result,
    http::header,
    middleware::{Compress, DefaultHeaders, Logger},
    web,
};
use bytes::Bytes;
use futures_util::stream::{self, Stream};
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::config::ServerConfig;
use crate::core::error::RpcError;
use crate::core::notify::ChannelSink;
use crate::core::server::{Dispatcher, MCPRequest, MCPResponse, Outbound, ToolContext};

type InFlight = Mutex<HashMap<String, CancellationToken>>;

/// Health check endpoint handler.
async fn health(dispatcher: web::Data<Dispatcher>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": dispatcher.state().server_name
    })))
}

/// Returns the total number of MCP requests processed since server start.
async fn metrics_handler(counter: web::Data<AtomicU64>) -> Result<HttpResponse> {
    let count = counter.load(Ordering::Relaxed);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "requests_total": count,
        "status": "ok"
    })))
}

/// Server-Sent Events endpoint for tools discovery.
///
/// Emits a single event with every registered tool and the tool count.
async fn sse_tools_discovery(dispatcher: web::Data<Dispatcher>) -> Result<HttpResponse> {
    let tools = &dispatcher.registry().tools;
    let tools_data = serde_json::json!({
        "tools": tools,
        "count": tools.len()
    });

    let sse_data = format!(
        "data: {}\n\n",
        serde_json::to_string(&tools_data).unwrap_or_else(|_| "{}".to_string())
    );

    Ok(event_stream_response().body(sse_data))
}

fn event_stream_response() -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::Ok();
    builder
        .content_type("text/event-stream")
        .insert_header(header::CacheControl(vec![
            header::CacheDirective::NoCache,
            header::CacheDirective::NoStore,
            header::CacheDirective::MustRevalidate,
        ]))
        // Disable nginx buffering for real-time streaming
        .insert_header(("x-accel-buffering", "no"));
    builder
}

/// MCP JSON-RPC request handler.
///
/// Bodies that do not decode as a request get `400 Bad Request` carrying a
/// JSON-RPC error. Notifications get `202 Accepted` with no body. `tools/call`
/// streams the tool's notifications and final response as SSE events; the job
/// is cancelled if the client drops the stream. Everything else is plain JSON.
async fn mcp_handler(
    dispatcher: web::Data<Dispatcher>,
    counter: web::Data<AtomicU64>,
    body: Bytes,
) -> Result<HttpResponse> {
    counter.fetch_add(1, Ordering::Relaxed);
    let request = match serde_json::from_slice::<MCPRequest>(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "rejecting malformed HTTP request");
            let response = malformed_request_response(&body, &e).unwrap_or_else(|| {
                MCPResponse::failure(None, RpcError::InvalidRequest(e.to_string()))
            });
            return Ok(HttpResponse::BadRequest().json(response));
        }
    };

    if request.id.is_none() {
        debug!(method = %request.method, "accepted notification");
        return Ok(HttpResponse::Accepted().finish());
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let ctx = ToolContext::new(Arc::new(ChannelSink::new(tx.clone())), cancel.clone());

    if request.method != "tools/call" {
        return Ok(match dispatcher.handle(request, ctx).await {
            Some(response) => HttpResponse::Ok().json(response),
            None => HttpResponse::Accepted().finish(),
        });
    }

    let task_dispatcher = dispatcher.clone();
    actix_rt::spawn(async move {
        if let Some(response) = task_dispatcher.handle(request, ctx).await {
            if tx.send(Outbound::Response(response)).is_err() {
                debug!("client disconnected before tool response");
            }
        }
    });

    Ok(event_stream_response().streaming(sse_events(rx, cancel)))
}

/// Turn outbound messages into SSE `data:` events. Dropping the stream
/// cancels the producing job.
fn sse_events(
    rx: mpsc::UnboundedReceiver<Outbound>,
    cancel: CancellationToken,
) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> {
    let guard = cancel.drop_guard();
    stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let message = rx.recv().await?;
        let event = match serde_json::to_string(&message) {
            Ok(json) => Bytes::from(format!("data: {json}\n\n")),
            Err(e) => {
                warn!(error = %e, "failed to serialize SSE event");
                Bytes::new()
            }
        };
        Some((Ok(event), (rx, guard)))
    })
}

/// Register all HTTP routes. App data must provide `web::Data<Dispatcher>`
/// and `web::Data<AtomicU64>`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics_handler))
        .route("/sse", web::get().to(sse_tools_discovery))
        .route("/mcp", web::post().to(mcp_handler))
        .route("/", web::post().to(mcp_handler))
        .route("/", web::get().to(health));
}

/// Run the MCP server in HTTP mode.
///
/// The server is configured with:
/// - Worker threads: from configuration (CPU count capped at 16 by default)
/// - Max connections: 10,000 concurrent connections
/// - Connection rate limit: 1,000 connections per second
/// - Keep-alive and request timeout: 30 seconds
/// - Shutdown timeout: 10 seconds
pub async fn run_server_http(dispatcher: Arc<Dispatcher>, config: &ServerConfig) -> io::Result<()> {
    let bind_addr = config.bind_addr();
    let dispatcher = web::Data::from(dispatcher);
    let request_count = web::Data::new(AtomicU64::new(0));

    info!(
        name = %config.name,
        version = %config.version,
        bind = %bind_addr,
        workers = config.workers,
        "MCP server starting (HTTP mode)"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(dispatcher.clone())
            .app_data(request_count.clone())
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            // %r = request line, %s = status, %Dms = duration in milliseconds
            .wrap(Logger::new("%r %s %Dms"))
            .configure(configure_routes)
    })
    .workers(config.workers)
    .max_connections(10000)
    .max_connection_rate(1000)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .client_disconnect_timeout(Duration::from_secs(2))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run()
    .await
}

/// Run the MCP server in STDIO mode.
///
/// Reads JSON-RPC requests line by line from stdin and writes responses and
/// notifications to stdout. All logging goes to stderr.
pub async fn run_server_stdio(dispatcher: Arc<Dispatcher>) -> io::Result<()> {
    info!(
        name = %dispatcher.state().server_name,
        version = %dispatcher.state().server_version,
        "MCP server starting (STDIO mode)"
    );

    let stdin = BufReader::with_capacity(8192, tokio::io::stdin());
    let stdout = BufWriter::with_capacity(8192, tokio::io::stdout());
    serve_lines(dispatcher, stdin, stdout).await?;
    Ok(())
}

/// Serve line-delimited JSON-RPC from `reader`, writing to `writer`.
///
/// Returns the writer once the input is exhausted and every in-flight request
/// has finished.
pub async fn serve_lines<R, W>(dispatcher: Arc<Dispatcher>, reader: R, writer: W) -> io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_outbound(rx, writer));
    let in_flight: Arc<InFlight> = Arc::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<MCPRequest>(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "rejecting malformed request");
                if let Some(response) = malformed_request_response(line.as_bytes(), &e) {
                    let _ = tx.send(Outbound::Response(response));
                }
                continue;
            }
        };

        let Some(id) = request.id.as_ref() else {
            handle_client_notification(&request, &in_flight).await;
            continue;
        };

        let key = id.to_string();
        let cancel = CancellationToken::new();
        {
            let mut table = in_flight.lock().await;
            if table.contains_key(&key) {
                warn!(id = %key, "rejecting request that reuses an in-flight id");
                let _ = tx.send(Outbound::Response(MCPResponse::failure(
                    Some(id.clone()),
                    RpcError::InvalidRequest(format!("request id {key} is already in flight")),
                )));
                continue;
            }
            table.insert(key.clone(), cancel.clone());
        }

        let dispatcher = Arc::clone(&dispatcher);
        let in_flight = Arc::clone(&in_flight);
        let tx = tx.clone();
        tokio::spawn(async move {
            let ctx = ToolContext::new(Arc::new(ChannelSink::new(tx.clone())), cancel);
            let response = dispatcher.handle(request, ctx).await;
            in_flight.lock().await.remove(&key);
            if let Some(response) = response {
                if tx.send(Outbound::Response(response)).is_err() {
                    debug!("output closed before response could be written");
                }
            }
        });
    }

    debug!("input closed, waiting for in-flight requests");
    drop(tx);
    writer_task.await.map_err(io::Error::other)?
}

/// Single writer: one JSON message per line, flushed after each.
async fn write_outbound<W>(mut rx: mpsc::UnboundedReceiver<Outbound>, mut writer: W) -> io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "error serializing outbound message");
                continue;
            }
        };
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(writer)
}

/// Error response for a message that did not decode as a request.
///
/// Invalid JSON gets a parse error with a null id. Valid JSON that is not a
/// request is only answered when it carries an id.
fn malformed_request_response(raw: &[u8], err: &serde_json::Error) -> Option<MCPResponse> {
    match serde_json::from_slice::<Value>(raw) {
        Err(_) => Some(MCPResponse::failure(
            None,
            RpcError::ParseError(err.to_string()),
        )),
        Ok(partial) => partial.get("id").cloned().map(|id| {
            MCPResponse::failure(Some(id), RpcError::InvalidRequest(err.to_string()))
        }),
    }
}

async fn handle_client_notification(request: &MCPRequest, in_flight: &InFlight) {
    match request.method.as_str() {
        "notifications/initialized" => debug!("client finished initialization"),
        "notifications/cancelled" => {
            let Some(request_id) = request.params.as_ref().and_then(|p| p.get("requestId")) else {
                warn!("cancellation notification without requestId");
                return;
            };
            match in_flight.lock().await.get(&request_id.to_string()) {
                Some(token) => {
                    debug!(request_id = %request_id, "cancelling request");
                    token.cancel();
                }
                None => debug!(request_id = %request_id, "cancellation for unknown request"),
            }
        }
        other => debug!(method = %other, "ignoring notification"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notify::LogMessage;
    use futures_util::StreamExt;

    #[test]
    fn invalid_json_yields_parse_error_with_null_id() {
        let line = "{not json";
        let err = serde_json::from_str::<MCPRequest>(line).unwrap_err();
        let response = malformed_request_response(line.as_bytes(), &err).unwrap();
        assert_eq!(response.id, None);
        assert_eq!(response.error.unwrap().code, -32700);
    }

    #[test]
    fn non_request_with_id_yields_invalid_request() {
        let line = r#"{"jsonrpc":"2.0","id":4}"#;
        let err = serde_json::from_str::<MCPRequest>(line).unwrap_err();
        let response = malformed_request_response(line.as_bytes(), &err).unwrap();
        assert_eq!(response.id, Some(serde_json::json!(4)));
        assert_eq!(response.error.unwrap().code, -32600);
    }

    #[test]
    fn non_request_without_id_is_dropped() {
        let line = r#"{"jsonrpc":"2.0"}"#;
        let err = serde_json::from_str::<MCPRequest>(line).unwrap_err();
        assert!(malformed_request_response(line.as_bytes(), &err).is_none());
    }

    #[tokio::test]
    async fn dropping_the_event_stream_cancels_the_job() {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let mut events = Box::pin(sse_events(rx, cancel.clone()));

        tx.send(Outbound::Notification(LogMessage::periodic(1).into_notification()))
            .unwrap();
        let first = events.next().await.unwrap().unwrap();
        let text = std::str::from_utf8(&first).unwrap();
        assert!(text.starts_with("data: {"), "{text}");
        assert!(text.ends_with("\n\n"), "{text}");
        assert!(!cancel.is_cancelled());

        drop(events);

        assert!(cancel.is_cancelled());
        assert!(tx.send(Outbound::Notification(LogMessage::periodic(2).into_notification())).is_err());
    }
}
