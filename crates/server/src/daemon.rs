//! Front/daemon lifecycle and the per-connection accept loop.
//!
//! Grounded on the reference `embed_server.py`'s `start_daemon` (bind the
//! front listener first to detect an already-running daemon, fork the
//! hidden daemon subprocess, race `init_complete_event`/`init_error_event`)
//! and `BaseEmbedServer.handle_client` (per-connection dispatch, streaming
//! replies, in-order responses).

use crate::rpc::dispatcher::{DispatchOutcome, Dispatcher};
use crate::rpc::{FrameReader, FrameWriter, ProgressFrame, RpcReply, RpcRequest};
use serde_json::Value;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify};
use twilog_common::{AppConfig, Result};

/// Offset from the RPC port the front process listens on for the daemon's
/// reverse `progress`/`init_completed`/`init_error` notifications.
const NOTIFY_PORT_OFFSET: u16 = 1;

fn notify_addr(config: &AppConfig) -> String {
    format!("{}:{}", config.server.host, config.server.port + NOTIFY_PORT_OFFSET)
}

fn rpc_addr(config: &AppConfig) -> String {
    format!("{}:{}", config.server.host, config.server.port)
}

/// Runs in the front process: launches the hidden daemon subprocess and
/// blocks until it reports readiness (or failure) over the reverse channel.
pub async fn start(model: &str, config: &AppConfig) -> anyhow::Result<()> {
    let listener = match TcpListener::bind(notify_addr(config)).await {
        Ok(listener) => listener,
        Err(_) => {
            anyhow::bail!("a daemon already appears to be running on {}", notify_addr(config));
        }
    };

    let exe = std::env::current_exe()?;
    let mut child = std::process::Command::new(exe)
        .args(["daemon", "--model", model])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let (stream, _) = listener.accept().await?;
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);

    loop {
        let line = match reader.recv_line().await? {
            Some(line) => line,
            None => anyhow::bail!("daemon closed the notification channel before signalling readiness"),
        };
        let frame: ProgressFrame = serde_json::from_str(&line)?;
        match frame {
            ProgressFrame::Progress { message } => {
                tracing::info!(message, "daemon progress");
            }
            ProgressFrame::InitCompleted => {
                writer.send(&ProgressFrame::Ack).await?;
                tracing::info!(pid = child.id(), "daemon ready");
                return Ok(());
            }
            ProgressFrame::InitError { error } => {
                anyhow::bail!("daemon failed to initialise: {error}");
            }
            ProgressFrame::Ack => {}
        }
    }
}

/// Runs in the front process: connects to a running daemon's RPC port and
/// sends `stop_server`.
pub async fn stop(config: &AppConfig) -> anyhow::Result<()> {
    let stream = TcpStream::connect(rpc_addr(config)).await?;
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);

    writer
        .send(&RpcRequest {
            jsonrpc: Some("2.0".to_string()),
            id: Value::from(1),
            method: "stop_server".to_string(),
            params: Value::Null,
        })
        .await?;
    reader.recv_line().await?;
    Ok(())
}

/// Runs in the front process: queries `get_status` on a running daemon.
pub async fn status(config: &AppConfig) -> anyhow::Result<Value> {
    let stream = TcpStream::connect(rpc_addr(config)).await?;
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let mut writer = FrameWriter::new(write_half);

    writer
        .send(&RpcRequest {
            jsonrpc: Some("2.0".to_string()),
            id: Value::from(1),
            method: "get_status".to_string(),
            params: Value::Null,
        })
        .await?;
    let line = reader.recv_line().await?.ok_or_else(|| anyhow::anyhow!("daemon closed connection without replying"))?;
    Ok(serde_json::from_str(&line)?)
}

/// Runs as the hidden `daemon` subprocess: loads the stores, reports
/// readiness back to the front listener, then serves RPC connections until
/// a client calls `stop_server`.
pub async fn run_daemon(dispatcher: Arc<Dispatcher>, ready: Arc<AtomicBool>, config: &AppConfig) -> anyhow::Result<()> {
    let rpc_listener = TcpListener::bind(rpc_addr(config)).await?;

    match TcpStream::connect(notify_addr(config)).await {
        Ok(stream) => {
            let (read_half, write_half) = stream.into_split();
            let mut reader = FrameReader::new(read_half);
            let mut writer = FrameWriter::new(write_half);
            writer.send(&ProgressFrame::InitCompleted).await?;
            reader.recv_line().await?;
        }
        Err(e) => {
            tracing::warn!(error = %e, "no front listener to notify; continuing standalone");
        }
    }
    ready.store(true, Ordering::Release);

    loop {
        let (stream, peer) = rpc_listener.accept().await?;
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, dispatcher).await {
                tracing::warn!(peer = %peer, error = %e, "connection ended with error");
            }
        });
    }
}

/// One task per connection. Requests are dispatched concurrently but a
/// sequence gate makes sure replies land on the wire in the order the
/// requests arrived, even though `dispatch` may suspend at different points
/// for different requests (e.g. embedder round-trips).
async fn handle_connection(stream: TcpStream, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let writer = Arc::new(Mutex::new(FrameWriter::new(write_half)));
    let next_seq = Arc::new(AtomicU64::new(0));
    let next_to_write = Arc::new(AtomicU64::new(0));
    let gate = Arc::new(Notify::new());

    loop {
        let line = match reader.recv_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(e) => return Err(twilog_common::AppError::Io(e)),
        };

        let seq = next_seq.fetch_add(1, Ordering::AcqRel);
        let dispatcher = dispatcher.clone();
        let writer = writer.clone();
        let next_to_write = next_to_write.clone();
        let gate = gate.clone();

        let should_stop = tokio::spawn(async move {
            let (id, outcome) = dispatch_line(&dispatcher, &line).await;

            while next_to_write.load(Ordering::Acquire) != seq {
                gate.notified().await;
            }

            let mut stop = false;
            {
                let mut w = writer.lock().await;
                match outcome {
                    Ok(DispatchOutcome::Single(value)) => {
                        let _ = w.send(&RpcReply::ok(id, value)).await;
                    }
                    Ok(DispatchOutcome::Stop(value)) => {
                        let _ = w.send(&RpcReply::ok(id, value)).await;
                        stop = true;
                    }
                    Ok(DispatchOutcome::Stream(chunks)) => {
                        let last = chunks.len().saturating_sub(1);
                        for (i, chunk) in chunks.into_iter().enumerate() {
                            let _ = w.send(&RpcReply::ok_chunk(id.clone(), chunk, i < last)).await;
                        }
                    }
                    Err(err) => {
                        let _ = w.send(&RpcReply::err(id, err.to_rpc_error())).await;
                    }
                }
            }

            next_to_write.store(seq + 1, Ordering::Release);
            gate.notify_waiters();
            stop
        })
        .await
        .unwrap_or(false);

        if should_stop {
            return Ok(());
        }
    }
}

async fn dispatch_line(dispatcher: &Dispatcher, line: &str) -> (Value, Result<DispatchOutcome>) {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return (Value::Null, Err(twilog_common::AppError::InvalidRequest { message: e.to_string() })),
    };

    if request.jsonrpc.as_deref() != Some("2.0") {
        return (
            request.id,
            Err(twilog_common::AppError::InvalidRequest {
                message: "jsonrpc must be \"2.0\"".to_string(),
            }),
        );
    }

    let outcome = dispatcher.dispatch(&request.method, request.params).await;
    (request.id, outcome)
}
