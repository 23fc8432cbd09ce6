//! Connection lifecycle.
//!
//! Each accepted WebSocket runs two tasks: an inbound loop that decodes
//! frames and hands them to the router, and an outbound loop that drains the
//! connection's bounded queue onto the socket. The connection registers
//! itself with the hub on startup and is the only thing that ever
//! unregisters itself.

use crate::handlers::AppState;
use crate::metrics::{self, ConnectionMetricsGuard};
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use huddle_core::{ConnectionHandle, ConnectionId, RouterError};
use huddle_protocol::{codec, ServerFrame, UserId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Drive one authenticated connection until it terminates.
pub async fn serve(socket: WebSocket, user: UserId, state: Arc<AppState>) {
    let _metrics_guard = ConnectionMetricsGuard::new();

    let (queue_tx, queue_rx) = mpsc::channel::<Bytes>(state.config.limits.send_queue_capacity);
    let handle = ConnectionHandle::new(queue_tx.clone());
    let connection_id = handle.id;

    let hub = state.router.hub().clone();
    hub.register(user, handle);

    debug!(user, connection = %connection_id, "WebSocket connected");

    let (sink, stream) = socket.split();
    let write_timeout = Duration::from_millis(state.config.heartbeat.write_timeout_ms);
    let mut writer = tokio::spawn(outbound_loop(sink, queue_rx, write_timeout, connection_id));

    // A dead outbound loop means a dead transport, so the halves race:
    // a write failure must not leave the connection registered until the
    // longer read window expires.
    let inbound = inbound_loop(stream, user, connection_id, &state, &queue_tx);
    tokio::pin!(inbound);
    tokio::select! {
        _ = &mut writer => {
            debug!(user, connection = %connection_id, "Outbound loop ended, terminating connection");
        }
        () = &mut inbound => {}
    }

    // Teardown: unregister first so fan-out stops targeting this connection,
    // then drop the queue and whatever is still buffered in it.
    hub.unregister(user, connection_id);
    writer.abort();

    debug!(user, connection = %connection_id, "WebSocket disconnected");
}

/// Drain the outbound queue onto the socket in FIFO order.
///
/// A write error or a write exceeding the (short) write deadline ends the
/// loop; the task ending is what [`serve`] treats as a fatal transport
/// failure for the whole connection.
async fn outbound_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut queue: mpsc::Receiver<Bytes>,
    write_timeout: Duration,
    connection_id: ConnectionId,
) {
    while let Some(frame) = queue.recv().await {
        let Ok(text) = String::from_utf8(frame.to_vec()) else {
            continue;
        };
        match tokio::time::timeout(write_timeout, sink.send(Message::Text(text))).await {
            Ok(Ok(())) => metrics::record_message("outbound"),
            Ok(Err(e)) => {
                debug!(connection = %connection_id, error = %e, "Write failed");
                break;
            }
            Err(_) => {
                warn!(connection = %connection_id, "Write deadline exceeded, peer stalled");
                metrics::record_error("write_timeout");
                break;
            }
        }
    }
    // The peer may be the reason we are exiting; do not wait on it to
    // acknowledge the close either.
    let _ = tokio::time::timeout(write_timeout, sink.close()).await;
}

/// Read frames until the connection dies.
///
/// The read deadline restarts on any inbound traffic, pings and pongs
/// included; silence for the full window terminates the connection.
async fn inbound_loop(
    mut stream: SplitStream<WebSocket>,
    user: UserId,
    connection_id: ConnectionId,
    state: &Arc<AppState>,
    queue: &mpsc::Sender<Bytes>,
) {
    let read_timeout = Duration::from_millis(state.config.heartbeat.read_timeout_ms);

    loop {
        let msg = match tokio::time::timeout(read_timeout, stream.next()).await {
            Err(_) => {
                debug!(user, connection = %connection_id, "Idle timeout");
                metrics::record_error("idle_timeout");
                return;
            }
            Ok(None) => {
                debug!(user, connection = %connection_id, "WebSocket stream ended");
                return;
            }
            Ok(Some(Err(e))) => {
                warn!(user, connection = %connection_id, error = %e, "WebSocket error");
                metrics::record_error("websocket");
                return;
            }
            Ok(Some(Ok(msg))) => msg,
        };

        match msg {
            Message::Text(text) => {
                if !handle_payload(text.as_bytes(), user, connection_id, state, queue).await {
                    return;
                }
            }
            Message::Binary(data) => {
                if !handle_payload(&data, user, connection_id, state, queue).await {
                    return;
                }
            }
            // Liveness only; the underlying stream answers pings itself.
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => {
                debug!(user, connection = %connection_id, "Received close frame");
                return;
            }
        }
    }
}

/// Decode and route one payload. Returns `false` when the violation is
/// connection-fatal.
async fn handle_payload(
    data: &[u8],
    user: UserId,
    connection_id: ConnectionId,
    state: &Arc<AppState>,
    queue: &mpsc::Sender<Bytes>,
) -> bool {
    metrics::record_message("inbound");

    if data.len() > state.config.limits.max_frame_size {
        warn!(
            user,
            connection = %connection_id,
            size = data.len(),
            "Oversized frame, terminating connection"
        );
        metrics::record_error("oversize");
        return false;
    }

    let frame = match codec::decode(data) {
        Ok(frame) => frame,
        Err(e) if e.is_fatal() => {
            metrics::record_error("oversize");
            return false;
        }
        Err(e) => {
            debug!(user, connection = %connection_id, error = %e, "Undecodable frame");
            send_local_error(queue, "invalid message");
            return true;
        }
    };

    if let Err(e) = state.router.handle(user, frame).await {
        metrics::record_error(error_kind(&e));
        // One rejected frame does not kill the connection.
        send_local_error(queue, &e.to_string());
    }

    true
}

/// Queue a local `error` frame for this connection only.
///
/// Like every enqueue, this is non-blocking: a saturated queue drops the
/// error frame rather than stalling the inbound loop.
fn send_local_error(queue: &mpsc::Sender<Bytes>, message: &str) {
    let frame = ServerFrame::error(message);
    match codec::encode(&frame) {
        Ok(data) => {
            if queue.try_send(data).is_err() {
                metrics::record_dropped(1);
            }
        }
        Err(e) => warn!(error = %e, "Failed to encode error frame"),
    }
}

fn error_kind(err: &RouterError) -> &'static str {
    match err {
        RouterError::TextRequired
        | RouterError::TargetUserRequired
        | RouterError::GroupRequired
        | RouterError::Unsupported => "protocol",
        RouterError::DmNotAllowed | RouterError::NotGroupMember => "authorization",
        RouterError::DmPersistFailed(_) | RouterError::GroupPersistFailed(_) => "persistence",
        RouterError::Internal(_) => "internal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(error_kind(&RouterError::TextRequired), "protocol");
        assert_eq!(error_kind(&RouterError::DmNotAllowed), "authorization");
        assert_eq!(
            error_kind(&RouterError::DmPersistFailed(
                huddle_core::StoreError::WriteFailed("x".into())
            )),
            "persistence"
        );
    }

    #[test]
    fn test_send_local_error_drop_on_full() {
        let (tx, mut rx) = mpsc::channel::<Bytes>(1);
        send_local_error(&tx, "text required");
        // Queue is full now; the second error is dropped silently.
        send_local_error(&tx, "text required");

        let frame: ServerFrame = serde_json::from_slice(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(frame, ServerFrame::error("text required"));
        assert!(rx.try_recv().is_err());
    }
}
