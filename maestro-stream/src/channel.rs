//! The per-worker log broadcast channel.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use maestro_core::config::StreamConfig;
use maestro_core::error::StreamError;
use maestro_core::types::{LogEvent, WorkerKey};

use crate::observer::ObserverQueue;

/// Fan-out state: the replay ring plus every attached observer.
///
/// One lock covers both so that attach (seed replay, then register) is
/// atomic with respect to live broadcast; an observer never misses an
/// event between its replay and its live feed.
struct FanoutState {
    ring: VecDeque<LogEvent>,
    ring_capacity: usize,
    observers: HashMap<u64, Arc<ObserverQueue>>,
    next_id: u64,
}

impl FanoutState {
    fn broadcast(&mut self, event: LogEvent) {
        if self.ring.len() == self.ring_capacity {
            self.ring.pop_front();
        }
        self.ring.push_back(event.clone());
        for queue in self.observers.values() {
            queue.push(event.clone());
        }
    }
}

/// One worker's log streaming endpoint.
///
/// Binds an ephemeral localhost port at construction; the OS-chosen
/// port is exposed through [`url`](Self::url). The channel's lifetime
/// is owned by the orchestrator record, never by observers.
pub struct LogBroadcastChannel {
    key: WorkerKey,
    url: String,
    port: u16,
    state: Arc<Mutex<FanoutState>>,
    shutdown_tx: watch::Sender<bool>,
    closed: AtomicBool,
}

impl LogBroadcastChannel {
    /// Binds the listener and starts draining `feed_rx` into the ring
    /// and all observers.
    ///
    /// # Errors
    ///
    /// `StreamError::Bind` when the listener cannot bind.
    pub async fn bind(
        key: WorkerKey,
        feed_rx: mpsc::Receiver<LogEvent>,
        config: &StreamConfig,
    ) -> Result<Self, StreamError> {
        let listener = TcpListener::bind((config.bind_host.as_str(), 0))
            .await
            .map_err(|e| StreamError::Bind {
                reason: e.to_string(),
            })?;
        let port = listener
            .local_addr()
            .map_err(|e| StreamError::Bind {
                reason: e.to_string(),
            })?
            .port();
        let url = format!("ws://{}:{}", config.bind_host, port);

        let state = Arc::new(Mutex::new(FanoutState {
            ring: VecDeque::with_capacity(config.buffer_capacity.min(256)),
            ring_capacity: config.buffer_capacity,
            observers: HashMap::new(),
            next_id: 0,
        }));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(accept_loop(
            listener,
            Arc::clone(&state),
            key.clone(),
            config.max_observers,
            config.observer_queue_capacity,
            shutdown_rx.clone(),
        ));
        tokio::spawn(drain_loop(feed_rx, Arc::clone(&state), shutdown_rx));

        info!(target: "maestro::stream", worker = %key, %url, "log channel bound");
        Ok(Self {
            key,
            url,
            port,
            state,
            shutdown_tx,
            closed: AtomicBool::new(false),
        })
    }

    /// Identity of the worker this channel serves.
    #[must_use]
    pub fn key(&self) -> &WorkerKey {
        &self.key
    }

    /// The `ws://host:port` URL observers connect to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The OS-assigned listener port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of currently attached observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    /// Shuts the channel down: stops accepting, closes every observer
    /// with a "going away" frame, and releases the port. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown_tx.send_replace(true);
        info!(target: "maestro::stream", worker = %self.key, "log channel closed");
    }
}

impl Drop for LogBroadcastChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LogBroadcastChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBroadcastChannel")
            .field("key", &self.key)
            .field("url", &self.url)
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Moves worker feed events into the ring and every observer queue.
async fn drain_loop(
    mut feed_rx: mpsc::Receiver<LogEvent>,
    state: Arc<Mutex<FanoutState>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            maybe = feed_rx.recv() => match maybe {
                Some(event) => state.lock().broadcast(event),
                // Worker gone; the ring keeps serving replay until close.
                None => break,
            },
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    state: Arc<Mutex<FanoutState>>,
    key: WorkerKey,
    max_observers: usize,
    queue_capacity: usize,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let stream = tokio::select! {
            _ = shutdown_rx.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => stream,
                Err(e) => {
                    warn!(target: "maestro::stream", worker = %key, error = %e, "accept failed");
                    continue;
                }
            },
        };
        let ws = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                debug!(target: "maestro::stream", worker = %key, error = %e, "handshake failed");
                continue;
            }
        };

        // Seed the replay under the fan-out lock so no event broadcast
        // after this point can be missed by the new observer.
        let attached = {
            let mut st = state.lock();
            if st.observers.len() >= max_observers {
                None
            } else {
                let id = st.next_id;
                st.next_id += 1;
                let queue = Arc::new(ObserverQueue::new(queue_capacity));
                for event in &st.ring {
                    queue.push(event.clone());
                }
                st.observers.insert(id, Arc::clone(&queue));
                Some((id, queue))
            }
        };

        match attached {
            Some((id, queue)) => {
                debug!(target: "maestro::stream", worker = %key, observer = id, "observer attached");
                tokio::spawn(serve_observer(
                    ws,
                    queue,
                    Arc::clone(&state),
                    id,
                    shutdown_rx.clone(),
                ));
            }
            None => {
                warn!(target: "maestro::stream", worker = %key, max = max_observers, "observer refused");
                tokio::spawn(refuse_observer(ws, max_observers));
            }
        }
    }
}

/// Refuses a connection over the observer limit with an explicit close.
async fn refuse_observer(mut ws: WebSocketStream<TcpStream>, max: usize) {
    let frame = CloseFrame {
        code: CloseCode::Again,
        reason: format!("too many observers (max {max})").into(),
    };
    let _ = ws.send(Message::Close(Some(frame))).await;
    let _ = ws.close(None).await;
}

/// Pumps one observer's queue into its socket until the client leaves,
/// the socket errors, or the channel shuts down.
async fn serve_observer(
    ws: WebSocketStream<TcpStream>,
    queue: Arc<ObserverQueue>,
    state: Arc<Mutex<FanoutState>>,
    id: u64,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let (mut sink, mut source) = ws.split();
    let mut reader = tokio::spawn(async move {
        while let Some(msg) = source.next().await {
            if msg.is_err() {
                break;
            }
        }
    });

    'outer: loop {
        while let Some(event) = queue.pop() {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(_) => continue,
            };
            if sink.send(Message::Text(payload)).await.is_err() {
                break 'outer;
            }
        }
        tokio::select! {
            _ = shutdown_rx.changed() => {
                let frame = CloseFrame {
                    code: CloseCode::Away,
                    reason: "going away".into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                break;
            }
            _ = queue.wait() => {}
            _ = &mut reader => break,
        }
    }

    reader.abort();
    state.lock().observers.remove(&id);
    debug!(target: "maestro::stream", observer = id, "observer detached");
}
