use std::io;
use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events;
use crate::presence::Aggregator;
use crate::protocol::SocketMessage;
use crate::source::WorkspaceEvent;

/// Streams the presence roster to a single connected client.
///
/// One task owns the listener, the connection slot and the event channel, so
/// all writes happen serially and events can never be reordered. While a
/// client is connected the accept source is not polled; further connection
/// attempts sit in the listen backlog until the slot frees up.
pub struct Server {
    listener: UnixListener,
    socket_path: PathBuf,
    aggregator: Aggregator,
    events: mpsc::Receiver<WorkspaceEvent>,
    shutdown: CancellationToken,
    peer: Option<UnixStream>,
}

impl Server {
    /// Bind the listener, replacing any stale socket file.
    /// A bind failure is fatal; the daemon has no degraded mode without
    /// its rendezvous point.
    pub fn bind(
        socket_path: PathBuf,
        aggregator: Aggregator,
        events: mpsc::Receiver<WorkspaceEvent>,
        shutdown: CancellationToken,
    ) -> io::Result<Self> {
        // Remove stale socket (in case a previous run didn't clean up)
        let _ = std::fs::remove_file(&socket_path);

        let listener = UnixListener::bind(&socket_path)?;
        tracing::info!("Listening on {}", socket_path.display());

        Ok(Self {
            listener,
            socket_path,
            aggregator,
            events,
            shutdown,
            peer: None,
        })
    }

    /// Serve until the shutdown token fires.
    pub async fn run(mut self) {
        let mut events_closed = false;
        let mut inbound = [0u8; 256];

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Shutting down");
                    break;
                }

                accepted = self.listener.accept(), if self.peer.is_none() => {
                    match accepted {
                        Ok((stream, _addr)) => self.attach_peer(stream).await,
                        Err(e) => tracing::error!("Accept error: {}", e),
                    }
                }

                event = self.events.recv(), if !events_closed => {
                    match event {
                        Some(event) => self.forward_event(event).await,
                        None => {
                            tracing::warn!("Workspace event feed closed");
                            events_closed = true;
                        }
                    }
                }

                read = read_peer(&mut self.peer, &mut inbound), if self.peer.is_some() => {
                    match read {
                        Ok(0) => {
                            tracing::info!("Client disconnected");
                            self.peer = None;
                        }
                        // The protocol is one-directional; inbound bytes carry
                        // no meaning and are discarded.
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!("Client read error: {}", e);
                            self.peer = None;
                        }
                    }
                }
            }
        }

        self.finish().await;
    }

    /// Greet a fresh client with the current canonical list. The connection
    /// is only installed in the slot if that first send succeeds.
    async fn attach_peer(&mut self, mut stream: UnixStream) {
        tracing::info!("Client connected");
        let list = SocketMessage::List(self.aggregator.snapshot());
        match stream.write_all(&list.encode_frame()).await {
            Ok(()) => self.peer = Some(stream),
            Err(e) => tracing::warn!("Failed to send initial list: {}", e),
        }
    }

    /// Adapt and deliver one workspace event. Events with no client, and
    /// events for non-regular processes, are dropped here.
    async fn forward_event(&mut self, event: WorkspaceEvent) {
        if self.peer.is_none() {
            tracing::debug!("No client connected, dropping {:?}", event.kind);
            return;
        }
        let event = match events::adapt(event, self.aggregator.icons()) {
            Some(event) => event,
            None => return,
        };
        let frame = SocketMessage::from(event).encode_frame();
        if let Some(stream) = self.peer.as_mut() {
            if let Err(e) = stream.write_all(&frame).await {
                tracing::warn!("Write failed, dropping client: {}", e);
                self.peer = None;
            }
        }
    }

    /// Close the peer, drop the listener and remove the socket file.
    async fn finish(mut self) {
        if let Some(mut stream) = self.peer.take() {
            let _ = stream.shutdown().await;
        }
        drop(self.listener);
        let _ = std::fs::remove_file(&self.socket_path);
        tracing::info!("Server stopped");
    }
}

/// Read from the connection slot; pends forever when the slot is empty so
/// the select arm stays quiet (the arm is also guarded on `peer.is_some()`).
async fn read_peer(peer: &mut Option<UnixStream>, buf: &mut [u8]) -> io::Result<usize> {
    match peer {
        Some(stream) => stream.read(buf).await,
        None => std::future::pending().await,
    }
}
