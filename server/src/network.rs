//! Server network layer: WebSocket transport and the single-threaded main loop

use crate::config::ServerConfig;
use crate::picker::{RandomPicker, TaggerPicker};
use crate::registry::ConnectionRegistry;
use crate::router::{Outbound, Router};
use crate::session::Session;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode, encode, ClientMessage, Encoding, Frame, PlayerId, ServerMessage};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, Interval};
use tokio_tungstenite::tungstenite::Message;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Messages sent from socket tasks to the main loop
#[derive(Debug)]
pub enum ServerEvent {
    Opened {
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<Frame>,
        reply: oneshot::Sender<Option<PlayerId>>,
    },
    FrameReceived {
        id: PlayerId,
        frame: Frame,
    },
    Closed {
        id: PlayerId,
    },
}

/// Tag game server
///
/// Socket tasks only move frames; every roster mutation and broadcast happens
/// on the task running `run`, one event at a time.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    registry: ConnectionRegistry,
    router: Router,
    countdown: Option<Interval>,

    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, BoxError> {
        let picker: Box<dyn TaggerPicker> = match config.seed {
            Some(seed) => Box::new(RandomPicker::from_seed(seed)),
            None => Box::new(RandomPicker::new()),
        };
        Self::bind_with_picker(config, picker).await
    }

    pub async fn bind_with_picker(
        config: ServerConfig,
        picker: Box<dyn TaggerPicker>,
    ) -> Result<Self, BoxError> {
        config.validate()?;

        let listener = TcpListener::bind(&config.addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let session = Session::new(config.session.clone(), picker);

        Ok(Server {
            listener,
            registry: ConnectionRegistry::new(config.max_connections),
            router: Router::new(session),
            countdown: None,
            config,
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Main server loop
    pub async fn run(mut self) -> Result<(), BoxError> {
        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            tokio::spawn(handle_socket(stream, addr, self.event_tx.clone()));
                        }
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                },

                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event);
                },

                _ = next_countdown_tick(&mut self.countdown) => {
                    let outbound = self.router.handle_tick();
                    self.dispatch(outbound);
                },
            }
        }
    }

    fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Opened {
                addr,
                sender,
                reply,
            } => match self.registry.add(addr, sender.clone()) {
                Some(id) => {
                    if reply.send(Some(id)).is_err() {
                        // Socket task already gone; it will never report Closed.
                        self.registry.remove(&id);
                        return;
                    }
                    let outbound = self.router.handle_connect(id);
                    self.dispatch(outbound);
                }
                None => {
                    warn!("Rejecting connection from {}: server full", addr);
                    let refusal = ServerMessage::Disconnected {
                        reason: "Server full".to_string(),
                    };
                    match encode(&refusal, Encoding::Json) {
                        Ok(frame) => {
                            let _ = sender.send(frame);
                        }
                        Err(e) => error!("Failed to encode refusal: {}", e),
                    }
                    let _ = reply.send(None);
                }
            },

            ServerEvent::FrameReceived { id, frame } => {
                if !self.registry.contains(&id) {
                    return;
                }
                match decode::<ClientMessage>(&frame) {
                    Ok(message) => {
                        self.registry.set_encoding(&id, frame.encoding());
                        let outbound = self.router.handle_message(id, message);
                        self.dispatch(outbound);
                    }
                    Err(e) => debug!("Dropping undecodable frame from {}: {}", id, e),
                }
            }

            ServerEvent::Closed { id } => {
                if self.registry.remove(&id) {
                    let outbound = self.router.handle_disconnect(id);
                    self.dispatch(outbound);
                }
            }
        }
    }

    /// Delivers outbound messages in order, encoding once per wire format.
    fn dispatch(&mut self, outbound: Vec<Outbound>) {
        self.sync_countdown(&outbound);

        for Outbound { target, message } in outbound {
            let mut json = None;
            let mut binary = None;

            for connection in self.registry.iter().filter(|c| target.includes(c.id)) {
                let cached = match connection.encoding {
                    Encoding::Json => &mut json,
                    Encoding::Binary => &mut binary,
                };
                if cached.is_none() {
                    match encode(&message, connection.encoding) {
                        Ok(frame) => *cached = Some(frame),
                        Err(e) => {
                            error!("Failed to encode {:?}: {}", message, e);
                            continue;
                        }
                    }
                }
                if let Some(frame) = cached.as_ref() {
                    if connection.sender.send(frame.clone()).is_err() {
                        debug!("Connection {} is closing, frame dropped", connection.id);
                    }
                }
            }
        }
    }

    /// Arms a fresh countdown on game start and drops it on game end.
    fn sync_countdown(&mut self, outbound: &[Outbound]) {
        for Outbound { message, .. } in outbound {
            match message {
                ServerMessage::GameStarted { .. } => {
                    let period = self.config.tick_interval;
                    self.countdown = Some(interval_at(Instant::now() + period, period));
                }
                ServerMessage::GameEnded { .. } => {
                    self.countdown = None;
                }
                _ => {}
            }
        }
    }
}

async fn next_countdown_tick(countdown: &mut Option<Interval>) {
    match countdown {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(bytes) => Message::Binary(bytes),
    }
}

/// Runs one client socket: a writer task draining the outbound queue, and a
/// reader loop forwarding frames to the main loop until the socket closes.
async fn handle_socket(
    stream: TcpStream,
    addr: SocketAddr,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    let (mut sink, mut source) = ws.split();

    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Frame>();
    let (reply_tx, reply_rx) = oneshot::channel();
    let opened = ServerEvent::Opened {
        addr,
        sender: frame_tx,
        reply: reply_tx,
    };
    if events.send(opened).is_err() {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if let Err(e) = sink.send(into_message(frame)).await {
                debug!("Write to {} failed: {}", addr, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    let id = match reply_rx.await {
        Ok(Some(id)) => id,
        _ => {
            // Refused: the writer flushes the refusal and exits once the
            // main loop drops its sender.
            let _ = writer.await;
            return;
        }
    };

    while let Some(result) = source.next().await {
        let frame = match result {
            Ok(Message::Text(text)) => Frame::Text(text),
            Ok(Message::Binary(bytes)) => Frame::Binary(bytes),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("Read from {} failed: {}", addr, e);
                break;
            }
        };
        if events.send(ServerEvent::FrameReceived { id, frame }).is_err() {
            break;
        }
    }

    let _ = events.send(ServerEvent::Closed { id });
    let _ = writer.await;
}
