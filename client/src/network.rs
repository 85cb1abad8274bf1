use crate::mirror::NetworkMirror;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode, encode, ClientMessage, Encoding, Frame, ServerMessage};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live connection to the tag server, feeding a [`NetworkMirror`]
pub struct Client {
    mirror: NetworkMirror,
    source: SplitStream<WsStream>,
    writer: JoinHandle<()>,
}

impl Client {
    /// Connects and starts the writer task; intents go out in `encoding`.
    pub async fn connect(url: &str, encoding: Encoding) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Connecting to {}...", url);
        let (ws, _) = connect_async(url).await?;
        let (mut sink, source) = ws.split();

        let (intent_tx, mut intent_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let writer = tokio::spawn(async move {
            while let Some(intent) = intent_rx.recv().await {
                let frame = match encode(&intent, encoding) {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!("Failed to encode {:?}: {}", intent, e);
                        continue;
                    }
                };
                let message = match frame {
                    Frame::Text(text) => Message::Text(text),
                    Frame::Binary(bytes) => Message::Binary(bytes),
                };
                if let Err(e) = sink.send(message).await {
                    warn!("Error sending intent: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        Ok(Client {
            mirror: NetworkMirror::new(intent_tx),
            source,
            writer,
        })
    }

    pub fn mirror(&self) -> &NetworkMirror {
        &self.mirror
    }

    pub fn mirror_mut(&mut self) -> &mut NetworkMirror {
        &mut self.mirror
    }

    /// Waits for the next server message and folds it into the mirror.
    ///
    /// Returns false once the server has closed the connection.
    pub async fn recv(&mut self) -> Result<bool, Box<dyn std::error::Error>> {
        loop {
            let frame = match self.source.next().await {
                Some(Ok(Message::Text(text))) => Frame::Text(text),
                Some(Ok(Message::Binary(bytes))) => Frame::Binary(bytes),
                Some(Ok(Message::Close(_))) | None => return Ok(false),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            };

            match decode::<ServerMessage>(&frame) {
                Ok(message) => {
                    self.mirror.handle(message);
                    return Ok(true);
                }
                Err(e) => debug!("Ignoring undecodable server frame: {}", e),
            }
        }
    }

    /// Leaves the game and waits for queued intents to flush.
    pub async fn close(self) {
        let Client { mirror, writer, .. } = self;
        mirror.leave();
        drop(mirror);
        let _ = writer.await;
    }
}
