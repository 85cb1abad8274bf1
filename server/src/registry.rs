//! Connection registry for the tag server
//!
//! Tracks one entry per live WebSocket, including:
//! - Identity assignment (the connection id doubles as the player id)
//! - The outbound frame queue used to reach the socket's writer task
//! - The encoding the client last spoke, so replies match it
//! - Capacity enforcement
//!
//! The registry holds data only. Game rules live in the session, and the
//! network loop decides when entries come and go.

use log::info;
use shared::{Encoding, Frame, PlayerId};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;

/// A connected client socket
#[derive(Debug)]
pub struct Connection {
    /// Identifier assigned by the registry on connect
    pub id: PlayerId,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// Queue drained by the socket's writer task
    pub sender: mpsc::UnboundedSender<Frame>,
    /// Encoding of the most recent inbound frame
    pub encoding: Encoding,
    pub connected_at: Instant,
}

impl Connection {
    pub fn new(id: PlayerId, addr: SocketAddr, sender: mpsc::UnboundedSender<Frame>) -> Self {
        Self {
            id,
            addr,
            sender,
            encoding: Encoding::Json,
            connected_at: Instant::now(),
        }
    }
}

/// All live connections, keyed by id
///
/// Ids start at 1 and are never reused within a process, so a late frame
/// from a closed socket can never be attributed to a newer client.
pub struct ConnectionRegistry {
    connections: BTreeMap<PlayerId, Connection>,
    next_id: PlayerId,
    max_connections: usize,
}

impl ConnectionRegistry {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: BTreeMap::new(),
            next_id: 1,
            max_connections,
        }
    }

    /// Registers a new socket
    ///
    /// Returns the assigned id, or None when the server is at capacity.
    pub fn add(
        &mut self,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<Frame>,
    ) -> Option<PlayerId> {
        if self.connections.len() >= self.max_connections {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;

        info!("Connection {} opened from {}", id, addr);
        self.connections.insert(id, Connection::new(id, addr, sender));
        Some(id)
    }

    /// Drops a connection; false if it was already gone
    pub fn remove(&mut self, id: &PlayerId) -> bool {
        match self.connections.remove(id) {
            Some(connection) => {
                info!(
                    "Connection {} from {} closed after {:.1}s",
                    connection.id,
                    connection.addr,
                    connection.connected_at.elapsed().as_secs_f32()
                );
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn set_encoding(&mut self, id: &PlayerId, encoding: Encoding) {
        if let Some(connection) = self.connections.get_mut(id) {
            connection.encoding = encoding;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
