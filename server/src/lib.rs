//! # Tag Game Server Library
//!
//! This library provides the authoritative server for the multiplayer tag game.
//! It owns the shared roster, runs the match lifecycle and relays every
//! player's actions to everyone else.
//!
//! ## Core Responsibilities
//!
//! ### Match Lifecycle
//! A game starts as soon as enough players have joined. One of them is picked
//! at random as the tagger and a countdown begins. The game ends when time
//! runs out, when too few players remain, or when nobody is left to tag.
//! Ending a game reports statistics and resets everyone to runner.
//!
//! ### Tag Adjudication
//! Clients ask the server to tag another player. The server checks that the
//! requester is a tagger, that the target is still a runner, and that the two
//! stand close enough together before converting the target.
//!
//! ### Relay
//! Movement, teleports and special moves are relayed to every other
//! connection. The server keeps the latest position of each player so that
//! late joiners receive a complete snapshot.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! Socket tasks only move frames. Joins, leaves, tags, disconnects and
//! countdown ticks are all applied by one loop, one event at a time, so no
//! two mutations of the roster ever interleave.
//!
//! ### WebSocket Transport
//! Clients connect over WebSocket. Browsers speak JSON in text frames and
//! native clients may speak bincode in binary frames. Each connection is
//! answered in the encoding it last used.
//!
//! ## Module Organization
//!
//! - `config`: server and rule settings with validation
//! - `picker`: tagger selection, injectable for deterministic tests
//! - `registry`: live connections and their outbound queues
//! - `session`: the roster and game state machine, free of any I/O
//! - `router`: maps intents to session calls and addressed replies
//! - `network`: sockets, the main loop and the countdown timer
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ServerConfig {
//!         addr: "127.0.0.1:3000".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     let server = Server::bind(config).await?;
//!     server.run().await
//! }
//! ```

pub mod config;
pub mod network;
pub mod picker;
pub mod registry;
pub mod router;
pub mod session;
