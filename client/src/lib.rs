//! # Tag Game Client Library
//!
//! This library provides the client side of the multiplayer tag game: the
//! connection to the server, a local mirror of the authoritative roster and
//! the player's own special moves.
//!
//! ## Architecture Overview
//!
//! The server owns every shared fact about the game. The client streams its
//! own position, asks the server to tag nearby runners and announces the
//! special moves it fires. Everything it learns back is folded into a local
//! mirror that the game loop reads from.
//!
//! ### One-Way Reconciliation
//! Server messages always overwrite the mirror. The only state written
//! locally ahead of the server is the local player's own position, which the
//! server relays without modification.
//!
//! ### Client-Authoritative Abilities
//! Special moves run entirely on the client. The server only relays the fact
//! that one was used, so other clients can play the matching effect on the
//! remote avatar.
//!
//! ## Module Organization
//!
//! ### Mirror Module (`mirror`)
//! - Shadow roster, local identity and display clock
//! - One handler slot per server event kind
//! - Fire-and-forget intent methods
//!
//! ### Abilities Module (`abilities`)
//! - Fixed catalogue of cooldowns and effect durations
//! - Activation, cooldown rejection and timed reverts
//!
//! ### Teleport Module (`teleport`)
//! Ten saved positions bound to the number row.
//!
//! ### Network Module (`network`)
//! WebSocket connection that feeds the mirror and drains its intents.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use shared::Encoding;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::connect("ws://127.0.0.1:3000", Encoding::Json).await?;
//!
//!     client.mirror_mut().on_game_started(|event, roster| {
//!         println!("Game on! {} players, tagger is {}", roster.player_count(), event.tagger_id);
//!     });
//!     client.mirror().join("Ada", "red", &[]);
//!
//!     while client.recv().await? {}
//!     Ok(())
//! }
//! ```

pub mod abilities;
pub mod mirror;
pub mod network;
pub mod teleport;
