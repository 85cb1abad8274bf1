//! Client-side shadow of the authoritative roster
//!
//! The mirror never originates state. Every inbound server message is folded
//! into the local roster first and only then handed to the game loop, so a
//! handler always sees a roster that already reflects the event it receives.
//!
//! Each event kind has a single handler slot. Registering a second handler
//! for the same kind replaces the first.

use log::{debug, info, warn};
use shared::{
    AbilityKind, ClientMessage, EndReason, GameStats, Player, PlayerId, ServerMessage, Team, Vec3,
};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Read-only view of the mirrored game state handed to every handler
#[derive(Debug, Default, Clone)]
pub struct Roster {
    players: BTreeMap<PlayerId, Player>,
    local_id: Option<PlayerId>,
    game_started: bool,
    game_time: f32,
}

impl Roster {
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn local_id(&self) -> Option<PlayerId> {
        self.local_id
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.local_id.and_then(|id| self.players.get(&id))
    }

    pub fn game_started(&self) -> bool {
        self.game_started
    }

    /// Seconds left on the locally advanced clock
    pub fn game_time(&self) -> f32 {
        self.game_time
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn runner_count(&self) -> usize {
        self.players
            .values()
            .filter(|p| p.team == Team::Runner)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moved {
    pub id: PlayerId,
    pub position: Vec3,
    pub rotation: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Teleported {
    pub id: PlayerId,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tagged {
    pub tagger_id: PlayerId,
    pub tagged_id: PlayerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbilityUsed {
    pub id: PlayerId,
    pub kind: AbilityKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Started {
    pub tagger_id: PlayerId,
    pub game_time: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ended {
    pub result: EndReason,
    pub stats: GameStats,
}

type Handler<T> = Box<dyn FnMut(&T, &Roster) + Send>;

#[derive(Default)]
struct Channels {
    player_joined: Option<Handler<Player>>,
    player_left: Option<Handler<Player>>,
    player_moved: Option<Handler<Moved>>,
    player_teleported: Option<Handler<Teleported>>,
    player_tagged: Option<Handler<Tagged>>,
    game_started: Option<Handler<Started>>,
    game_ended: Option<Handler<Ended>>,
    ability_used: Option<Handler<AbilityUsed>>,
}

fn notify<T>(slot: &mut Option<Handler<T>>, event: &T, roster: &Roster) {
    if let Some(handler) = slot.as_mut() {
        handler(event, roster);
    }
}

/// One row of the end-of-game and in-game scoreboard
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreLine {
    pub name: String,
    pub team: Team,
    pub tags: u32,
    pub escapes: u32,
}

pub struct NetworkMirror {
    roster: Roster,
    channels: Channels,
    outbound: mpsc::UnboundedSender<ClientMessage>,
}

impl NetworkMirror {
    /// Creates a mirror whose intents are queued on `outbound`
    pub fn new(outbound: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self {
            roster: Roster::default(),
            channels: Channels::default(),
            outbound,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn local_id(&self) -> Option<PlayerId> {
        self.roster.local_id
    }

    pub fn player_count(&self) -> usize {
        self.roster.player_count()
    }

    pub fn runner_count(&self) -> usize {
        self.roster.runner_count()
    }

    pub fn scoreboard(&self) -> Vec<ScoreLine> {
        self.roster
            .players()
            .map(|p| ScoreLine {
                name: p.name.clone(),
                team: p.team,
                tags: p.tags,
                escapes: p.escapes,
            })
            .collect()
    }

    /// Runs the display clock down; the server still decides when the game ends.
    pub fn advance_clock(&mut self, delta: f32) {
        if self.roster.game_started {
            self.roster.game_time = (self.roster.game_time - delta).max(0.0);
        }
    }

    pub fn on_player_joined(&mut self, handler: impl FnMut(&Player, &Roster) + Send + 'static) {
        self.channels.player_joined = Some(Box::new(handler));
    }

    pub fn on_player_left(&mut self, handler: impl FnMut(&Player, &Roster) + Send + 'static) {
        self.channels.player_left = Some(Box::new(handler));
    }

    pub fn on_player_moved(&mut self, handler: impl FnMut(&Moved, &Roster) + Send + 'static) {
        self.channels.player_moved = Some(Box::new(handler));
    }

    pub fn on_player_teleported(
        &mut self,
        handler: impl FnMut(&Teleported, &Roster) + Send + 'static,
    ) {
        self.channels.player_teleported = Some(Box::new(handler));
    }

    pub fn on_player_tagged(&mut self, handler: impl FnMut(&Tagged, &Roster) + Send + 'static) {
        self.channels.player_tagged = Some(Box::new(handler));
    }

    pub fn on_game_started(&mut self, handler: impl FnMut(&Started, &Roster) + Send + 'static) {
        self.channels.game_started = Some(Box::new(handler));
    }

    pub fn on_game_ended(&mut self, handler: impl FnMut(&Ended, &Roster) + Send + 'static) {
        self.channels.game_ended = Some(Box::new(handler));
    }

    pub fn on_ability_used(
        &mut self,
        handler: impl FnMut(&AbilityUsed, &Roster) + Send + 'static,
    ) {
        self.channels.ability_used = Some(Box::new(handler));
    }

    /// Folds one server message into the shadow roster, then notifies its handler
    pub fn handle(&mut self, message: ServerMessage) {
        let roster = &mut self.roster;
        let channels = &mut self.channels;

        match message {
            ServerMessage::Connected { id } => {
                info!("Connected as player {}", id);
                roster.local_id = Some(id);
            }

            ServerMessage::Disconnected { reason } => {
                warn!("Disconnected by server: {}", reason);
            }

            ServerMessage::InitialPlayers { players } => {
                // A game already in progress only counts once gameStarted supplies its clock.
                roster.players = players.into_iter().map(|p| (p.id, p)).collect();
                debug!("Received roster of {} players", roster.players.len());
            }

            ServerMessage::PlayerJoined { player } => {
                roster.players.insert(player.id, player.clone());
                notify(&mut channels.player_joined, &player, roster);
            }

            ServerMessage::PlayerLeft { id } => {
                if let Some(player) = roster.players.remove(&id) {
                    notify(&mut channels.player_left, &player, roster);
                }
            }

            ServerMessage::PlayerMoved {
                id,
                position,
                rotation,
            } => {
                if let Some(player) = roster.players.get_mut(&id) {
                    player.position = position;
                    player.rotation = rotation;
                    let event = Moved {
                        id,
                        position,
                        rotation,
                    };
                    notify(&mut channels.player_moved, &event, roster);
                }
            }

            ServerMessage::PlayerTeleported { id, position } => {
                if let Some(player) = roster.players.get_mut(&id) {
                    player.position = position;
                    notify(
                        &mut channels.player_teleported,
                        &Teleported { id, position },
                        roster,
                    );
                }
            }

            ServerMessage::PlayerTagged {
                tagger_id,
                tagged_id,
            } => {
                if !roster.players.contains_key(&tagger_id)
                    || !roster.players.contains_key(&tagged_id)
                {
                    debug!("Ignoring tag between unknown players");
                    return;
                }
                if let Some(tagged) = roster.players.get_mut(&tagged_id) {
                    tagged.team = Team::Tagger;
                }
                if let Some(tagger) = roster.players.get_mut(&tagger_id) {
                    tagger.tags += 1;
                }
                let event = Tagged {
                    tagger_id,
                    tagged_id,
                };
                notify(&mut channels.player_tagged, &event, roster);
            }

            ServerMessage::PlayerUsedSpecialMove { id, move_type } => {
                let event = AbilityUsed { id, kind: move_type };
                notify(&mut channels.ability_used, &event, roster);
            }

            ServerMessage::GameStarted {
                tagger_id,
                game_time,
            } => {
                roster.game_started = true;
                roster.game_time = game_time as f32;
                if let Some(tagger) = roster.players.get_mut(&tagger_id) {
                    tagger.team = Team::Tagger;
                }
                let event = Started {
                    tagger_id,
                    game_time,
                };
                notify(&mut channels.game_started, &event, roster);
            }

            ServerMessage::GameEnded { result, stats } => {
                roster.game_started = false;
                roster.game_time = 0.0;
                for player in roster.players.values_mut() {
                    player.team = Team::Runner;
                }
                notify(&mut channels.game_ended, &Ended { result, stats }, roster);
            }
        }
    }

    fn send(&self, message: ClientMessage) {
        if let Err(e) = self.outbound.send(message) {
            warn!("Connection closed, dropping {:?}", e.0);
        }
    }

    pub fn join(&self, name: &str, skin: &str, special_moves: &[AbilityKind]) {
        self.send(ClientMessage::JoinGame {
            name: name.to_string(),
            skin: skin.to_string(),
            special_moves: special_moves.to_vec(),
        });
    }

    pub fn leave(&self) {
        self.send(ClientMessage::LeaveGame);
    }

    /// Streams the local pose; the local copy is updated without waiting for the server.
    pub fn update_position(&mut self, position: Vec3, rotation: Vec3) {
        if let Some(player) = self
            .roster
            .local_id
            .and_then(|id| self.roster.players.get_mut(&id))
        {
            player.position = position;
            player.rotation = rotation;
        }
        self.send(ClientMessage::UpdatePosition { position, rotation });
    }

    pub fn teleport(&mut self, position: Vec3) {
        if let Some(player) = self
            .roster
            .local_id
            .and_then(|id| self.roster.players.get_mut(&id))
        {
            player.position = position;
        }
        self.send(ClientMessage::Teleport { position });
    }

    pub fn tag(&self, tagged_id: PlayerId) {
        self.send(ClientMessage::TagPlayer { tagged_id });
    }

    pub fn use_ability(&self, kind: AbilityKind) {
        self.send(ClientMessage::UseSpecialMove { move_type: kind });
    }
}
