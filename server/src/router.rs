//! Translates client intents into session mutations and outbound deltas.
//!
//! The router is transport-free: every handler returns the messages to send
//! and who should receive them, and the network loop does the delivery. This
//! keeps the whole intent → broadcast contract testable without sockets.

use crate::session::{GameEnd, JoinOutcome, LeaveOutcome, Session, TagOutcome};
use log::debug;
use shared::{AbilityKind, ClientMessage, PlayerId, ServerMessage};

/// Recipients of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    AllExcept(PlayerId),
    Only(PlayerId),
}

impl Target {
    pub fn includes(&self, id: PlayerId) -> bool {
        match *self {
            Target::All => true,
            Target::AllExcept(excluded) => id != excluded,
            Target::Only(only) => id == only,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub target: Target,
    pub message: ServerMessage,
}

impl Outbound {
    fn all(message: ServerMessage) -> Self {
        Self {
            target: Target::All,
            message,
        }
    }
}

pub struct Router {
    session: Session,
}

impl Router {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Welcome for a freshly registered connection: its id, then the roster.
    pub fn handle_connect(&self, id: PlayerId) -> Vec<Outbound> {
        vec![
            Outbound {
                target: Target::Only(id),
                message: ServerMessage::Connected { id },
            },
            Outbound {
                target: Target::Only(id),
                message: ServerMessage::InitialPlayers {
                    players: self.session.snapshot(),
                },
            },
        ]
    }

    pub fn handle_message(&mut self, sender: PlayerId, message: ClientMessage) -> Vec<Outbound> {
        match message {
            ClientMessage::JoinGame {
                name,
                skin,
                special_moves,
            } => self.join(sender, name, skin, special_moves),

            ClientMessage::LeaveGame => self.leave(sender),

            ClientMessage::UpdatePosition { position, rotation } => {
                if !self.session.update_position(&sender, position, rotation) {
                    debug!("Dropping position update from non-player {}", sender);
                    return Vec::new();
                }
                vec![Outbound {
                    target: Target::AllExcept(sender),
                    message: ServerMessage::PlayerMoved {
                        id: sender,
                        position,
                        rotation,
                    },
                }]
            }

            ClientMessage::Teleport { position } => {
                if !self.session.teleport(&sender, position) {
                    debug!("Dropping teleport from non-player {}", sender);
                    return Vec::new();
                }
                vec![Outbound {
                    target: Target::AllExcept(sender),
                    message: ServerMessage::PlayerTeleported {
                        id: sender,
                        position,
                    },
                }]
            }

            ClientMessage::TagPlayer { tagged_id } => match self.session.tag(&sender, &tagged_id) {
                TagOutcome::Tagged { ended } => {
                    let mut out = vec![Outbound::all(ServerMessage::PlayerTagged {
                        tagger_id: sender,
                        tagged_id,
                    })];
                    out.extend(ended.map(game_ended));
                    out
                }
                TagOutcome::Rejected(reason) => {
                    debug!("Dropping tag {} -> {}: {:?}", sender, tagged_id, reason);
                    Vec::new()
                }
            },

            ClientMessage::UseSpecialMove { move_type } => {
                if !self.session.contains(&sender) {
                    debug!("Dropping special move from non-player {}", sender);
                    return Vec::new();
                }
                vec![Outbound::all(ServerMessage::PlayerUsedSpecialMove {
                    id: sender,
                    move_type,
                })]
            }
        }
    }

    /// A closed socket is an implicit leave.
    pub fn handle_disconnect(&mut self, id: PlayerId) -> Vec<Outbound> {
        self.leave(id)
    }

    /// One countdown tick.
    pub fn handle_tick(&mut self) -> Vec<Outbound> {
        self.session.tick().map(game_ended).into_iter().collect()
    }

    fn join(
        &mut self,
        sender: PlayerId,
        name: String,
        skin: String,
        special_moves: Vec<AbilityKind>,
    ) -> Vec<Outbound> {
        match self.session.join(sender, name, skin, special_moves) {
            JoinOutcome::Joined { player, started } => {
                let mut out = vec![Outbound::all(ServerMessage::PlayerJoined { player })];
                if let Some(start) = started {
                    out.push(Outbound::all(ServerMessage::GameStarted {
                        tagger_id: start.tagger_id,
                        game_time: start.game_time,
                    }));
                }
                out
            }
            JoinOutcome::AlreadyJoined => Vec::new(),
        }
    }

    fn leave(&mut self, sender: PlayerId) -> Vec<Outbound> {
        match self.session.leave(&sender) {
            LeaveOutcome::Left { ended } => {
                let mut out = vec![Outbound::all(ServerMessage::PlayerLeft { id: sender })];
                out.extend(ended.map(game_ended));
                out
            }
            LeaveOutcome::NotPresent => Vec::new(),
        }
    }
}

fn game_ended(end: GameEnd) -> Outbound {
    Outbound::all(ServerMessage::GameEnded {
        result: end.reason,
        stats: end.stats,
    })
}
