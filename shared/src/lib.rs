use serde::{Deserialize, Serialize};
use std::fmt;

pub mod codec;

pub use codec::{decode, encode, CodecError, Encoding, Frame};

/// Seconds on the clock when a game starts.
pub const DEFAULT_GAME_TIME: u32 = 300;
/// Players needed before a game starts, and below which a running game ends.
pub const MIN_PLAYERS: usize = 2;
/// A tag only lands when the two players are strictly closer than this.
pub const TAG_DISTANCE: f32 = 2.0;
/// Abilities a player may bring into a game.
pub const MAX_SPECIAL_MOVES: usize = 2;
pub const SPAWN_POSITION: Vec3 = Vec3 {
    x: 0.0,
    y: 1.6,
    z: 0.0,
};

/// Identity assigned by the transport on connect; the player id is the connection id.
pub type PlayerId = u32;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Runner,
    Tagger,
}

/// Special moves, keyed on the wire by the digit the player picked them with.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AbilityKind {
    #[serde(rename = "1")]
    SpeedBoost,
    #[serde(rename = "2")]
    HighJump,
    #[serde(rename = "3")]
    Invisibility,
    #[serde(rename = "4")]
    FreezeRay,
    #[serde(rename = "5")]
    Shield,
    #[serde(rename = "6")]
    Decoy,
}

impl AbilityKind {
    pub const ALL: [AbilityKind; 6] = [
        AbilityKind::SpeedBoost,
        AbilityKind::HighJump,
        AbilityKind::Invisibility,
        AbilityKind::FreezeRay,
        AbilityKind::Shield,
        AbilityKind::Decoy,
    ];

    pub fn from_id(id: &str) -> Option<AbilityKind> {
        match id {
            "1" => Some(AbilityKind::SpeedBoost),
            "2" => Some(AbilityKind::HighJump),
            "3" => Some(AbilityKind::Invisibility),
            "4" => Some(AbilityKind::FreezeRay),
            "5" => Some(AbilityKind::Shield),
            "6" => Some(AbilityKind::Decoy),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            AbilityKind::SpeedBoost => "1",
            AbilityKind::HighJump => "2",
            AbilityKind::Invisibility => "3",
            AbilityKind::FreezeRay => "4",
            AbilityKind::Shield => "5",
            AbilityKind::Decoy => "6",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AbilityKind::SpeedBoost => "Speed Boost",
            AbilityKind::HighJump => "High Jump",
            AbilityKind::Invisibility => "Invisibility",
            AbilityKind::FreezeRay => "Freeze Ray",
            AbilityKind::Shield => "Shield",
            AbilityKind::Decoy => "Decoy",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub skin: String,
    #[serde(rename = "specialMoves")]
    pub special_moves: Vec<AbilityKind>,
    pub position: Vec3,
    pub rotation: Vec3,
    pub team: Team,
    pub tags: u32,
    pub escapes: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: String, skin: String, special_moves: Vec<AbilityKind>) -> Self {
        Self {
            id,
            name,
            skin,
            special_moves,
            position: SPAWN_POSITION,
            rotation: Vec3::ZERO,
            team: Team::Runner,
            tags: 0,
            escapes: 0,
        }
    }

    pub fn is_tagger(&self) -> bool {
        self.team == Team::Tagger
    }
}

/// Why a game ended; serialized as the human-readable result string.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    #[serde(rename = "Time up")]
    TimeUp,
    #[serde(rename = "Not enough players")]
    NotEnoughPlayers,
    #[serde(rename = "All players tagged")]
    AllPlayersTagged,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::TimeUp => "Time up",
            EndReason::NotEnoughPlayers => "Not enough players",
            EndReason::AllPlayersTagged => "All players tagged",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameStats {
    #[serde(rename = "totalPlayers")]
    pub total_players: u32,
    pub taggers: u32,
    pub runners: u32,
    #[serde(rename = "topTagger")]
    pub top_tagger: String,
}

/// Intents sent by a client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    JoinGame {
        name: String,
        skin: String,
        #[serde(rename = "specialMoves")]
        special_moves: Vec<AbilityKind>,
    },
    LeaveGame,
    UpdatePosition {
        position: Vec3,
        rotation: Vec3,
    },
    Teleport {
        position: Vec3,
    },
    TagPlayer {
        #[serde(rename = "taggedId")]
        tagged_id: PlayerId,
    },
    UseSpecialMove {
        #[serde(rename = "moveType")]
        move_type: AbilityKind,
    },
}

/// Messages sent by the server, either unicast or broadcast.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    Connected {
        id: PlayerId,
    },
    Disconnected {
        reason: String,
    },
    InitialPlayers {
        players: Vec<Player>,
    },
    PlayerJoined {
        player: Player,
    },
    PlayerLeft {
        id: PlayerId,
    },
    PlayerMoved {
        id: PlayerId,
        position: Vec3,
        rotation: Vec3,
    },
    PlayerTeleported {
        id: PlayerId,
        position: Vec3,
    },
    PlayerTagged {
        #[serde(rename = "taggerId")]
        tagger_id: PlayerId,
        #[serde(rename = "taggedId")]
        tagged_id: PlayerId,
    },
    PlayerUsedSpecialMove {
        id: PlayerId,
        #[serde(rename = "moveType")]
        move_type: AbilityKind,
    },
    GameStarted {
        #[serde(rename = "taggerId")]
        tagger_id: PlayerId,
        #[serde(rename = "gameTime")]
        game_time: u32,
    },
    GameEnded {
        result: EndReason,
        stats: GameStats,
    },
}
