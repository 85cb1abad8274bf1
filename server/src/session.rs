//! Authoritative game session
//!
//! One `Session` exists per server process. It owns the roster and the game
//! lifecycle:
//!
//! ```text
//! Idle --(roster reaches min_players on join)--> Running
//! Running --tick--> Running
//! Running --(time up | too few players | no runners)--> Ended --> Idle
//! ```
//!
//! `Ended` is transient: the summary is computed, every team is reset to
//! runner, and the session is `Idle` again before the call returns. Per-player
//! `tags`/`escapes` counters survive across games.
//!
//! Movement is client-authoritative. The only rule enforced here is the
//! proximity gate on tags.

use crate::config::SessionConfig;
use crate::picker::TaggerPicker;
use log::{debug, info};
use shared::{AbilityKind, EndReason, GameStats, Player, PlayerId, Team, Vec3, MAX_SPECIAL_MOVES};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running,
}

/// Emitted on `Idle -> Running`.
#[derive(Debug, Clone, PartialEq)]
pub struct GameStart {
    pub tagger_id: PlayerId,
    pub game_time: u32,
}

/// Emitted on `Running -> Ended`.
#[derive(Debug, Clone, PartialEq)]
pub struct GameEnd {
    pub reason: EndReason,
    pub stats: GameStats,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Joined {
        player: Player,
        started: Option<GameStart>,
    },
    AlreadyJoined,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    Left { ended: Option<GameEnd> },
    NotPresent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagRejection {
    UnknownPlayer,
    SelfTag,
    NotTagger,
    AlreadyTagger,
    OutOfRange { distance: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagOutcome {
    Tagged { ended: Option<GameEnd> },
    Rejected(TagRejection),
}

pub struct Session {
    config: SessionConfig,
    players: BTreeMap<PlayerId, Player>,
    phase: SessionPhase,
    remaining: u32,
    /// Informational; `Player::team` decides who may tag.
    tagger_of_record: Option<PlayerId>,
    picker: Box<dyn TaggerPicker>,
}

impl Session {
    pub fn new(config: SessionConfig, picker: Box<dyn TaggerPicker>) -> Self {
        let remaining = config.game_duration_secs;
        Self {
            config,
            players: BTreeMap::new(),
            phase: SessionPhase::Idle,
            remaining,
            tagger_of_record: None,
            picker,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn remaining_time(&self) -> u32 {
        self.remaining
    }

    pub fn tagger_of_record(&self) -> Option<PlayerId> {
        self.tagger_of_record
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn runner_count(&self) -> usize {
        self.count_team(Team::Runner)
    }

    pub fn tagger_count(&self) -> usize {
        self.count_team(Team::Tagger)
    }

    /// Full roster in id order, as sent to a newly connected client.
    pub fn snapshot(&self) -> Vec<Player> {
        self.players.values().cloned().collect()
    }

    pub fn join(
        &mut self,
        id: PlayerId,
        name: String,
        skin: String,
        mut special_moves: Vec<AbilityKind>,
    ) -> JoinOutcome {
        if self.players.contains_key(&id) {
            debug!("Ignoring duplicate join from player {}", id);
            return JoinOutcome::AlreadyJoined;
        }

        special_moves.truncate(MAX_SPECIAL_MOVES);
        let player = Player::new(id, name, skin, special_moves);
        info!("Player {} joined as {:?}", id, player.name);
        self.players.insert(id, player.clone());

        let started = if !self.is_running() && self.players.len() >= self.config.min_players {
            Some(self.start())
        } else {
            None
        };

        // Re-read so the joined record reflects a tagger assignment made by start().
        let player = self.players.get(&id).cloned().unwrap_or(player);
        JoinOutcome::Joined { player, started }
    }

    pub fn leave(&mut self, id: &PlayerId) -> LeaveOutcome {
        if self.players.remove(id).is_none() {
            return LeaveOutcome::NotPresent;
        }
        info!("Player {} left ({} remaining)", id, self.players.len());

        let ended = if !self.is_running() {
            None
        } else if self.players.len() < self.config.min_players {
            Some(self.end(EndReason::NotEnoughPlayers))
        } else if self.runner_count() == 0 {
            Some(self.end(EndReason::AllPlayersTagged))
        } else {
            None
        };

        LeaveOutcome::Left { ended }
    }

    /// Last writer wins. Returns false when the player is unknown.
    pub fn update_position(&mut self, id: &PlayerId, position: Vec3, rotation: Vec3) -> bool {
        match self.players.get_mut(id) {
            Some(player) => {
                player.position = position;
                player.rotation = rotation;
                true
            }
            None => false,
        }
    }

    pub fn teleport(&mut self, id: &PlayerId, position: Vec3) -> bool {
        match self.players.get_mut(id) {
            Some(player) => {
                player.position = position;
                true
            }
            None => false,
        }
    }

    pub fn tag(&mut self, tagger_id: &PlayerId, tagged_id: &PlayerId) -> TagOutcome {
        if tagger_id == tagged_id {
            return TagOutcome::Rejected(TagRejection::SelfTag);
        }
        let (tagger, tagged) = match (self.players.get(tagger_id), self.players.get(tagged_id)) {
            (Some(tagger), Some(tagged)) => (tagger, tagged),
            _ => return TagOutcome::Rejected(TagRejection::UnknownPlayer),
        };
        if tagger.team != Team::Tagger {
            return TagOutcome::Rejected(TagRejection::NotTagger);
        }
        if tagged.team != Team::Runner {
            return TagOutcome::Rejected(TagRejection::AlreadyTagger);
        }
        let distance = tagger.position.distance(&tagged.position);
        if distance.is_nan() || distance >= self.config.tag_distance {
            return TagOutcome::Rejected(TagRejection::OutOfRange { distance });
        }

        if let Some(tagged) = self.players.get_mut(tagged_id) {
            tagged.team = Team::Tagger;
        }
        if let Some(tagger) = self.players.get_mut(tagger_id) {
            tagger.tags += 1;
        }
        info!("Player {} tagged player {}", tagger_id, tagged_id);

        let ended = if self.is_running() && self.runner_count() == 0 {
            Some(self.end(EndReason::AllPlayersTagged))
        } else {
            None
        };
        TagOutcome::Tagged { ended }
    }

    /// Advances the countdown by one tick. No-op while idle.
    pub fn tick(&mut self) -> Option<GameEnd> {
        if !self.is_running() {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            return Some(self.end(EndReason::TimeUp));
        }
        None
    }

    /// Advances the countdown by `seconds` ticks, stopping at the first game end.
    pub fn advance(&mut self, seconds: u32) -> Option<GameEnd> {
        for _ in 0..seconds {
            if let Some(end) = self.tick() {
                return Some(end);
            }
        }
        None
    }

    fn start(&mut self) -> GameStart {
        self.phase = SessionPhase::Running;
        self.remaining = self.config.game_duration_secs;

        let ids: Vec<PlayerId> = self.players.keys().copied().collect();
        let index = self.picker.pick(ids.len()).min(ids.len() - 1);
        let tagger_id = ids[index];

        for player in self.players.values_mut() {
            player.team = if player.id == tagger_id {
                Team::Tagger
            } else {
                Team::Runner
            };
        }
        self.tagger_of_record = Some(tagger_id);

        info!(
            "Game started with {} players, tagger {}, {}s on the clock",
            ids.len(),
            tagger_id,
            self.remaining
        );
        GameStart {
            tagger_id,
            game_time: self.remaining,
        }
    }

    fn end(&mut self, reason: EndReason) -> GameEnd {
        let stats = self.stats();
        info!(
            "Game ended: {} ({} taggers, {} runners, top tagger {})",
            reason, stats.taggers, stats.runners, stats.top_tagger
        );

        self.phase = SessionPhase::Idle;
        self.tagger_of_record = None;
        for player in self.players.values_mut() {
            player.team = Team::Runner;
        }

        GameEnd { reason, stats }
    }

    fn stats(&self) -> GameStats {
        let mut top: Option<&Player> = None;
        for player in self.players.values() {
            match top {
                Some(best) if best.tags >= player.tags => {}
                _ => top = Some(player),
            }
        }

        GameStats {
            total_players: self.players.len() as u32,
            taggers: self.tagger_count() as u32,
            runners: self.runner_count() as u32,
            top_tagger: top
                .map(|player| player.name.clone())
                .unwrap_or_else(|| "None".to_string()),
        }
    }

    fn count_team(&self, team: Team) -> usize {
        self.players.values().filter(|p| p.team == team).count()
    }
}
