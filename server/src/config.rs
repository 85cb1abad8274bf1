//! Server and session configuration.

use shared::{DEFAULT_GAME_TIME, MIN_PLAYERS, TAG_DISTANCE};
use std::time::Duration;
use thiserror::Error;

/// Rules of a single game.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Countdown length in ticks (seconds at the default tick interval)
    pub game_duration_secs: u32,
    /// Roster size that starts a game and below which a running game ends
    pub min_players: usize,
    /// Tags land only when the players are strictly closer than this
    pub tag_distance: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            game_duration_secs: DEFAULT_GAME_TIME,
            min_players: MIN_PLAYERS,
            tag_distance: TAG_DISTANCE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on, `host:port`
    pub addr: String,
    pub max_connections: usize,
    /// Interval between countdown ticks
    pub tick_interval: Duration,
    /// Seed for tagger selection; entropy when absent
    pub seed: Option<u64>,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".to_string(),
            max_connections: 64,
            tick_interval: Duration::from_secs(1),
            seed: None,
            session: SessionConfig::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tick interval must be greater than zero")]
    ZeroTickInterval,
    #[error("game duration must be at least one tick")]
    ZeroGameDuration,
    #[error("a game needs at least 2 players, got {0}")]
    TooFewPlayers(usize),
    #[error("tag distance must be positive, got {0}")]
    InvalidTagDistance(f32),
    #[error("server must accept at least one connection")]
    NoConnections,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.max_connections == 0 {
            return Err(ConfigError::NoConnections);
        }
        self.session.validate()
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game_duration_secs == 0 {
            return Err(ConfigError::ZeroGameDuration);
        }
        if self.min_players < MIN_PLAYERS {
            return Err(ConfigError::TooFewPlayers(self.min_players));
        }
        if self.tag_distance.is_nan() || self.tag_distance <= 0.0 {
            return Err(ConfigError::InvalidTagDistance(self.tag_distance));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults_match_game_rules() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, "0.0.0.0:3000");
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.session.game_duration_secs, 300);
        assert_eq!(config.session.min_players, 2);
        assert_eq!(config.session.tag_distance, 2.0);
        assert_ok!(config.validate());
        assert_ok!(config.session.validate());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = ServerConfig::default();
        config.tick_interval = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickInterval));

        let mut config = ServerConfig::default();
        config.max_connections = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoConnections));

        let mut config = ServerConfig::default();
        config.session.game_duration_secs = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroGameDuration));

        let mut config = ServerConfig::default();
        config.session.min_players = 1;
        assert_eq!(config.validate(), Err(ConfigError::TooFewPlayers(1)));

        let mut config = ServerConfig::default();
        config.session.tag_distance = f32::NAN;
        assert_err!(config.validate());
        config.session.tag_distance = -1.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTagDistance(-1.0)));
    }
}
