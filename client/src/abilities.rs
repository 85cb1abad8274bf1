//! Special move cooldowns and timed effects
//!
//! Abilities are applied locally and only announced to the server so other
//! clients can show them. Each ability has a fixed cooldown and an optional
//! effect duration; an effect is reverted exactly once when its duration runs
//! out.

use log::debug;
use shared::AbilityKind;
use std::collections::BTreeMap;
use thiserror::Error;

/// Static tuning for one ability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilitySpec {
    pub cooldown: f32,
    /// Zero for instantaneous abilities
    pub duration: f32,
}

pub fn spec(kind: AbilityKind) -> AbilitySpec {
    let (cooldown, duration) = match kind {
        AbilityKind::SpeedBoost => (10.0, 5.0),
        AbilityKind::HighJump => (5.0, 0.0),
        AbilityKind::Invisibility => (15.0, 8.0),
        AbilityKind::FreezeRay => (8.0, 0.0),
        AbilityKind::Shield => (12.0, 6.0),
        AbilityKind::Decoy => (15.0, 10.0),
    };
    AbilitySpec { cooldown, duration }
}

#[derive(Debug, Error, PartialEq)]
pub enum AbilityError {
    #[error("{kind:?} is on cooldown for another {remaining:.1}s")]
    OnCooldown { kind: AbilityKind, remaining: f32 },
}

/// Whatever an ability acts on
pub trait AbilityEffects {
    fn apply(&mut self, kind: AbilityKind);
    fn revert(&mut self, kind: AbilityKind);
}

/// Movement and presentation stats of one avatar
#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    pub speed: f32,
    pub vertical_velocity: f32,
    pub opacity: f32,
    pub shielded: bool,
    pub decoy_visible: bool,
    pub freeze_beams: u32,
}

pub const BASE_SPEED: f32 = 5.0;
pub const JUMP_IMPULSE: f32 = 20.0;
const INVISIBLE_OPACITY: f32 = 0.2;

impl Default for Avatar {
    fn default() -> Self {
        Self {
            speed: BASE_SPEED,
            vertical_velocity: 0.0,
            opacity: 1.0,
            shielded: false,
            decoy_visible: false,
            freeze_beams: 0,
        }
    }
}

impl AbilityEffects for Avatar {
    fn apply(&mut self, kind: AbilityKind) {
        match kind {
            AbilityKind::SpeedBoost => self.speed *= 2.0,
            AbilityKind::HighJump => self.vertical_velocity += JUMP_IMPULSE,
            AbilityKind::Invisibility => self.opacity = INVISIBLE_OPACITY,
            AbilityKind::FreezeRay => self.freeze_beams += 1,
            AbilityKind::Shield => self.shielded = true,
            AbilityKind::Decoy => self.decoy_visible = true,
        }
    }

    fn revert(&mut self, kind: AbilityKind) {
        match kind {
            AbilityKind::SpeedBoost => self.speed /= 2.0,
            AbilityKind::Invisibility => self.opacity = 1.0,
            AbilityKind::Shield => self.shielded = false,
            AbilityKind::Decoy => self.decoy_visible = false,
            AbilityKind::HighJump | AbilityKind::FreezeRay => {}
        }
    }
}

/// Cooldowns and running effects for one player
pub struct AbilityState<E: AbilityEffects> {
    target: E,
    cooldowns: BTreeMap<AbilityKind, f32>,
    active: BTreeMap<AbilityKind, f32>,
}

impl<E: AbilityEffects> AbilityState<E> {
    pub fn new(target: E) -> Self {
        Self {
            target,
            cooldowns: AbilityKind::ALL.iter().map(|&k| (k, 0.0)).collect(),
            active: BTreeMap::new(),
        }
    }

    pub fn target(&self) -> &E {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut E {
        &mut self.target
    }

    pub fn cooldown(&self, kind: AbilityKind) -> f32 {
        self.cooldowns.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn is_ready(&self, kind: AbilityKind) -> bool {
        self.cooldown(kind) <= 0.0
    }

    pub fn is_active(&self, kind: AbilityKind) -> bool {
        self.active.contains_key(&kind)
    }

    /// Remaining effect time, if the ability is running
    pub fn remaining_effect(&self, kind: AbilityKind) -> Option<f32> {
        self.active.get(&kind).copied()
    }

    pub fn activate(&mut self, kind: AbilityKind) -> Result<(), AbilityError> {
        let remaining = self.cooldown(kind);
        if remaining > 0.0 {
            return Err(AbilityError::OnCooldown { kind, remaining });
        }

        let spec = spec(kind);
        self.target.apply(kind);
        self.cooldowns.insert(kind, spec.cooldown);
        if spec.duration > 0.0 {
            self.active.insert(kind, spec.duration);
        }

        debug!("Activated {}", kind.display_name());
        Ok(())
    }

    /// Advances every timer by `delta` seconds
    pub fn advance(&mut self, delta: f32) {
        for cooldown in self.cooldowns.values_mut() {
            if *cooldown > 0.0 {
                *cooldown = (*cooldown - delta).max(0.0);
            }
        }

        let mut expired = Vec::new();
        for (kind, remaining) in self.active.iter_mut() {
            *remaining -= delta;
            if *remaining <= 0.0 {
                expired.push(*kind);
            }
        }
        for kind in expired {
            self.active.remove(&kind);
            self.target.revert(kind);
            debug!("{} wore off", kind.display_name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use tokio_test::assert_ok;

    #[derive(Default)]
    struct Recorder {
        applied: Vec<AbilityKind>,
        reverted: Vec<AbilityKind>,
    }

    impl AbilityEffects for Recorder {
        fn apply(&mut self, kind: AbilityKind) {
            self.applied.push(kind);
        }

        fn revert(&mut self, kind: AbilityKind) {
            self.reverted.push(kind);
        }
    }

    #[test]
    fn test_catalogue() {
        assert_eq!(
            spec(AbilityKind::SpeedBoost),
            AbilitySpec {
                cooldown: 10.0,
                duration: 5.0
            }
        );
        assert_eq!(spec(AbilityKind::HighJump).duration, 0.0);
        assert_eq!(spec(AbilityKind::Invisibility).cooldown, 15.0);
        assert_eq!(spec(AbilityKind::FreezeRay).cooldown, 8.0);
        assert_eq!(spec(AbilityKind::Shield).duration, 6.0);
        assert_eq!(spec(AbilityKind::Decoy).duration, 10.0);
    }

    #[test]
    fn test_activation_sets_full_cooldown() {
        let mut state = AbilityState::new(Recorder::default());
        for kind in AbilityKind::ALL {
            assert_ok!(state.activate(kind));
            assert_eq!(state.cooldown(kind), spec(kind).cooldown);
        }
        assert_eq!(state.target().applied, AbilityKind::ALL.to_vec());
    }

    #[test]
    fn test_activation_on_cooldown_is_rejected_without_effect() {
        let mut state = AbilityState::new(Recorder::default());
        state.activate(AbilityKind::Shield).unwrap();
        state.advance(2.0);

        let err = state.activate(AbilityKind::Shield).unwrap_err();
        match err {
            AbilityError::OnCooldown { kind, remaining } => {
                assert_eq!(kind, AbilityKind::Shield);
                assert_approx_eq!(remaining, 10.0, 1e-5);
            }
        }
        assert_eq!(state.target().applied.len(), 1);
        assert_approx_eq!(state.cooldown(AbilityKind::Shield), 10.0, 1e-5);
        assert_approx_eq!(
            state.remaining_effect(AbilityKind::Shield).unwrap(),
            4.0,
            1e-5
        );
    }

    #[test]
    fn test_effect_reverts_exactly_once() {
        let mut state = AbilityState::new(Recorder::default());
        state.activate(AbilityKind::SpeedBoost).unwrap();

        state.advance(4.0);
        assert!(state.is_active(AbilityKind::SpeedBoost));
        assert!(state.target().reverted.is_empty());

        state.advance(1.5);
        assert!(!state.is_active(AbilityKind::SpeedBoost));
        assert_eq!(state.target().reverted, vec![AbilityKind::SpeedBoost]);

        state.advance(10.0);
        assert_eq!(state.target().reverted.len(), 1);
        assert!(state.is_ready(AbilityKind::SpeedBoost));
    }

    #[test]
    fn test_instant_abilities_never_revert() {
        let mut state = AbilityState::new(Recorder::default());
        state.activate(AbilityKind::HighJump).unwrap();
        assert!(!state.is_active(AbilityKind::HighJump));

        state.advance(6.0);
        assert!(state.target().reverted.is_empty());
        assert_eq!(state.cooldown(AbilityKind::HighJump), 0.0);
    }

    #[test]
    fn test_avatar_effects() {
        let mut state = AbilityState::new(Avatar::default());
        state.activate(AbilityKind::SpeedBoost).unwrap();
        state.activate(AbilityKind::Invisibility).unwrap();
        state.activate(AbilityKind::HighJump).unwrap();
        state.activate(AbilityKind::Shield).unwrap();

        let avatar = state.target();
        assert_approx_eq!(avatar.speed, BASE_SPEED * 2.0);
        assert_approx_eq!(avatar.opacity, 0.2);
        assert_approx_eq!(avatar.vertical_velocity, JUMP_IMPULSE);
        assert!(avatar.shielded);

        state.advance(8.0);
        let avatar = state.target();
        assert_approx_eq!(avatar.speed, BASE_SPEED);
        assert_approx_eq!(avatar.opacity, 1.0);
        assert!(!avatar.shielded);
    }
}
