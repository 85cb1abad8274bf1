//! Saved teleport spots, bound to the number row

use shared::Vec3;

pub const SLOT_COUNT: usize = 10;

/// Slot for a digit key: `1`..`9` are slots 0..8 and `0` is the last slot.
pub fn slot_for_digit(digit: u8) -> Option<usize> {
    match digit {
        0 => Some(SLOT_COUNT - 1),
        1..=9 => Some(usize::from(digit) - 1),
        _ => None,
    }
}

#[derive(Debug, Default, Clone)]
pub struct TeleportSpots {
    slots: [Option<Vec3>; SLOT_COUNT],
}

impl TeleportSpots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `position` under the digit, replacing whatever was there
    pub fn save(&mut self, digit: u8, position: Vec3) -> bool {
        match slot_for_digit(digit) {
            Some(slot) => {
                self.slots[slot] = Some(position);
                true
            }
            None => false,
        }
    }

    pub fn recall(&self, digit: u8) -> Option<Vec3> {
        slot_for_digit(digit).and_then(|slot| self.slots[slot])
    }
}
