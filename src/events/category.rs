// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::fmt;
use std::ops::BitOr;

use serde::Deserialize;

/// A category of sound effect. Each category maps to at most one loaded clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCategory {
    Tap,
    CriticalTap,
    Bell,
    WallTap,
    CriticalWallTap,
    Bullet,
    Flick,
    CriticalFlick,
    HoldEnd,
    HoldTick,
    ClickSe,
    BeamPrepare,
    BeamLoop,
    BeamEnd,
}

impl SoundCategory {
    /// Every category, in dispatch order.
    pub const ALL: [SoundCategory; 14] = [
        SoundCategory::Tap,
        SoundCategory::CriticalTap,
        SoundCategory::Bell,
        SoundCategory::WallTap,
        SoundCategory::CriticalWallTap,
        SoundCategory::Bullet,
        SoundCategory::Flick,
        SoundCategory::CriticalFlick,
        SoundCategory::HoldEnd,
        SoundCategory::HoldTick,
        SoundCategory::ClickSe,
        SoundCategory::BeamPrepare,
        SoundCategory::BeamLoop,
        SoundCategory::BeamEnd,
    ];

    /// The name used in configuration files and volume panels.
    pub fn name(&self) -> &'static str {
        match self {
            SoundCategory::Tap => "tap",
            SoundCategory::CriticalTap => "critical_tap",
            SoundCategory::Bell => "bell",
            SoundCategory::WallTap => "wall_tap",
            SoundCategory::CriticalWallTap => "critical_wall_tap",
            SoundCategory::Bullet => "bullet",
            SoundCategory::Flick => "flick",
            SoundCategory::CriticalFlick => "critical_flick",
            SoundCategory::HoldEnd => "hold_end",
            SoundCategory::HoldTick => "hold_tick",
            SoundCategory::ClickSe => "click_se",
            SoundCategory::BeamPrepare => "beam_prepare",
            SoundCategory::BeamLoop => "beam_loop",
            SoundCategory::BeamEnd => "beam_end",
        }
    }

    /// The file loaded for this category from a sound folder.
    pub fn file_name(&self) -> &'static str {
        match self {
            SoundCategory::Tap => "tap.wav",
            SoundCategory::CriticalTap => "extap.wav",
            SoundCategory::Bell => "bell.wav",
            SoundCategory::WallTap => "wall.wav",
            SoundCategory::CriticalWallTap => "exwall.wav",
            SoundCategory::Bullet => "bullet.wav",
            SoundCategory::Flick => "flick.wav",
            SoundCategory::CriticalFlick => "exflick.wav",
            SoundCategory::HoldEnd => "holdend.wav",
            SoundCategory::HoldTick => "holdtick.wav",
            SoundCategory::ClickSe => "clickse.wav",
            SoundCategory::BeamPrepare => "beamprepare.wav",
            SoundCategory::BeamLoop => "beamlooping.wav",
            SoundCategory::BeamEnd => "beamend.wav",
        }
    }

    fn bit(&self) -> u16 {
        1 << (*self as u16)
    }
}

impl fmt::Display for SoundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of sound categories.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SoundSet(u16);

impl SoundSet {
    pub const EMPTY: SoundSet = SoundSet(0);
    pub const ALL: SoundSet = SoundSet((1 << SoundCategory::ALL.len()) - 1);

    /// A set holding a single category.
    pub fn only(category: SoundCategory) -> SoundSet {
        SoundSet(category.bit())
    }

    pub fn from_bits(bits: u16) -> SoundSet {
        SoundSet(bits & SoundSet::ALL.0)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn contains(&self, category: SoundCategory) -> bool {
        self.0 & category.bit() != 0
    }

    pub fn insert(&mut self, category: SoundCategory) {
        self.0 |= category.bit();
    }

    pub fn remove(&mut self, category: SoundCategory) {
        self.0 &= !category.bit();
    }

    pub fn union(&self, other: SoundSet) -> SoundSet {
        SoundSet(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates over the members in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = SoundCategory> + '_ {
        SoundCategory::ALL
            .into_iter()
            .filter(move |category| self.contains(*category))
    }
}

impl From<SoundCategory> for SoundSet {
    fn from(category: SoundCategory) -> Self {
        SoundSet::only(category)
    }
}

impl FromIterator<SoundCategory> for SoundSet {
    fn from_iter<I: IntoIterator<Item = SoundCategory>>(iter: I) -> Self {
        let mut set = SoundSet::EMPTY;
        for category in iter {
            set.insert(category);
        }
        set
    }
}

impl BitOr for SoundSet {
    type Output = SoundSet;

    fn bitor(self, rhs: SoundSet) -> SoundSet {
        self.union(rhs)
    }
}

impl fmt::Debug for SoundSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_membership() {
        let mut set = SoundSet::only(SoundCategory::Tap) | SoundSet::only(SoundCategory::Bell);
        assert!(set.contains(SoundCategory::Tap));
        assert!(set.contains(SoundCategory::Bell));
        assert!(!set.contains(SoundCategory::Flick));
        assert_eq!(set.len(), 2);

        set.remove(SoundCategory::Tap);
        assert!(!set.contains(SoundCategory::Tap));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_iter_follows_dispatch_order() {
        let set: SoundSet = [
            SoundCategory::BeamEnd,
            SoundCategory::Bell,
            SoundCategory::Tap,
        ]
        .into_iter()
        .collect();

        let members: Vec<SoundCategory> = set.iter().collect();
        assert_eq!(
            members,
            vec![
                SoundCategory::Tap,
                SoundCategory::Bell,
                SoundCategory::BeamEnd
            ]
        );
    }

    #[test]
    fn test_all_contains_every_category() {
        assert_eq!(SoundSet::ALL.len(), SoundCategory::ALL.len());
        assert!(SoundCategory::ALL
            .iter()
            .all(|category| SoundSet::ALL.contains(*category)));
        assert_eq!(SoundSet::from_bits(u16::MAX), SoundSet::ALL);
    }

    #[test]
    fn test_file_names() {
        assert_eq!(SoundCategory::CriticalTap.file_name(), "extap.wav");
        assert_eq!(SoundCategory::BeamLoop.file_name(), "beamlooping.wav");
    }
}
