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

//! Sound events derived from a chart.
//!
//! A chart is materialized into two collections: instantaneous events, sorted by audio time and
//! walked with a forward cursor, and duration events (looping sounds), indexed by interval so
//! the scheduler can ask which loops should be sounding at any point in time.

mod category;
mod interval;
mod materializer;

use std::fmt;
use std::time::Duration;

pub use category::{SoundCategory, SoundSet};
pub use interval::IntervalIndex;
pub use materializer::{EventMaterializer, MaterializedEvents};

/// Identifies one instance of a looping sound within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopId(u64);

impl LoopId {
    pub fn new(id: u64) -> LoopId {
        LoopId(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One or more sounds that fire together at a single point in audio time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SoundEvent {
    pub time: Duration,
    pub sounds: SoundSet,
}

/// A looping sound that should be audible over `[time, end_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationSoundEvent {
    pub sound: SoundCategory,
    pub time: Duration,
    pub end_time: Duration,
    pub loop_id: LoopId,
}

impl DurationSoundEvent {
    /// Creates a duration event. Returns None if the interval is empty.
    pub fn new(
        sound: SoundCategory,
        time: Duration,
        end_time: Duration,
        loop_id: LoopId,
    ) -> Option<DurationSoundEvent> {
        (time < end_time).then_some(DurationSoundEvent {
            sound,
            time,
            end_time,
            loop_id,
        })
    }

    /// Whether the loop should be sounding at `now`.
    pub fn contains(&self, now: Duration) -> bool {
        self.time <= now && now < self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_event_rejects_empty_interval() {
        let at = Duration::from_secs(1);
        assert!(DurationSoundEvent::new(SoundCategory::BeamLoop, at, at, LoopId::new(1)).is_none());
        assert!(DurationSoundEvent::new(
            SoundCategory::BeamLoop,
            at,
            Duration::ZERO,
            LoopId::new(1)
        )
        .is_none());
    }

    #[test]
    fn test_duration_event_contains() {
        let event = DurationSoundEvent::new(
            SoundCategory::BeamLoop,
            Duration::from_secs(1),
            Duration::from_secs(2),
            LoopId::new(7),
        )
        .expect("valid interval");

        assert!(!event.contains(Duration::from_millis(999)));
        assert!(event.contains(Duration::from_secs(1)));
        assert!(event.contains(Duration::from_millis(1999)));
        assert!(!event.contains(Duration::from_secs(2)));
    }

    #[test]
    fn test_sound_events_order_by_time_first() {
        let early = SoundEvent {
            time: Duration::from_millis(10),
            sounds: SoundSet::only(SoundCategory::BeamEnd),
        };
        let late = SoundEvent {
            time: Duration::from_millis(20),
            sounds: SoundSet::only(SoundCategory::Tap),
        };
        assert!(early < late);
    }
}
