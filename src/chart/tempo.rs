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

//! Tempo and meter segments, and conversion between grid time and audio time.

use std::{fmt, time::Duration};

use tracing::{debug, warn};

use super::grid::{GridOffset, GridTime, RESOLUTION};

/// BPM used when a chart has no usable tempo.
pub const DEFAULT_BPM: f64 = 120.0;

/// A measure spans four quarter beats, so one measure lasts `240 / bpm` seconds.
const SECONDS_PER_MEASURE_AT_ONE_BPM: f64 = 240.0;

/// Time signature (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        TimeSignature {
            numerator,
            denominator,
        }
    }

    /// Get beats per measure
    pub fn beats_per_measure(&self) -> u32 {
        self.numerator
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// A constant tempo starting at `start` and lasting until the next segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoSegment {
    pub start: GridTime,
    pub bpm: f64,
}

impl TempoSegment {
    fn ticks_per_second(&self) -> f64 {
        self.bpm * f64::from(RESOLUTION) / SECONDS_PER_MEASURE_AT_ONE_BPM
    }

    /// Divides last so whole-tick spans at round tempos convert exactly.
    fn seconds_for_ticks(&self, ticks: u64) -> f64 {
        ticks as f64 * SECONDS_PER_MEASURE_AT_ONE_BPM / (self.bpm * f64::from(RESOLUTION))
    }
}

/// A constant time signature starting at `start` and lasting until the next segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterSegment {
    pub start: GridTime,
    pub time_signature: TimeSignature,
}

impl MeterSegment {
    /// The number of ticks in one beat of this meter. Returns None for degenerate meters
    /// (zero beats per measure, or more beats than ticks).
    pub fn beat_ticks(&self) -> Option<u32> {
        match self.time_signature.beats_per_measure() {
            0 => None,
            beats => Some(RESOLUTION / beats).filter(|ticks| *ticks > 0),
        }
    }
}

/// Piecewise-constant tempo and meter of a chart.
///
/// The first tempo segment and the first meter segment always start at grid zero, so every
/// grid time has an active segment of each kind.
#[derive(Debug, Clone)]
pub struct TempoMap {
    /// Tempo segments, sorted by start.
    tempos: Vec<TempoSegment>,
    /// Meter segments, sorted by start.
    meters: Vec<MeterSegment>,
}

impl Default for TempoMap {
    fn default() -> Self {
        TempoMap::new(DEFAULT_BPM, TimeSignature::new(4, 4))
    }
}

impl TempoMap {
    /// Creates a tempo map with a single tempo and meter starting at grid zero.
    pub fn new(initial_bpm: f64, initial_time_signature: TimeSignature) -> Self {
        let bpm = if valid_bpm(initial_bpm) {
            initial_bpm
        } else {
            warn!(bpm = initial_bpm, "Invalid initial BPM, using default");
            DEFAULT_BPM
        };

        TempoMap {
            tempos: vec![TempoSegment {
                start: GridTime::ZERO,
                bpm,
            }],
            meters: vec![MeterSegment {
                start: GridTime::ZERO,
                time_signature: initial_time_signature,
            }],
        }
    }

    /// Adds a tempo change. A change at the start of an existing segment replaces it.
    /// Returns false (and leaves the map untouched) if the BPM is not a positive finite number.
    pub fn add_tempo(&mut self, start: GridTime, bpm: f64) -> bool {
        if !valid_bpm(bpm) {
            warn!(%start, bpm, "Ignoring invalid tempo change");
            return false;
        }

        let segment = TempoSegment { start, bpm };
        let index = self.tempos.partition_point(|s| s.start < start);
        match self.tempos.get_mut(index) {
            Some(existing) if existing.start == start => *existing = segment,
            _ => self.tempos.insert(index, segment),
        }
        true
    }

    /// Adds a meter change. A change at the start of an existing segment replaces it.
    pub fn add_meter(&mut self, start: GridTime, time_signature: TimeSignature) {
        if time_signature.beats_per_measure() == 0 {
            warn!(%start, "Meter with zero beats per measure, no subdivisions will be generated");
        }
        debug!(%start, %time_signature, "Meter change");

        let segment = MeterSegment {
            start,
            time_signature,
        };
        let index = self.meters.partition_point(|s| s.start < start);
        match self.meters.get_mut(index) {
            Some(existing) if existing.start == start => *existing = segment,
            _ => self.meters.insert(index, segment),
        }
    }

    pub fn tempos(&self) -> &[TempoSegment] {
        &self.tempos
    }

    pub fn meters(&self) -> &[MeterSegment] {
        &self.meters
    }

    /// The tempo segment active at the given grid time.
    pub fn tempo_at(&self, grid: GridTime) -> TempoSegment {
        let index = self
            .tempos
            .partition_point(|s| s.start <= grid)
            .saturating_sub(1);
        self.tempos[index]
    }

    /// The meter segment active at the given grid time.
    pub fn meter_at(&self, grid: GridTime) -> MeterSegment {
        let index = self
            .meters
            .partition_point(|s| s.start <= grid)
            .saturating_sub(1);
        self.meters[index]
    }

    /// Converts a grid time to the audio time elapsed since grid zero, accumulating the length
    /// of every tempo segment passed on the way.
    pub fn grid_to_audio_time(&self, grid: GridTime) -> Duration {
        let mut seconds = 0.0;
        for (index, segment) in self.tempos.iter().enumerate() {
            if segment.start >= grid {
                break;
            }
            let end = self
                .tempos
                .get(index + 1)
                .map_or(grid, |next| next.start.min(grid));
            seconds += segment.seconds_for_ticks(end.ticks_since(segment.start));
        }

        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }

    /// Converts an audio time back to the nearest grid time.
    pub fn audio_time_to_grid(&self, time: Duration) -> GridTime {
        let target = time.as_secs_f64();
        let mut elapsed = 0.0;
        for (index, segment) in self.tempos.iter().enumerate() {
            if let Some(next) = self.tempos.get(index + 1) {
                let span = segment.seconds_for_ticks(next.start.ticks_since(segment.start));
                if target >= elapsed + span {
                    elapsed += span;
                    continue;
                }
            }

            let ticks = ((target - elapsed) * segment.ticks_per_second()).round() as i64;
            return segment.start + GridOffset::from_ticks(ticks);
        }

        GridTime::ZERO
    }
}

fn valid_bpm(bpm: f64) -> bool {
    bpm.is_finite() && bpm > 0.0
}
