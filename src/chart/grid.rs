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
use std::ops::Add;

/// Number of grid ticks in a single measure.
pub const RESOLUTION: u32 = 1920;

/// A chart-native time coordinate: a measure index plus a tick within that measure.
///
/// Grid times are always normalized so that `tick < RESOLUTION`, which makes the derived
/// ordering (measure first, then tick) a total order over chart time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GridTime {
    measure: u32,
    tick: u32,
}

impl GridTime {
    pub const ZERO: GridTime = GridTime {
        measure: 0,
        tick: 0,
    };

    /// Creates a grid time, carrying overflowing ticks into the measure.
    pub fn new(measure: u32, tick: u32) -> GridTime {
        GridTime::from_total_ticks(u64::from(measure) * u64::from(RESOLUTION) + u64::from(tick))
    }

    /// Creates a grid time from an absolute tick count. Saturates at the largest representable
    /// grid time.
    pub fn from_total_ticks(total: u64) -> GridTime {
        let resolution = u64::from(RESOLUTION);
        let measure = total / resolution;
        if measure > u64::from(u32::MAX) {
            return GridTime {
                measure: u32::MAX,
                tick: RESOLUTION - 1,
            };
        }

        GridTime {
            measure: measure as u32,
            tick: (total % resolution) as u32,
        }
    }

    /// The measure index.
    pub fn measure(&self) -> u32 {
        self.measure
    }

    /// The tick within the measure.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// The absolute tick count from grid zero.
    pub fn total_ticks(&self) -> u64 {
        u64::from(self.measure) * u64::from(RESOLUTION) + u64::from(self.tick)
    }

    /// Ticks elapsed since `earlier`, or zero if `earlier` is not actually earlier.
    pub fn ticks_since(&self, earlier: GridTime) -> u64 {
        self.total_ticks().saturating_sub(earlier.total_ticks())
    }
}

impl fmt::Display for GridTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.measure, self.tick)
    }
}

/// A signed distance on the grid, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GridOffset {
    ticks: i64,
}

impl GridOffset {
    /// Creates an offset of whole measures plus ticks.
    pub fn new(measures: i32, ticks: i64) -> GridOffset {
        GridOffset {
            ticks: i64::from(measures)
                .saturating_mul(i64::from(RESOLUTION))
                .saturating_add(ticks),
        }
    }

    /// Creates an offset of the given number of ticks.
    pub fn from_ticks(ticks: i64) -> GridOffset {
        GridOffset { ticks }
    }

    pub fn ticks(&self) -> i64 {
        self.ticks
    }
}

/// Adding an offset saturates at grid zero instead of wrapping.
impl Add<GridOffset> for GridTime {
    type Output = GridTime;

    fn add(self, offset: GridOffset) -> GridTime {
        let total = self.total_ticks();
        let total = if offset.ticks >= 0 {
            total.saturating_add(offset.ticks as u64)
        } else {
            total.saturating_sub(offset.ticks.unsigned_abs())
        };
        GridTime::from_total_ticks(total)
    }
}
