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

//! The chart as seen by the sound core.
//!
//! This module provides:
//! - Grid coordinates and offsets
//! - Tempo/meter segments with grid <-> audio time conversion
//! - Displayable timeline objects
//!
//! The sound core only ever reads a chart. Editing, parsing and rendering live elsewhere.

mod grid;
mod object;
mod tempo;

pub use grid::{GridOffset, GridTime, RESOLUTION};
pub use object::{ObjectKind, TimelineObject, BEAM_LEAD_IN};
pub use tempo::{MeterSegment, TempoMap, TempoSegment, TimeSignature, DEFAULT_BPM};

/// A chart: its tempo map and the timeline objects currently displayable in the editor.
#[derive(Debug, Clone, Default)]
pub struct Chart {
    tempo_map: TempoMap,
    objects: Vec<TimelineObject>,
}

impl Chart {
    /// Creates an empty chart with the given tempo map.
    pub fn new(tempo_map: TempoMap) -> Chart {
        Chart {
            tempo_map,
            objects: Vec::new(),
        }
    }

    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }

    pub fn tempo_map_mut(&mut self) -> &mut TempoMap {
        &mut self.tempo_map
    }

    /// Adds an object at the given grid time.
    pub fn add(&mut self, grid: GridTime, kind: ObjectKind) -> &mut Chart {
        self.objects.push(TimelineObject::new(grid, kind));
        self
    }

    /// Enumerates displayable objects in insertion order. The order is stable between calls.
    pub fn displayable_objects(&self) -> impl Iterator<Item = &TimelineObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_keeps_insertion_order() {
        let mut chart = Chart::default();
        chart
            .add(GridTime::new(2, 0), ObjectKind::Bell)
            .add(GridTime::new(1, 0), ObjectKind::Bullet);

        let kinds: Vec<ObjectKind> = chart.displayable_objects().map(|o| o.kind).collect();
        assert_eq!(kinds, vec![ObjectKind::Bell, ObjectKind::Bullet]);
        assert_eq!(chart.len(), 2);
        assert!(!chart.is_empty());
    }
}
