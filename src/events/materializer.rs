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
use std::collections::BTreeMap;
use std::iter;

use tracing::debug;

use super::{DurationSoundEvent, IntervalIndex, LoopId, SoundCategory, SoundEvent, SoundSet};
use crate::chart::{
    Chart, GridOffset, GridTime, ObjectKind, TempoMap, TimelineObject, BEAM_LEAD_IN,
};

/// The result of materializing a chart.
#[derive(Default)]
pub struct MaterializedEvents {
    /// Instantaneous events sorted by time, without duplicates.
    pub(crate) instants: Vec<SoundEvent>,
    /// Looping events indexed by their active interval.
    pub(crate) durations: IntervalIndex<DurationSoundEvent>,
}

impl MaterializedEvents {
    pub fn new() -> MaterializedEvents {
        MaterializedEvents::default()
    }

    pub fn instants(&self) -> &[SoundEvent] {
        &self.instants
    }

    pub fn durations(&self) -> &IntervalIndex<DurationSoundEvent> {
        &self.durations
    }

    pub fn is_empty(&self) -> bool {
        self.instants.is_empty() && self.durations.is_empty()
    }

    fn clear(&mut self) {
        self.instants.clear();
        self.durations.clear();
    }
}

/// Turns chart objects into sound events.
///
/// A materializer owns the loop id sequence for one playback session: ids keep increasing
/// across rebuilds and restart only when a new materializer is created.
pub struct EventMaterializer {
    next_loop_id: u64,
    pending_loops: Vec<DurationSoundEvent>,
}

impl Default for EventMaterializer {
    fn default() -> Self {
        EventMaterializer::new()
    }
}

impl EventMaterializer {
    pub fn new() -> EventMaterializer {
        EventMaterializer {
            next_loop_id: 1,
            pending_loops: Vec::new(),
        }
    }

    /// Materializes a chart into freshly allocated storage.
    pub fn materialize(&mut self, chart: &Chart) -> MaterializedEvents {
        let mut events = MaterializedEvents::new();
        self.rebuild(chart, &mut events);
        events
    }

    /// Materializes a chart into `events`, replacing whatever it held while keeping its storage.
    pub fn rebuild(&mut self, chart: &Chart, events: &mut MaterializedEvents) {
        events.clear();
        self.pending_loops.clear();

        let tempo_map = chart.tempo_map();
        push_default_clicks(tempo_map, &mut events.instants);

        // Only the first object of each kind at a grid time makes sound.
        let mut groups: BTreeMap<GridTime, Vec<&TimelineObject>> = BTreeMap::new();
        for object in chart.displayable_objects() {
            let group = groups.entry(object.grid).or_default();
            if group.iter().all(|kept| kept.kind_id() != object.kind_id()) {
                group.push(object);
            }
        }

        for (grid, group) in &groups {
            let sounds: SoundSet = group
                .iter()
                .filter_map(|object| category_of(object.kind))
                .collect();
            if !sounds.is_empty() {
                events.instants.push(SoundEvent {
                    time: tempo_map.grid_to_audio_time(*grid),
                    sounds,
                });
            }

            for object in group {
                match object.kind {
                    ObjectKind::Hold { end: Some(end), .. } => {
                        push_hold_ticks(tempo_map, *grid, end, &mut events.instants)
                    }
                    ObjectKind::BeamStart { max } => {
                        self.push_beam(tempo_map, *grid, max, &mut events.instants)
                    }
                    _ => {}
                }
            }
        }

        events.instants.sort_unstable();
        events.instants.dedup();
        events.durations.rebuild(
            self.pending_loops
                .drain(..)
                .map(|event| (event.time, event.end_time, event)),
        );

        debug!(
            objects = chart.len(),
            instants = events.instants.len(),
            durations = events.durations.len(),
            "Materialized sound events"
        );
    }

    fn allocate_loop_id(&mut self) -> LoopId {
        let id = LoopId::new(self.next_loop_id);
        self.next_loop_id += 1;
        id
    }

    /// A beam sounds a preparation cue ahead of its start, loops while it is active and sounds
    /// an end cue at its furthest extent.
    fn push_beam(
        &mut self,
        tempo_map: &TempoMap,
        start: GridTime,
        max: GridTime,
        instants: &mut Vec<SoundEvent>,
    ) {
        let loop_id = self.allocate_loop_id();
        let start_time = tempo_map.grid_to_audio_time(start);
        let end_time = tempo_map.grid_to_audio_time(max);

        instants.push(SoundEvent {
            time: end_time,
            sounds: SoundSet::only(SoundCategory::BeamEnd),
        });

        match DurationSoundEvent::new(SoundCategory::BeamLoop, start_time, end_time, loop_id) {
            Some(event) => self.pending_loops.push(event),
            None => debug!(%start, %max, "Skipping beam loop with no length"),
        }

        // Snapped to the grid so the cue lands on the same tick the editor would display.
        let prepare_grid = tempo_map.audio_time_to_grid(start_time.saturating_sub(BEAM_LEAD_IN));
        instants.push(SoundEvent {
            time: tempo_map.grid_to_audio_time(prepare_grid),
            sounds: SoundSet::only(SoundCategory::BeamPrepare),
        });
    }
}

/// The one-shot category an object sounds when reached, if any.
fn category_of(kind: ObjectKind) -> Option<SoundCategory> {
    match kind {
        ObjectKind::Tap { critical } | ObjectKind::Hold { critical, .. } => Some(if critical {
            SoundCategory::CriticalTap
        } else {
            SoundCategory::Tap
        }),
        ObjectKind::WallTap { critical } => Some(if critical {
            SoundCategory::CriticalWallTap
        } else {
            SoundCategory::WallTap
        }),
        ObjectKind::Flick { critical } => Some(if critical {
            SoundCategory::CriticalFlick
        } else {
            SoundCategory::Flick
        }),
        ObjectKind::Bell => Some(SoundCategory::Bell),
        ObjectKind::Bullet => Some(SoundCategory::Bullet),
        ObjectKind::HoldEnd => Some(SoundCategory::HoldEnd),
        ObjectKind::ClickSe => Some(SoundCategory::ClickSe),
        ObjectKind::BeamStart { .. } | ObjectKind::Marker => None,
    }
}

/// Grid times one beat apart, strictly after `start` and strictly before `end`, using the
/// meter active at `start`. Degenerate meters yield nothing.
fn beats_between(
    tempo_map: &TempoMap,
    start: GridTime,
    end: GridTime,
) -> impl Iterator<Item = GridTime> {
    let step = tempo_map
        .meter_at(start)
        .beat_ticks()
        .map(|ticks| GridOffset::from_ticks(i64::from(ticks)));

    iter::successors(step.map(|step| start + step), move |grid| {
        step.map(|step| *grid + step)
    })
    .take_while(move |grid| *grid < end)
}

/// Metronome clicks on every beat of the first measure after its downbeat.
fn push_default_clicks(tempo_map: &TempoMap, instants: &mut Vec<SoundEvent>) {
    instants.extend(
        beats_between(tempo_map, GridTime::ZERO, GridTime::new(1, 0)).map(|grid| SoundEvent {
            time: tempo_map.grid_to_audio_time(grid),
            sounds: SoundSet::only(SoundCategory::ClickSe),
        }),
    );
}

fn push_hold_ticks(
    tempo_map: &TempoMap,
    start: GridTime,
    end: GridTime,
    instants: &mut Vec<SoundEvent>,
) {
    instants.extend(
        beats_between(tempo_map, start, end).map(|grid| SoundEvent {
            time: tempo_map.grid_to_audio_time(grid),
            sounds: SoundSet::only(SoundCategory::HoldTick),
        }),
    );
}
