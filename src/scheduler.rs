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

//! Walks materialized events against a clock.
//!
//! The scheduler keeps a forward cursor into the instantaneous events and the set of loops it
//! has started. Each update fires every instantaneous event the clock has reached and reconciles
//! the active loops with the loops whose interval contains the current time, so a clock that
//! jumps (seeks, or drifts backwards) converges on the right set of loops.

use std::collections::HashMap;
use std::mem;
use std::time::Duration;

use tracing::debug;

use crate::events::{DurationSoundEvent, LoopId, MaterializedEvents};
use crate::sounds::SoundBank;

/// How far through the instantaneous events the scheduler has got.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Position {
    /// Nothing has been fired yet.
    Start,
    /// Every event at or before this time has been fired.
    FiredThrough(Duration),
    /// Every event strictly before this time has been skipped.
    SeekedTo(Duration),
}

pub struct Scheduler {
    events: MaterializedEvents,
    /// Index of the next instantaneous event to fire.
    cursor: usize,
    position: Position,
    active: HashMap<LoopId, DurationSoundEvent>,
}

impl Scheduler {
    pub fn new(events: MaterializedEvents) -> Scheduler {
        Scheduler {
            events,
            cursor: 0,
            position: Position::Start,
            active: HashMap::new(),
        }
    }

    pub fn events(&self) -> &MaterializedEvents {
        &self.events
    }

    /// Index of the next instantaneous event to fire.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of loops currently started.
    pub fn active_loops(&self) -> usize {
        self.active.len()
    }

    /// Advances to `now`: fires every pending instantaneous event at or before `now`, stops
    /// loops that no longer contain `now` and starts loops that do.
    pub fn update(&mut self, now: Duration, bank: &SoundBank) {
        if let Position::FiredThrough(last) = self.position {
            if now < last {
                debug!(?now, ?last, "Transport clock moved backwards");
            }
        }

        while let Some(event) = self.events.instants.get(self.cursor) {
            if event.time > now {
                break;
            }
            bank.dispatch(event.sounds);
            self.cursor += 1;
        }
        self.position = Position::FiredThrough(now);

        self.active.retain(|loop_id, event| {
            if event.contains(now) {
                return true;
            }
            debug!(%loop_id, sound = %event.sound, "Stopping loop");
            bank.stop_loop(event.sound, *loop_id);
            false
        });

        let active = &mut self.active;
        self.events.durations.for_each_containing(now, |event| {
            if active.contains_key(&event.loop_id) {
                return;
            }
            let offset = now.saturating_sub(event.time);
            if bank.play_loop(event.sound, event.loop_id, offset) {
                debug!(loop_id = %event.loop_id, sound = %event.sound, ?offset, "Started loop");
                active.insert(event.loop_id, *event);
            }
        });
    }

    /// Moves the cursor to the first instantaneous event at or after `target` and stops every
    /// loop. Loops containing the target restart at the right offset on the next update.
    pub fn seek(&mut self, target: Duration, bank: &SoundBank) {
        self.stop_all_loops(bank);
        self.cursor = self
            .events
            .instants
            .partition_point(|event| event.time < target);
        self.position = Position::SeekedTo(target);
        debug!(?target, cursor = self.cursor, "Seeked");
    }

    /// Stops every loop this scheduler started.
    pub fn stop_all_loops(&mut self, bank: &SoundBank) {
        for (loop_id, event) in self.active.drain() {
            bank.stop_loop(event.sound, loop_id);
        }
    }

    /// Replaces the events being scheduled, stopping all active loops first. The cursor is
    /// placed so that nothing already fired fires again. Returns the previous events so their
    /// storage can be reused.
    pub fn install(&mut self, events: MaterializedEvents, bank: &SoundBank) -> MaterializedEvents {
        self.stop_all_loops(bank);
        let previous = mem::replace(&mut self.events, events);

        let instants = &self.events.instants;
        self.cursor = match self.position {
            Position::Start => 0,
            Position::FiredThrough(time) => instants.partition_point(|event| event.time <= time),
            Position::SeekedTo(time) => instants.partition_point(|event| event.time < time),
        };
        debug!(
            instants = instants.len(),
            durations = self.events.durations.len(),
            cursor = self.cursor,
            "Installed new events"
        );
        previous
    }
}
