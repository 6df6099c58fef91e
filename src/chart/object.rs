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
use std::mem::{discriminant, Discriminant};
use std::time::Duration;

use super::grid::GridTime;

/// How long before a beam starts its preparation cue sounds.
pub const BEAM_LEAD_IN: Duration = Duration::from_millis(1000);

/// The kinds of timeline objects the sound core knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Tap {
        critical: bool,
    },
    WallTap {
        critical: bool,
    },
    /// A hold note. `end` is the grid time of its hold end, if it has one yet.
    Hold {
        critical: bool,
        end: Option<GridTime>,
    },
    HoldEnd,
    Bell,
    Bullet,
    Flick {
        critical: bool,
    },
    /// An explicitly placed click sound.
    ClickSe,
    /// The start of a beam. `max` is the furthest grid time the beam reaches.
    BeamStart {
        max: GridTime,
    },
    /// Any displayable object that makes no sound (lane points, comments and the like).
    Marker,
}

/// A displayable chart object positioned on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineObject {
    pub grid: GridTime,
    pub kind: ObjectKind,
}

impl TimelineObject {
    pub fn new(grid: GridTime, kind: ObjectKind) -> TimelineObject {
        TimelineObject { grid, kind }
    }

    /// Identifies the object's kind regardless of its payload, so a critical and a normal tap
    /// are the same kind.
    pub fn kind_id(&self) -> Discriminant<ObjectKind> {
        discriminant(&self.kind)
    }
}
