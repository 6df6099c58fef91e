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
use std::time::Duration;

use parking_lot::Mutex;

use super::SoundPlayer;
use crate::events::LoopId;

/// A call made to a recording player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Call {
    Once,
    Loop(LoopId, Duration),
    Stop(LoopId),
}

/// A sound player that records what it was asked to do.
pub struct RecordingPlayer {
    calls: Mutex<Vec<Call>>,
    volume: Mutex<f32>,
}

impl RecordingPlayer {
    pub fn new() -> RecordingPlayer {
        RecordingPlayer {
            calls: Mutex::new(Vec::new()),
            volume: Mutex::new(1.0),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl SoundPlayer for RecordingPlayer {
    fn play_once(&self) {
        self.calls.lock().push(Call::Once);
    }

    fn play_loop(&self, loop_id: LoopId, offset: Duration) -> bool {
        self.calls.lock().push(Call::Loop(loop_id, offset));
        true
    }

    fn stop_loop(&self, loop_id: LoopId) {
        self.calls.lock().push(Call::Stop(loop_id));
    }

    fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock() = volume;
    }
}
