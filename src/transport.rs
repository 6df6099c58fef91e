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
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// The audio clock the scheduler follows. Usually this is the editor's music player.
pub trait Transport: Send + Sync {
    /// The current playback position.
    fn current_time(&self) -> Duration;

    /// Whether the clock is currently advancing.
    fn is_playing(&self) -> bool;
}

struct ClockState {
    /// Position accumulated up to `started`.
    base: Duration,
    /// When the clock last started running, if it is running.
    started: Option<Instant>,
}

impl ClockState {
    fn position(&self) -> Duration {
        match self.started {
            Some(started) => self.base + started.elapsed(),
            None => self.base,
        }
    }
}

/// A transport driven by the monotonic clock, for when there is no music to follow.
pub struct ClockTransport {
    state: Mutex<ClockState>,
}

impl Default for ClockTransport {
    fn default() -> Self {
        ClockTransport::new()
    }
}

impl ClockTransport {
    /// Creates a paused clock at zero.
    pub fn new() -> ClockTransport {
        ClockTransport {
            state: Mutex::new(ClockState {
                base: Duration::ZERO,
                started: None,
            }),
        }
    }

    pub fn play(&self) {
        let mut state = self.state.lock();
        if state.started.is_none() {
            state.started = Some(Instant::now());
        }
    }

    pub fn pause(&self) {
        let mut state = self.state.lock();
        state.base = state.position();
        state.started = None;
    }

    /// Moves the clock to `time` without changing whether it is running.
    pub fn seek(&self, time: Duration) {
        let mut state = self.state.lock();
        state.base = time;
        if state.started.is_some() {
            state.started = Some(Instant::now());
        }
    }
}

impl Transport for ClockTransport {
    fn current_time(&self) -> Duration {
        self.state.lock().position()
    }

    fn is_playing(&self) -> bool {
        self.state.lock().started.is_some()
    }
}
