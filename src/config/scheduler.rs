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

use duration_string::DurationString;
use serde::Deserialize;

use super::ConfigError;

/// How long the scheduler thread blocks for commands while paused, unless configured.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(5);

/// A YAML representation of the scheduler thread configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Scheduler {
    /// How long to sleep between polls while playing. Unset means busy-polling.
    poll_interval: Option<String>,

    /// How long to block waiting for commands while paused (default: 5ms).
    idle_interval: Option<String>,

    /// Priority (0-99) requested for the scheduler thread. Unset leaves the OS default.
    thread_priority: Option<u8>,

    /// Whether to also request realtime (SCHED_FIFO) scheduling on unix (default: false).
    realtime: Option<bool>,
}

impl Scheduler {
    /// Returns the poll interval, or None to busy-poll.
    pub fn poll_interval(&self) -> Result<Option<Duration>, ConfigError> {
        self.poll_interval
            .as_ref()
            .map(|value| parse_duration("poll_interval", value))
            .transpose()
    }

    /// Returns the idle interval (default: 5ms)
    pub fn idle_interval(&self) -> Result<Duration, ConfigError> {
        match &self.idle_interval {
            Some(value) => parse_duration("idle_interval", value),
            None => Ok(DEFAULT_IDLE_INTERVAL),
        }
    }

    pub fn thread_priority(&self) -> Option<u8> {
        self.thread_priority
    }

    pub fn realtime(&self) -> bool {
        self.realtime.unwrap_or(false)
    }
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    DurationString::from_string(value.to_string())
        .map(Duration::from)
        .map_err(|e| ConfigError::InvalidDuration {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        })
}
