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
use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Raises the priority of the calling thread. Failures are logged and otherwise ignored.
pub(super) fn configure_scheduler_thread_priority(priority: Option<u8>, realtime: bool) {
    let Some(priority) = priority else {
        return;
    };

    let value = match ThreadPriorityValue::try_from(priority.min(99)) {
        Ok(value) => value,
        Err(e) => {
            warn!(priority, err = ?e, "Invalid scheduler thread priority");
            return;
        }
    };

    let priority = ThreadPriority::Crossplatform(value);
    if let Err(e) = set_current_thread_priority(priority) {
        warn!(err = ?e, "Failed to raise scheduler thread priority");
    }

    #[cfg(unix)]
    if realtime {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        match set_thread_priority_and_policy(
            thread_native_id(),
            priority,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => info!("Enabled RT SCHED_FIFO for scheduler thread"),
            Err(e) => warn!(err = ?e, "Failed to set RT SCHED_FIFO for scheduler thread"),
        }
    }

    #[cfg(not(unix))]
    let _ = realtime;
}
