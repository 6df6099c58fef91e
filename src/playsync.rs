// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
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
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Represents the current cancel state.
#[derive(PartialEq)]
enum CancelState {
    Untouched,
    Cancelled,
}

/// A cancel handle is shared between whoever starts a long running operation (a scheduler
/// thread, a mixer voice, an output stream) and whoever may want to end it. The operation is
/// responsible for checking it.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<Mutex<CancelState>>,
    /// Wakes anyone blocked in `wait`.
    condvar: Arc<Condvar>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        CancelHandle::new()
    }
}

impl CancelHandle {
    /// Creates a new cancel handle.
    pub fn new() -> CancelHandle {
        CancelHandle {
            cancelled: Arc::new(Mutex::new(CancelState::Untouched)),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Returns true if the operation has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock() == CancelState::Cancelled
    }

    /// Blocks until the handle is cancelled.
    pub fn wait(&self) {
        let mut cancelled = self.cancelled.lock();
        while *cancelled == CancelState::Untouched {
            self.condvar.wait(&mut cancelled);
        }
    }

    /// Cancels the operation. Cancelling twice is a no-op.
    pub fn cancel(&self) {
        let mut cancel_state = self.cancelled.lock();
        if *cancel_state == CancelState::Untouched {
            *cancel_state = CancelState::Cancelled;
            self.condvar.notify_all();
        }
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::*;

    #[test]
    fn test_cancel_handle_cancelled() {
        let cancel_handle = CancelHandle::new();
        assert!(!cancel_handle.is_cancelled());

        let join = {
            let cancel_handle = cancel_handle.clone();
            thread::spawn(move || cancel_handle.wait())
        };

        cancel_handle.cancel();
        assert!(join.join().is_ok());
        assert!(cancel_handle.is_cancelled());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let cancel_handle = CancelHandle::new();
        cancel_handle.cancel();
        cancel_handle.cancel();
        assert!(cancel_handle.is_cancelled());

        // Already cancelled, so this returns immediately.
        cancel_handle.wait();
    }
}
