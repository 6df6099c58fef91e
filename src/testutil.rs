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
use std::{
    fs::File,
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;

use crate::transport::Transport;

/// Wait for the given predicate to return true or fail.
pub fn eventually<F>(predicate: F, error_msg: &str)
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    let tick = Duration::from_millis(2);
    let timeout = Duration::from_secs(3);

    loop {
        if predicate() {
            return;
        }
        if start.elapsed() > timeout {
            panic!("{}", error_msg);
        }
        thread::sleep(tick);
    }
}

/// A transport whose clock only moves when told to.
#[derive(Default)]
pub struct ManualTransport {
    time: Mutex<Duration>,
    playing: AtomicBool,
}

impl ManualTransport {
    pub fn new() -> ManualTransport {
        ManualTransport::default()
    }

    pub fn set_time(&self, time: Duration) {
        *self.time.lock() = time;
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }
}

impl Transport for ManualTransport {
    fn current_time(&self) -> Duration {
        *self.time.lock()
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }
}

/// Writes interleaved 16 bit samples to a wav file.
pub fn write_wav(
    path: &Path,
    channels: u16,
    sample_rate: u32,
    samples: &[i16],
) -> Result<(), hound::Error> {
    let mut writer = WavWriter::new(
        File::create(path)?,
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )?;
    for sample in samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()
}
