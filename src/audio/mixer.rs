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
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::playsync::CancelHandle;
use crate::sounds::LoadedSound;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// A gain shared between a sound and every voice playing it, so volume changes apply to voices
/// that are already sounding.
#[derive(Clone, Debug)]
pub struct Volume(Arc<AtomicU32>);

impl Volume {
    pub fn new(volume: f32) -> Volume {
        Volume(Arc::new(AtomicU32::new(clamp_volume(volume).to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Sets the gain. Negative and non-finite values are treated as silence.
    pub fn set(&self, volume: f32) {
        self.0
            .store(clamp_volume(volume).to_bits(), Ordering::Relaxed);
    }
}

impl Default for Volume {
    fn default() -> Self {
        Volume::new(1.0)
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.max(0.0)
    } else {
        0.0
    }
}

/// A sound being rendered by the mixer.
struct Voice {
    id: u64,
    sound: LoadedSound,
    /// Next frame to render.
    position: usize,
    looping: bool,
    volume: Volume,
    cancel_handle: CancelHandle,
}

impl Voice {
    /// Mixes this voice into `output`. Returns false once the voice is done.
    fn render(&mut self, output: &mut [f32], output_channels: usize) -> bool {
        let source_channels = usize::from(self.sound.channel_count());
        let frame_count = self.sound.frame_count();
        if source_channels == 0 || frame_count == 0 {
            return false;
        }

        let samples = self.sound.samples();
        let gain = self.volume.get();
        for frame in output.chunks_exact_mut(output_channels) {
            if self.position >= frame_count {
                if !self.looping {
                    return false;
                }
                self.position = 0;
            }

            let start = self.position * source_channels;
            // Mono is spread to every output channel; extra source channels wrap around.
            for (channel, out) in frame.iter_mut().enumerate() {
                *out += samples[start + channel % source_channels] * gain;
            }
            self.position += 1;
        }

        self.looping || self.position < frame_count
    }
}

/// Mixes in-memory sounds into interleaved output buffers.
pub struct Mixer {
    voices: Mutex<Vec<Voice>>,
    channel_count: u16,
    sample_rate: u32,
}

impl Mixer {
    /// Creates a new mixer.
    pub fn new(channel_count: u16, sample_rate: u32) -> Mixer {
        Mixer {
            voices: Mutex::new(Vec::new()),
            channel_count: channel_count.max(1),
            sample_rate,
        }
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Starts a voice for `sound` at `start_frame`. The returned handle stops the voice when
    /// cancelled.
    pub fn play(
        &self,
        sound: &LoadedSound,
        volume: &Volume,
        looping: bool,
        start_frame: usize,
    ) -> CancelHandle {
        let cancel_handle = CancelHandle::new();
        let voice = Voice {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::Relaxed),
            sound: sound.clone(),
            position: start_frame,
            looping,
            volume: volume.clone(),
            cancel_handle: cancel_handle.clone(),
        };
        debug!(voice = voice.id, looping, start_frame, "Starting voice");
        self.voices.lock().push(voice);
        cancel_handle
    }

    /// Renders the next `output.len() / channel_count` frames, replacing the buffer contents.
    pub fn process_into(&self, output: &mut [f32]) {
        output.fill(0.0);
        let channels = usize::from(self.channel_count);

        self.voices.lock().retain_mut(|voice| {
            if voice.cancel_handle.is_cancelled() {
                debug!(voice = voice.id, "Voice stopped");
                return false;
            }
            voice.render(output, channels)
        });
    }

    /// Number of voices still sounding.
    pub fn active_voices(&self) -> usize {
        self.voices.lock().len()
    }

    /// Stops every voice.
    pub fn stop_all(&self) {
        for voice in self.voices.lock().drain(..) {
            voice.cancel_handle.cancel();
        }
    }
}
