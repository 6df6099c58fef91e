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
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use super::{LoadedSound, SoundPlayer};
use crate::audio::{Mixer, Volume};
use crate::events::LoopId;
use crate::playsync::CancelHandle;

/// A loaded sound played through the mixer. Any number of one-shots may overlap, and each
/// loop id owns at most one looping voice.
pub struct MixerSound {
    sound: LoadedSound,
    mixer: Arc<Mixer>,
    volume: Volume,
    loops: Mutex<HashMap<LoopId, CancelHandle>>,
}

impl MixerSound {
    pub fn new(sound: LoadedSound, mixer: Arc<Mixer>) -> MixerSound {
        MixerSound {
            sound,
            mixer,
            volume: Volume::default(),
            loops: Mutex::new(HashMap::new()),
        }
    }

    /// The frame `offset` into the sound, wrapped to its length.
    fn loop_start_frame(&self, offset: Duration) -> usize {
        let frames = self.sound.frame_count();
        if frames == 0 {
            return 0;
        }
        let frame = (offset.as_secs_f64() * f64::from(self.sound.sample_rate())) as usize;
        frame % frames
    }
}

impl SoundPlayer for MixerSound {
    fn play_once(&self) {
        self.mixer.play(&self.sound, &self.volume, false, 0);
    }

    fn play_loop(&self, loop_id: LoopId, offset: Duration) -> bool {
        if self.sound.frame_count() == 0 {
            return false;
        }

        let handle = self
            .mixer
            .play(&self.sound, &self.volume, true, self.loop_start_frame(offset));
        if let Some(previous) = self.loops.lock().insert(loop_id, handle) {
            debug!(%loop_id, "Loop restarted, stopping previous voice");
            previous.cancel();
        }
        true
    }

    fn stop_loop(&self, loop_id: LoopId) {
        if let Some(handle) = self.loops.lock().remove(&loop_id) {
            handle.cancel();
        }
    }

    fn volume(&self) -> f32 {
        self.volume.get()
    }

    fn set_volume(&self, volume: f32) {
        self.volume.set(volume);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looping_sound(mixer: &Arc<Mixer>) -> MixerSound {
        // One second of a ramp at 1 kHz.
        let samples = (0..1000).map(|i| i as f32 / 1000.0).collect();
        MixerSound::new(LoadedSound::from_samples(samples, 1, 1000), mixer.clone())
    }

    #[test]
    fn test_loop_starts_at_wrapped_offset() {
        let mixer = Arc::new(Mixer::new(1, 1000));
        let sound = looping_sound(&mixer);

        assert_eq!(sound.loop_start_frame(Duration::from_millis(250)), 250);
        assert_eq!(sound.loop_start_frame(Duration::from_millis(2250)), 250);

        assert!(sound.play_loop(LoopId::new(1), Duration::from_millis(1500)));
        let mut output = vec![0.0; 1];
        mixer.process_into(&mut output);
        assert_eq!(output[0], 0.5);
    }

    #[test]
    fn test_stop_loop_only_stops_its_own_voice() {
        let mixer = Arc::new(Mixer::new(1, 1000));
        let sound = looping_sound(&mixer);

        assert!(sound.play_loop(LoopId::new(1), Duration::ZERO));
        assert!(sound.play_loop(LoopId::new(2), Duration::ZERO));
        assert_eq!(mixer.active_voices(), 2);

        sound.stop_loop(LoopId::new(1));
        // Cancelled voices are dropped on the next render.
        mixer.process_into(&mut [0.0; 4]);
        assert_eq!(mixer.active_voices(), 1);

        sound.stop_loop(LoopId::new(2));
        sound.stop_loop(LoopId::new(2));
        mixer.process_into(&mut [0.0; 4]);
        assert_eq!(mixer.active_voices(), 0);
    }

    #[test]
    fn test_restarting_a_loop_replaces_its_voice() {
        let mixer = Arc::new(Mixer::new(1, 1000));
        let sound = looping_sound(&mixer);

        sound.play_loop(LoopId::new(1), Duration::ZERO);
        sound.play_loop(LoopId::new(1), Duration::ZERO);
        mixer.process_into(&mut [0.0; 4]);
        assert_eq!(mixer.active_voices(), 1);
    }

    #[test]
    fn test_empty_sound_cannot_loop() {
        let mixer = Arc::new(Mixer::new(1, 1000));
        let sound = MixerSound::new(LoadedSound::from_samples(Vec::new(), 1, 1000), mixer);
        assert!(!sound.play_loop(LoopId::new(1), Duration::ZERO));
    }
}
