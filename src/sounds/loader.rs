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

//! Sound loading and caching.
//!
//! Sounds are short, so they are decoded entirely into memory up front. Nothing is read from
//! disk once playback starts.

use std::collections::HashMap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

use super::SoundError;

/// A decoded sound. The sample data is shared between every voice playing it.
#[derive(Clone)]
pub struct LoadedSound {
    /// Interleaved f32 samples.
    data: Arc<Vec<f32>>,
    channel_count: u16,
    sample_rate: u32,
}

impl LoadedSound {
    /// Wraps already decoded interleaved samples.
    pub fn from_samples(samples: Vec<f32>, channel_count: u16, sample_rate: u32) -> LoadedSound {
        LoadedSound {
            data: Arc::new(samples),
            channel_count,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        match self.channel_count {
            0 => 0,
            channels => self.data.len() / usize::from(channels),
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / f64::from(self.sample_rate))
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl std::fmt::Debug for LoadedSound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedSound")
            .field("channel_count", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frame_count())
            .finish()
    }
}

/// Decodes sound files, resamples them to the output rate and caches the result by path.
pub struct SoundLoader {
    cache: HashMap<PathBuf, LoadedSound>,
    target_sample_rate: u32,
}

impl SoundLoader {
    /// Creates a new loader producing sounds at `target_sample_rate`.
    pub fn new(target_sample_rate: u32) -> SoundLoader {
        SoundLoader {
            cache: HashMap::new(),
            target_sample_rate,
        }
    }

    /// Loads a sound into memory, or returns the cached copy.
    pub fn load(&mut self, path: &Path) -> Result<LoadedSound, SoundError> {
        if let Some(sound) = self.cache.get(path) {
            debug!(path = ?path, "Using cached sound");
            return Ok(sound.clone());
        }

        let (samples, channel_count, source_rate) = decode(path)?;
        let samples = if source_rate != self.target_sample_rate {
            debug!(
                source_rate,
                target_rate = self.target_sample_rate,
                "Resampling sound"
            );
            resample_linear(&samples, channel_count, source_rate, self.target_sample_rate)
        } else {
            samples
        };

        let sound = LoadedSound::from_samples(samples, channel_count, self.target_sample_rate);
        info!(
            path = ?path,
            channels = channel_count,
            sample_rate = self.target_sample_rate,
            duration_ms = sound.duration().as_millis(),
            memory_kb = sound.memory_size() / 1024,
            "Sound loaded"
        );

        self.cache.insert(path.to_path_buf(), sound.clone());
        Ok(sound)
    }

    /// Returns the total memory used by cached sounds.
    pub fn total_memory_usage(&self) -> usize {
        self.cache.values().map(LoadedSound::memory_size).sum()
    }
}

impl std::fmt::Debug for SoundLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundLoader")
            .field("cached_sounds", &self.cache.len())
            .field("target_sample_rate", &self.target_sample_rate)
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Decodes the first audio track of a file into interleaved f32 samples.
/// Returns the samples, channel count and sample rate.
fn decode(path: &Path) -> Result<(Vec<f32>, u16, u32), SoundError> {
    let decode_error = |source: SymphoniaError| SoundError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| SoundError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_error)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SoundError::NoAudioTrack(path.to_path_buf()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| SoundError::UnknownSampleRate(path.to_path_buf()))?;
    let mut channel_count = params
        .channels
        .map(|channels| channels.count() as u16)
        .unwrap_or(0);
    let mut decoder = get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut samples = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(decode_error(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channel_count = spec.channels.count() as u16;
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(reason)) => {
                warn!(path = ?path, reason, "Skipping undecodable packet");
            }
            Err(e) => return Err(decode_error(e)),
        }
    }

    if channel_count == 0 {
        return Err(SoundError::NoAudioTrack(path.to_path_buf()));
    }
    Ok((samples, channel_count, sample_rate))
}

/// Resamples interleaved samples with linear interpolation.
fn resample_linear(
    samples: &[f32],
    channel_count: u16,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    let channels = usize::from(channel_count);
    if channels == 0 || source_rate == 0 || target_rate == 0 {
        return samples.to_vec();
    }

    let ratio = f64::from(target_rate) / f64::from(source_rate);
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let sample_at = |frame: usize, channel: usize| samples.get(frame * channels + channel).copied();

    (0..target_frames)
        .flat_map(|target_frame| {
            let position = target_frame as f64 / ratio;
            let frame = position.floor() as usize;
            let fraction = position.fract() as f32;
            (0..channels).map(move |channel| {
                let current = sample_at(frame, channel).unwrap_or(0.0);
                let next = sample_at(frame + 1, channel).unwrap_or(current);
                current + (next - current) * fraction
            })
        })
        .collect()
}
