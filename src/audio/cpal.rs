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
    error::Error,
    fmt,
    sync::Arc,
    thread::{self, JoinHandle},
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use super::Mixer;
use crate::config;
use crate::playsync::CancelHandle;

/// An output device known to cpal.
pub struct DeviceInfo {
    name: String,
    host_id: cpal::HostId,
    max_channels: u16,
}

impl DeviceInfo {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// Lists the output devices of every available host.
pub fn list_devices() -> Result<Vec<DeviceInfo>, Box<dyn Error>> {
    let mut devices = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            let Ok(output_configs) = device.supported_output_configs() else {
                continue;
            };
            let max_channels = output_configs
                .map(|config| config.channels())
                .max()
                .unwrap_or(0);
            if max_channels == 0 {
                continue;
            }

            devices.push(DeviceInfo {
                name: device_name(&device)?,
                host_id,
                max_channels,
            });
        }
    }

    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

#[allow(deprecated)]
fn device_name(device: &cpal::Device) -> Result<String, Box<dyn Error>> {
    Ok(device.name()?)
}

/// Finds the configured device, or the default host's default output.
fn find_device(name: Option<&str>) -> Result<cpal::Device, Box<dyn Error>> {
    let Some(name) = name else {
        return cpal::default_host()
            .default_output_device()
            .ok_or_else(|| "no default output device".into());
    };

    for host_id in cpal::available_hosts() {
        let Ok(host_devices) = cpal::host_from_id(host_id)?.output_devices() else {
            continue;
        };
        for device in host_devices {
            if device_name(&device).is_ok_and(|device_name| device_name.trim() == name) {
                return Ok(device);
            }
        }
    }
    Err(format!("no device found with name {}", name).into())
}

/// A running output stream pulling from a mixer. The stream lives on its own thread until this
/// is dropped.
pub struct Output {
    mixer: Arc<Mixer>,
    cancel_handle: CancelHandle,
    thread: Option<JoinHandle<()>>,
}

impl Output {
    /// Opens the configured device and starts streaming the mixer to it.
    pub fn start(config: &config::Audio) -> Result<Output, Box<dyn Error>> {
        let device = find_device(config.device())?;
        let sample_format = device.default_output_config()?.sample_format();
        let mixer = Arc::new(Mixer::new(config.channels(), config.sample_rate()));
        let stream_config = cpal::StreamConfig {
            channels: mixer.channel_count(),
            sample_rate: mixer.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };
        info!(
            device = %device_name(&device).unwrap_or_default(),
            channels = stream_config.channels,
            sample_rate = mixer.sample_rate(),
            ?sample_format,
            "Starting audio output"
        );

        let cancel_handle = CancelHandle::new();
        let (started_tx, started_rx) = crossbeam_channel::bounded(1);
        let thread = {
            let mixer = mixer.clone();
            let cancel_handle = cancel_handle.clone();
            thread::Builder::new()
                .name("fumen-sound-output".to_string())
                .spawn(move || {
                    let span = span!(Level::INFO, "audio output");
                    let _enter = span.enter();

                    // cpal streams are not Send, so the stream is created and kept on this thread.
                    let stream = match build_stream(&device, &stream_config, sample_format, mixer)
                        .and_then(|stream| {
                            stream.play()?;
                            Ok(stream)
                        }) {
                        Ok(stream) => stream,
                        Err(e) => {
                            let _ = started_tx.send(Err(e.to_string()));
                            return;
                        }
                    };
                    let _ = started_tx.send(Ok(()));
                    info!("Audio output started");

                    cancel_handle.wait();
                    drop(stream);
                    info!("Audio output stopped");
                })?
        };

        started_rx.recv()??;
        Ok(Output {
            mixer,
            cancel_handle,
            thread: Some(thread),
        })
    }

    pub fn mixer(&self) -> &Arc<Mixer> {
        &self.mixer
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        self.mixer.stop_all();
        self.cancel_handle.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Audio output thread panicked");
            }
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    mixer: Arc<Mixer>,
) -> Result<cpal::Stream, Box<dyn Error>> {
    match sample_format {
        cpal::SampleFormat::F32 => build_typed_stream::<f32>(device, config, mixer),
        cpal::SampleFormat::I16 => build_typed_stream::<i16>(device, config, mixer),
        cpal::SampleFormat::I32 => build_typed_stream::<i32>(device, config, mixer),
        cpal::SampleFormat::U16 => build_typed_stream::<u16>(device, config, mixer),
        other => Err(format!("unsupported sample format {}", other).into()),
    }
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: Arc<Mixer>,
) -> Result<cpal::Stream, Box<dyn Error>>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    Ok(device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(data.len(), 0.0);
            mixer.process_into(&mut scratch);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample(src);
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )?)
}
