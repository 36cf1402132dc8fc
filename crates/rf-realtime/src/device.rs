//! cpal output device wiring.
//!
//! Negotiate a supported output config, build an output stream around a
//! boxed callback. Output-only, since the real-time driver never reads an
//! input device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, Device, SampleFormat, Stream, StreamConfig};

use crate::error::{RealtimeError, RealtimeResult};

/// Per-invocation output callback: receives an interleaved `f32` buffer
/// sized `frames * channels`.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

pub fn default_output_device() -> RealtimeResult<Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| RealtimeError::Device("no default output device".into()))
}

/// Negotiate an `f32` output config with at least `channels` channels and
/// exactly `sample_rate`.
pub fn negotiate_output_config(
    device: &Device,
    channels: u16,
    sample_rate: u32,
) -> RealtimeResult<StreamConfig> {
    let target_rate: cpal::SampleRate = sample_rate;
    let configs = device
        .supported_output_configs()
        .map_err(|e| RealtimeError::Device(e.to_string()))?;

    for supported in configs {
        if supported.channels() >= channels
            && supported.min_sample_rate() <= target_rate
            && supported.max_sample_rate() >= target_rate
            && supported.sample_format() == SampleFormat::F32
        {
            return Ok(StreamConfig {
                channels: supported.channels(),
                sample_rate: target_rate,
                buffer_size: CpalBufferSize::Default,
            });
        }
    }

    Err(RealtimeError::Device(format!(
        "no matching output config for {channels} channels @ {sample_rate}Hz"
    )))
}

/// Build and return a started output [`Stream`]. The stream must be kept
/// alive by the caller for audio to keep playing.
pub fn build_output_stream(
    device: &Device,
    config: &StreamConfig,
    buffer_frames: u32,
    mut callback: OutputCallback,
) -> RealtimeResult<Stream> {
    let mut config = config.clone();
    config.buffer_size = CpalBufferSize::Fixed(buffer_frames);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                callback(data);
            },
            |err| log::error!("output stream error: {err}"),
            None,
        )
        .map_err(|e| RealtimeError::StreamBuild(e.to_string()))?;

    stream.play().map_err(|e| RealtimeError::Stream(e.to_string()))?;
    Ok(stream)
}
