//! Offline render driver.
//!
//! A single-threaded staged render loop: block by block, interpolate each
//! source's direction, pan it through the layout, and accumulate into the
//! device output channels.

use std::collections::HashMap;
use std::path::Path;

use rf_core::WarnOnce;
use rf_spatial::config::{ElevationMode, RenderResolution};
use rf_spatial::direction::{interpolate, sanitize_elevation, DirectionState};
use rf_spatial::layout::Layout;
use rf_spatial::panners::{self, Panner};
use rf_spatial::robustness::{Robustness, RobustnessTally};
use rf_spatial::scene::Scene;
use rf_spatial::stats::StatsAccumulator;
use rf_spatial::{lfe, RenderConfig, RenderStats};

use crate::audio_source::{load_mono_sources, SourceAudio};
use crate::diagnostics::{BlockStatsRow, DiagnosticsWriter};
use crate::error::OfflineResult;

/// The finished render: one `Vec<f32>` per device output channel.
pub struct MultichannelBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

/// Render `scene` through `layout` per `config`, reading per-source mono
/// files from `sources_dir`.
pub fn render(
    scene: &Scene,
    layout: &Layout,
    config: &RenderConfig,
    sources_dir: &Path,
) -> OfflineResult<(MultichannelBuffer, RenderStats)> {
    let sample_rate = scene.sample_rate_hz;
    let (t0, t1) = resolve_time_window(scene, config);
    let start_frame = (t0 * sample_rate as f64).round().max(0.0) as usize;
    let end_frame = (t1 * sample_rate as f64).round().max(start_frame as f64) as usize;
    let num_frames = end_frame - start_frame;

    let mut warned = WarnOnce::new();
    let source_ids: Vec<String> = scene.sources.keys().cloned().collect();
    let loaded = load_mono_sources(sources_dir, source_ids, sample_rate, &mut warned);

    let num_speakers = layout.num_speakers();
    let output_channels = layout.output_channel_count;

    let panner = panners::build(config, layout);
    let mut robustness = Robustness::new(num_speakers);
    let mut tally = RobustnessTally::default();

    let mut device_output = vec![vec![0.0f32; num_frames]; output_channels];
    let mut direction_states: HashMap<String, DirectionState> = HashMap::new();

    let block_size = config.block_size.max(1);
    let mut block_index = 0usize;

    let mut diagnostics = match &config.debug_dir {
        Some(dir) => Some(DiagnosticsWriter::create(dir)?),
        None => None,
    };

    let mut offset = 0usize;
    while offset < num_frames {
        let block_len = block_size.min(num_frames - offset);
        let global_start = start_frame + offset;

        render_block(
            scene,
            layout,
            config,
            panner.as_ref(),
            &mut robustness,
            &loaded,
            &mut direction_states,
            &mut warned,
            &mut tally,
            global_start,
            block_len,
            sample_rate,
            &mut device_output,
            offset,
        );

        if let Some(writer) = diagnostics.as_mut() {
            let row = summarize_block(&device_output, offset, block_len, global_start, sample_rate, block_index);
            writer.write_block(row)?;
        }

        offset += block_len;
        block_index += 1;
    }

    sanitize_nonfinite(&mut device_output);

    let mut stats_acc = StatsAccumulator::new(output_channels);
    for (c, channel) in device_output.iter().enumerate() {
        stats_acc.observe_channel_block(c, channel);
    }
    stats_acc.robustness = tally;
    let stats = stats_acc.finish();

    if let (Some(writer), Some(dir)) = (diagnostics.take(), &config.debug_dir) {
        writer.finish(dir, &stats)?;
    }

    Ok((
        MultichannelBuffer { sample_rate, channels: device_output },
        stats,
    ))
}

/// Summarize the just-written slice `[offset, offset+block_len)` of every
/// device channel for one `block_stats.log` row.
fn summarize_block(
    device_output: &[Vec<f32>],
    offset: usize,
    block_len: usize,
    global_start: usize,
    sample_rate: u32,
    block_index: usize,
) -> BlockStatsRow {
    let mut peak = 0.0f32;
    let mut nonfinite_count = 0usize;
    let mut active_speakers = 0usize;

    for channel in device_output {
        let mut channel_active = false;
        for &sample in &channel[offset..offset + block_len] {
            if !sample.is_finite() {
                nonfinite_count += 1;
                continue;
            }
            let abs = sample.abs();
            if abs > peak {
                peak = abs;
            }
            if abs > 1e-6 {
                channel_active = true;
            }
        }
        if channel_active {
            active_speakers += 1;
        }
    }

    BlockStatsRow {
        block: block_index,
        time_sec: global_start as f64 / sample_rate as f64,
        peak,
        nonfinite_count,
        active_speakers,
    }
}

fn resolve_time_window(scene: &Scene, config: &RenderConfig) -> (f64, f64) {
    let (raw_t0, raw_t1) = config.time_window.unwrap_or((0.0, scene.duration_sec));
    let t0 = raw_t0.clamp(0.0, scene.duration_sec);
    let t1 = raw_t1.clamp(t0, scene.duration_sec);
    (t0, t1)
}

#[allow(clippy::too_many_arguments)]
fn render_block(
    scene: &Scene,
    layout: &Layout,
    config: &RenderConfig,
    panner: &dyn Panner,
    robustness: &mut Robustness,
    loaded: &HashMap<String, SourceAudio>,
    direction_states: &mut HashMap<String, DirectionState>,
    warned: &mut WarnOnce<String>,
    tally: &mut RobustnessTally,
    global_start: usize,
    block_len: usize,
    sample_rate: u32,
    device_output: &mut [Vec<f32>],
    write_offset: usize,
) {
    let num_speakers = layout.num_speakers();
    let mut mono_block = vec![0.0f32; block_len];
    let mut speaker_output = vec![0.0f32; num_speakers * block_len];

    for (id, source) in &scene.sources {
        if let Some(solo) = &config.solo_source {
            if solo != id {
                continue;
            }
        }

        mono_block.iter_mut().for_each(|s| *s = 0.0);
        if let Some(audio) = loaded.get(id) {
            audio.read_block(global_start, &mut mono_block);
        }

        if scene.is_lfe_source(id) {
            let mut flat = flatten_device_slice(device_output, write_offset, block_len);
            lfe::route_block(&mono_block, layout, config.master_gain, config.lfe_compensation, &mut flat, id, warned);
            scatter_back(device_output, write_offset, block_len, &flat);
            continue;
        }

        let center_time = representative_time(config, global_start, block_len, sample_rate);
        let state = direction_states.entry(id.clone()).or_default();
        let raw_dir = interpolate(&source.keyframes, center_time, state, || {
            log::debug!("source '{id}' fell back to last-good direction");
        });
        let effective_mode = if config.force_2d {
            ElevationMode::Clamp
        } else {
            config.elevation_mode
        };
        let direction = sanitize_elevation(raw_dir, layout, effective_mode);

        speaker_output.iter_mut().for_each(|s| *s = 0.0);

        let needs_substep = if block_len >= 2 {
            let t25 = time_at_fraction(global_start, block_len, sample_rate, 0.25);
            let t75 = time_at_fraction(global_start, block_len, sample_rate, 0.75);
            let mut s25 = *state;
            let mut s75 = *state;
            let d25 = interpolate(&source.keyframes, t25, &mut s25, || {});
            let d75 = interpolate(&source.keyframes, t75, &mut s75, || {});
            Robustness::needs_substepping(d25, d75)
        } else {
            false
        };

        if needs_substep {
            tally.sub_stepped_blocks += 1;
            let sub_len = Robustness::substep_len();
            let mut sub_offset = 0usize;
            while sub_offset < block_len {
                let len = sub_len.min(block_len - sub_offset);
                let sub_center = representative_time(
                    config,
                    global_start + sub_offset,
                    len,
                    sample_rate,
                );
                let sub_raw = interpolate(&source.keyframes, sub_center, state, || {});
                let sub_dir = sanitize_elevation(sub_raw, layout, effective_mode);
                let input_slice = &mono_block[sub_offset..sub_offset + len];
                let mut sub_output = vec![0.0f32; num_speakers * len];
                robustness.pan_with_recovery(panner, layout, sub_dir, input_slice, &mut sub_output, tally);
                for s in 0..num_speakers {
                    for i in 0..len {
                        speaker_output[s * block_len + sub_offset + i] += sub_output[s * len + i];
                    }
                }
                sub_offset += len;
            }
        } else {
            robustness.pan_with_recovery(panner, layout, direction, &mono_block, &mut speaker_output, tally);
        }

        for speaker in &layout.speakers {
            let base = speaker.index * block_len;
            let device_channel = speaker.device_channel;
            if device_channel >= device_output.len() {
                continue;
            }
            for i in 0..block_len {
                device_output[device_channel][write_offset + i] +=
                    speaker_output[base + i] * config.master_gain;
            }
        }
    }
}

fn representative_time(config: &RenderConfig, global_start: usize, block_len: usize, sample_rate: u32) -> f64 {
    match config.render_resolution {
        RenderResolution::Block => (global_start as f64 + block_len as f64 / 2.0) / sample_rate as f64,
        RenderResolution::Sample => global_start as f64 / sample_rate as f64,
    }
}

fn time_at_fraction(global_start: usize, block_len: usize, sample_rate: u32, frac: f64) -> f64 {
    (global_start as f64 + block_len as f64 * frac) / sample_rate as f64
}

fn flatten_device_slice(device_output: &[Vec<f32>], offset: usize, len: usize) -> Vec<f32> {
    let mut flat = vec![0.0f32; device_output.len() * len];
    for (c, channel) in device_output.iter().enumerate() {
        flat[c * len..c * len + len].copy_from_slice(&channel[offset..offset + len]);
    }
    flat
}

fn scatter_back(device_output: &mut [Vec<f32>], offset: usize, len: usize, flat: &[f32]) {
    for (c, channel) in device_output.iter_mut().enumerate() {
        channel[offset..offset + len].copy_from_slice(&flat[c * len..c * len + len]);
    }
}

fn sanitize_nonfinite(device_output: &mut [Vec<f32>]) {
    for channel in device_output.iter_mut() {
        for sample in channel.iter_mut() {
            if !sample.is_finite() {
                *sample = 0.0;
            }
        }
    }
}
