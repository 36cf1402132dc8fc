//! The real-time driver's audio callback.
//!
//! Setup happens off the audio thread; the callback closure only ever calls
//! one narrow entry point, [`RealtimeEngine::process_block`], which runs a
//! fixed ten-step sequence per block.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rf_core::Vec3;
use rf_spatial::config::ElevationMode;
use rf_spatial::direction::{interpolate, sanitize_elevation, DirectionState};
use rf_spatial::layout::Layout;
use rf_spatial::panners::{Dbap, Panner};
use rf_spatial::remap::ChannelRemap;
use rf_spatial::robustness::{Robustness, RobustnessTally};
use rf_spatial::scene::{Keyframe, Scene};
use rf_spatial::lfe;

use crate::control::{one_pole_alpha, AtomicControls, SmoothedControls, PAUSE_FADE_SEC, SMOOTHING_TAU_SEC};
use crate::stats::EngineStats;
use crate::streaming::AudioSource;

struct EngineSource {
    id: String,
    keyframes: Vec<Keyframe>,
    is_lfe: bool,
    direction_state: DirectionState,
    last_pose: Vec3,
}

/// Linear pause-fade ramp state.
struct FadeState {
    envelope: f32,
    was_paused: bool,
    step: f32,
}

impl FadeState {
    fn new(sample_rate: u32) -> Self {
        Self {
            envelope: 1.0,
            was_paused: false,
            step: 1.0 / (PAUSE_FADE_SEC as f32 * sample_rate as f32).max(1.0),
        }
    }
}

/// Owns every audio-thread-owned structure the callback touches: the
/// render buffer, pose cache, fade envelope, and smoothed controls.
pub struct RealtimeEngine {
    layout: Layout,
    panner: Dbap,
    robustness: Robustness,
    tally: RobustnessTally,
    controls: Arc<AtomicControls>,
    smoothed: SmoothedControls,
    sources: Arc<HashMap<String, AudioSource>>,
    engine_sources: Vec<EngineSource>,
    remap: ChannelRemap,
    elevation_mode: ElevationMode,
    render_buffer: Vec<Vec<f32>>,
    speaker_scratch: Vec<f32>,
    mono_scratch: Vec<f32>,
    lfe_flat_scratch: Vec<f32>,
    device_buffer: Vec<Vec<f32>>,
    fade: FadeState,
    frame_counter: u64,
    sample_rate: u32,
    buffer_frames: usize,
    stats: Arc<EngineStats>,
    lfe_compensation: f32,
}

impl RealtimeEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        layout: Layout,
        scene: &Scene,
        sources: Arc<HashMap<String, AudioSource>>,
        controls: Arc<AtomicControls>,
        stats: Arc<EngineStats>,
        remap: ChannelRemap,
        elevation_mode: ElevationMode,
        sample_rate: u32,
        buffer_frames: usize,
        device_channels: usize,
        lfe_compensation: f32,
    ) -> Self {
        let mut panner = Dbap::new(1.0);
        panner.prepare(&layout);
        let num_speakers = layout.num_speakers();
        let output_channels = layout.output_channel_count;

        let engine_sources = scene
            .sources
            .values()
            .map(|s| EngineSource {
                id: s.id.clone(),
                keyframes: s.keyframes.clone(),
                is_lfe: s.is_lfe || s.id.eq_ignore_ascii_case("lfe"),
                direction_state: DirectionState::default(),
                last_pose: Vec3::front(),
            })
            .collect();

        Self {
            panner,
            robustness: Robustness::new(num_speakers),
            tally: RobustnessTally::default(),
            controls,
            smoothed: SmoothedControls::default(),
            sources,
            engine_sources,
            remap,
            elevation_mode,
            render_buffer: vec![vec![0.0; buffer_frames]; output_channels],
            speaker_scratch: vec![0.0; num_speakers * buffer_frames],
            mono_scratch: vec![0.0; buffer_frames],
            lfe_flat_scratch: vec![0.0; output_channels * buffer_frames],
            device_buffer: vec![vec![0.0; buffer_frames]; device_channels],
            fade: FadeState::new(sample_rate),
            frame_counter: 0,
            sample_rate,
            buffer_frames,
            stats,
            layout,
            lfe_compensation,
        }
    }

    pub fn tally(&self) -> RobustnessTally {
        self.tally
    }

    /// One callback invocation. `interleaved_out` must be
    /// exactly `buffer_frames * device_channels` samples.
    pub fn process_block(&mut self, interleaved_out: &mut [f32]) {
        let started = Instant::now();
        let device_channels = self.device_buffer.len();
        let n = self.buffer_frames;
        debug_assert_eq!(interleaved_out.len(), n * device_channels);

        // 1. Zero the device output.
        interleaved_out.fill(0.0);

        // 2. Snapshot controls.
        let snapshot = self.controls.snapshot();

        // 3. Smooth.
        let block_sec = n as f64 / self.sample_rate as f64;
        let alpha = one_pole_alpha(block_sec, SMOOTHING_TAU_SEC);
        self.smoothed.smooth_toward(&snapshot, alpha);
        self.panner.set_focus(self.smoothed.dbap_focus);

        // 4. Pause fade transition.
        if snapshot.paused != self.fade.was_paused {
            self.fade.was_paused = snapshot.paused;
        }
        let fading_out = snapshot.paused;
        if fading_out && self.fade.envelope <= 0.0 {
            // Fully faded out: outputs stay zero, frame counter does not advance.
            self.write_stats(started, block_sec);
            return;
        }

        // 5. Compute poses.
        let center_time = (self.frame_counter as f64 + n as f64 / 2.0) / self.sample_rate as f64;
        for source in self.engine_sources.iter_mut() {
            if source.is_lfe {
                continue;
            }
            let raw = interpolate(&source.keyframes, center_time, &mut source.direction_state, || {
                log::debug!("source '{}' fell back to last-good direction", source.id);
            });
            source.last_pose = sanitize_elevation(raw, &self.layout, self.elevation_mode);
        }

        // 6. Render.
        for ch in self.render_buffer.iter_mut() {
            ch.iter_mut().for_each(|s| *s = 0.0);
        }
        for i in 0..self.engine_sources.len() {
            let (is_lfe, id, pose) = {
                let s = &self.engine_sources[i];
                (s.is_lfe, s.id.clone(), s.last_pose)
            };
            let Some(audio) = self.sources.get(&id) else { continue };
            audio.get_block(self.frame_counter as usize, &mut self.mono_scratch);

            if is_lfe {
                flatten_into(&self.render_buffer, n, &mut self.lfe_flat_scratch);
                let mut warned = rf_core::WarnOnce::new();
                lfe::route_block(
                    &self.mono_scratch,
                    &self.layout,
                    self.smoothed.master_gain as f32,
                    self.lfe_compensation,
                    &mut self.lfe_flat_scratch,
                    &id,
                    &mut warned,
                );
                scatter_from(&mut self.render_buffer, n, &self.lfe_flat_scratch);
                continue;
            }

            for s in self.mono_scratch.iter_mut() {
                *s *= self.smoothed.master_gain as f32;
            }
            self.speaker_scratch.iter_mut().for_each(|s| *s = 0.0);
            self.robustness.pan_with_recovery(
                &self.panner,
                &self.layout,
                pose,
                &self.mono_scratch,
                &mut self.speaker_scratch,
                &mut self.tally,
            );
            for speaker in &self.layout.speakers {
                if speaker.device_channel >= self.render_buffer.len() {
                    continue;
                }
                let base = speaker.index * n;
                for k in 0..n {
                    self.render_buffer[speaker.device_channel][k] += self.speaker_scratch[base + k];
                }
            }
        }

        // 7. Mix trims.
        let sub_channels: std::collections::HashSet<usize> =
            self.layout.subwoofers.iter().map(|s| s.device_channel).collect();
        let unity_mix = (self.smoothed.loudspeaker_mix - 1.0).abs() < 1e-6
            && (self.smoothed.sub_mix - 1.0).abs() < 1e-6;
        if !unity_mix {
            for (ch_idx, channel) in self.render_buffer.iter_mut().enumerate() {
                let mix = if sub_channels.contains(&ch_idx) {
                    self.smoothed.sub_mix as f32
                } else {
                    self.smoothed.loudspeaker_mix as f32
                };
                for s in channel.iter_mut() {
                    *s *= mix;
                }
            }
        }

        // 8. Channel remap.
        for ch in self.device_buffer.iter_mut() {
            ch.iter_mut().for_each(|s| *s = 0.0);
        }
        if self.remap.is_identity || self.remap.entries.is_empty() {
            let copy_channels = self.render_buffer.len().min(self.device_buffer.len());
            for k in 0..copy_channels {
                for i in 0..n {
                    self.device_buffer[k][i] += self.render_buffer[k][i];
                }
            }
        } else {
            for entry in &self.remap.entries {
                if entry.layout_index >= self.render_buffer.len() || entry.device_index >= self.device_buffer.len() {
                    continue;
                }
                for i in 0..n {
                    self.device_buffer[entry.device_index][i] += self.render_buffer[entry.layout_index][i];
                }
            }
        }

        // 9. Pause-fade envelope application.
        let target = if snapshot.paused { 0.0 } else { 1.0 };
        for i in 0..n {
            if (self.fade.envelope - target).abs() > f32::EPSILON {
                if self.fade.envelope < target {
                    self.fade.envelope = (self.fade.envelope + self.fade.step).min(target);
                } else {
                    self.fade.envelope = (self.fade.envelope - self.fade.step).max(target);
                }
            }
            let env = self.fade.envelope;
            if env != 1.0 {
                for channel in self.device_buffer.iter_mut() {
                    channel[i] *= env;
                }
            }
        }

        // Interleave into the device-owned buffer.
        for i in 0..n {
            for c in 0..device_channels {
                interleaved_out[i * device_channels + c] = self.device_buffer[c][i];
            }
        }

        // 10. Update state.
        self.frame_counter += n as u64;
        self.write_stats(started, block_sec);
    }

    fn write_stats(&self, started: Instant, block_sec: f64) {
        let playback_time = self.frame_counter as f64 / self.sample_rate as f64;
        let cpu_load = if block_sec > 0.0 {
            (started.elapsed().as_secs_f64() / block_sec).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.stats.set_frame_counter(self.frame_counter);
        self.stats.set_playback_time_sec(playback_time);
        self.stats.set_cpu_load(cpu_load);
    }
}

/// Copies `channels` into `flat`, which must already be sized
/// `channels.len() * n`. Never allocates — callers own a persistent buffer.
fn flatten_into(channels: &[Vec<f32>], n: usize, flat: &mut [f32]) {
    for (c, channel) in channels.iter().enumerate() {
        flat[c * n..c * n + n].copy_from_slice(&channel[..n]);
    }
}

fn scatter_from(channels: &mut [Vec<f32>], n: usize, flat: &[f32]) {
    for (c, channel) in channels.iter_mut().enumerate() {
        channel[..n].copy_from_slice(&flat[c * n..c * n + n]);
    }
}
