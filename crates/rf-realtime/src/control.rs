//! Lock-free control surface for the real-time engine.
//!
//! Plain atomics written from the UI/main thread and read (and smoothed) on
//! the audio thread. f64 values ride `AtomicU64` bit patterns since stable
//! Rust has no native float atomics.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// One-pole smoothing time constant.
pub const SMOOTHING_TAU_SEC: f64 = 0.05;

/// Linear ramp duration for the pause fade.
pub const PAUSE_FADE_SEC: f64 = 0.008;

/// User-facing control fields, shared between the main thread (writer) and
/// the audio thread (reader). Relaxed ordering throughout: a one-block lag
/// between a UI edit and its audible effect is acceptable.
pub struct AtomicControls {
    master_gain: AtomicU64,
    dbap_focus: AtomicU64,
    loudspeaker_mix: AtomicU64,
    sub_mix: AtomicU64,
    auto_comp: AtomicBool,
    paused: AtomicBool,
}

impl AtomicControls {
    pub fn new() -> Self {
        Self {
            master_gain: AtomicU64::new(0.5f64.to_bits()),
            dbap_focus: AtomicU64::new(1.0f64.to_bits()),
            loudspeaker_mix: AtomicU64::new(1.0f64.to_bits()),
            sub_mix: AtomicU64::new(1.0f64.to_bits()),
            auto_comp: AtomicBool::new(false),
            paused: AtomicBool::new(false),
        }
    }

    pub fn set_master_gain(&self, v: f64) {
        self.master_gain.store(v.to_bits(), Ordering::Relaxed);
    }
    pub fn set_dbap_focus(&self, v: f64) {
        self.dbap_focus.store(v.to_bits(), Ordering::Relaxed);
    }
    pub fn set_loudspeaker_mix(&self, v: f64) {
        self.loudspeaker_mix.store(v.to_bits(), Ordering::Relaxed);
    }
    pub fn set_sub_mix(&self, v: f64) {
        self.sub_mix.store(v.to_bits(), Ordering::Relaxed);
    }
    pub fn set_auto_comp(&self, v: bool) {
        self.auto_comp.store(v, Ordering::Relaxed);
    }
    pub fn set_paused(&self, v: bool) {
        self.paused.store(v, Ordering::Relaxed);
    }
    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Step 2: snapshot every control atomic once per callback.
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            master_gain: f64::from_bits(self.master_gain.load(Ordering::Relaxed)),
            dbap_focus: f64::from_bits(self.dbap_focus.load(Ordering::Relaxed)),
            loudspeaker_mix: f64::from_bits(self.loudspeaker_mix.load(Ordering::Relaxed)),
            sub_mix: f64::from_bits(self.sub_mix.load(Ordering::Relaxed)),
            auto_comp: self.auto_comp.load(Ordering::Relaxed),
            paused: self.paused.load(Ordering::Relaxed),
        }
    }
}

impl Default for AtomicControls {
    fn default() -> Self {
        Self::new()
    }
}

/// One callback's immutable view of the controls.
#[derive(Debug, Clone, Copy)]
pub struct ControlSnapshot {
    pub master_gain: f64,
    pub dbap_focus: f64,
    pub loudspeaker_mix: f64,
    pub sub_mix: f64,
    pub auto_comp: bool,
    pub paused: bool,
}

/// Audio-thread-owned smoothed values, persisted block to block.
#[derive(Debug, Clone, Copy)]
pub struct SmoothedControls {
    pub master_gain: f64,
    pub dbap_focus: f64,
    pub loudspeaker_mix: f64,
    pub sub_mix: f64,
}

impl Default for SmoothedControls {
    fn default() -> Self {
        Self {
            master_gain: 0.5,
            dbap_focus: 1.0,
            loudspeaker_mix: 1.0,
            sub_mix: 1.0,
        }
    }
}

impl SmoothedControls {
    /// One-pole exponential smoothing toward `target`.
    pub fn smooth_toward(&mut self, target: &ControlSnapshot, alpha: f64) {
        self.master_gain += alpha * (target.master_gain - self.master_gain);
        self.dbap_focus += alpha * (target.dbap_focus - self.dbap_focus);
        self.loudspeaker_mix += alpha * (target.loudspeaker_mix - self.loudspeaker_mix);
        self.sub_mix += alpha * (target.sub_mix - self.sub_mix);
    }
}

/// α = 1 − exp(−blockSec/τ).
pub fn one_pole_alpha(block_sec: f64, tau_sec: f64) -> f64 {
    1.0 - (-block_sec / tau_sec).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_stored_values() {
        let controls = AtomicControls::new();
        controls.set_master_gain(0.75);
        controls.set_paused(true);
        let snap = controls.snapshot();
        assert!((snap.master_gain - 0.75).abs() < 1e-12);
        assert!(snap.paused);
    }

    #[test]
    fn smoothing_converges_toward_target_without_overshoot() {
        let mut smoothed = SmoothedControls { master_gain: 0.0, ..SmoothedControls::default() };
        let target = ControlSnapshot {
            master_gain: 1.0,
            dbap_focus: 1.0,
            loudspeaker_mix: 1.0,
            sub_mix: 1.0,
            auto_comp: false,
            paused: false,
        };
        let alpha = one_pole_alpha(0.01, SMOOTHING_TAU_SEC);
        let mut prev = smoothed.master_gain;
        for _ in 0..50 {
            smoothed.smooth_toward(&target, alpha);
            assert!(smoothed.master_gain >= prev);
            assert!(smoothed.master_gain <= 1.0);
            prev = smoothed.master_gain;
        }
        assert!(smoothed.master_gain > 0.5);
    }

    #[test]
    fn alpha_is_zero_for_zero_block_duration() {
        assert_eq!(one_pole_alpha(0.0, SMOOTHING_TAU_SEC), 0.0);
    }
}
