//! Transport/meter state exposed from the audio thread to the main thread.
//!
//! Same bit-pattern-atomic technique as [`crate::control::AtomicControls`].

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct EngineStats {
    frame_counter: AtomicU64,
    playback_time_sec: AtomicU64,
    cpu_load: AtomicU64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_frame_counter(&self, v: u64) {
        self.frame_counter.store(v, Ordering::Relaxed);
    }
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    pub fn set_playback_time_sec(&self, v: f64) {
        self.playback_time_sec.store(v.to_bits(), Ordering::Relaxed);
    }
    pub fn playback_time_sec(&self) -> f64 {
        f64::from_bits(self.playback_time_sec.load(Ordering::Relaxed))
    }

    pub fn set_cpu_load(&self, v: f64) {
        self.cpu_load.store(v.to_bits(), Ordering::Relaxed);
    }
    pub fn cpu_load(&self) -> f64 {
        f64::from_bits(self.cpu_load.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_reads_back_every_field() {
        let stats = EngineStats::new();
        stats.set_frame_counter(512);
        stats.set_playback_time_sec(1.5);
        stats.set_cpu_load(0.2);
        assert_eq!(stats.frame_counter(), 512);
        assert!((stats.playback_time_sec() - 1.5).abs() < 1e-12);
        assert!((stats.cpu_load() - 0.2).abs() < 1e-12);
    }
}
