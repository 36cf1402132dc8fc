//! Streaming subsystem: double-buffered, lock-free source audio for the
//! real-time driver.
//!
//! Atomics gate producer/consumer access instead of a lock: the audio
//! thread reads through shared references while a background loader fills
//! the next chunk, coordinated by an Empty/Loading/Ready/Playing state
//! machine per slot.
//!
//! The loader below reads chunks out of a fully-decoded in-memory signal
//! rather than seeking a file handle per chunk — `hound` has no cheap
//! arbitrary-frame seek, and the state machine/threading contract this
//! component exists to exercise doesn't depend on where the bytes came
//! from. Noted in DESIGN.md.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

/// Default chunk length: 5 seconds @ 48 kHz.
pub const DEFAULT_CHUNK_FRAMES: usize = 240_000;

/// Loader thread poll period.
pub const LOADER_POLL_MS: u64 = 2;

/// Fraction of the active buffer's valid frames that must be consumed
/// before the loader refills the other slot.
pub const REFILL_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BufferState {
    Empty = 0,
    Loading = 1,
    Ready = 2,
    Playing = 3,
}

impl BufferState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Empty,
            1 => Self::Loading,
            2 => Self::Ready,
            _ => Self::Playing,
        }
    }
}

/// One double-buffer slot. `data`/`chunk_start_frame`/`valid_frames` are
/// gated by `state`: the loader may write them only while transitioning
/// Empty -> Loading -> Ready; the audio thread may read them only while the
/// slot is Playing. The `state` acquire/release pair is what makes that
/// handoff safe across threads.
struct ChunkSlot {
    data: UnsafeCell<Vec<f32>>,
    chunk_start_frame: AtomicUsize,
    valid_frames: AtomicUsize,
    state: AtomicU8,
}

// SAFETY: access to `data` is serialized by the `state` state machine, never
// by true concurrent read+write — see the field doc above.
unsafe impl Sync for ChunkSlot {}

impl ChunkSlot {
    fn new(capacity: usize) -> Self {
        Self {
            data: UnsafeCell::new(vec![0.0; capacity]),
            chunk_start_frame: AtomicUsize::new(0),
            valid_frames: AtomicUsize::new(0),
            state: AtomicU8::new(BufferState::Empty as u8),
        }
    }

    fn state(&self) -> BufferState {
        BufferState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, s: BufferState) {
        self.state.store(s as u8, Ordering::Release);
    }

    /// SAFETY: caller must hold the writer side of the state machine
    /// (loader, while this slot is Empty/Loading).
    unsafe fn data_mut(&self) -> &mut Vec<f32> {
        &mut *self.data.get()
    }

    /// SAFETY: caller must hold the reader side (audio thread, while this
    /// slot is Playing).
    unsafe fn data_ref(&self) -> &Vec<f32> {
        &*self.data.get()
    }
}

/// One source's double-buffered decoded signal.
pub struct AudioSource {
    pub id: String,
    samples: Arc<Vec<f32>>,
    chunk_frames: usize,
    slots: [ChunkSlot; 2],
    /// Index of the slot the audio thread currently considers active
    /// (Ready or Playing). Audio-thread-owned.
    active: AtomicUsize,
    /// Frames consumed from the active slot so far. Audio-thread-owned;
    /// read (not written) by the loader.
    consumed_frames: AtomicUsize,
}

impl AudioSource {
    pub fn new(id: impl Into<String>, samples: Vec<f32>, chunk_frames: usize) -> Self {
        let chunk_frames = chunk_frames.max(1);
        Self {
            id: id.into(),
            samples: Arc::new(samples),
            chunk_frames,
            slots: [ChunkSlot::new(chunk_frames), ChunkSlot::new(chunk_frames)],
            active: AtomicUsize::new(0),
            consumed_frames: AtomicUsize::new(0),
        }
    }

    pub fn total_frames(&self) -> usize {
        self.samples.len()
    }

    /// Audio-thread read path. Never
    /// allocates or blocks; underrun (no data covering the request) yields
    /// zeros.
    pub fn get_block(&self, global_frame: usize, out: &mut [f32]) {
        let active_idx = self.active.load(Ordering::Relaxed);
        let active = &self.slots[active_idx];

        if active.state() == BufferState::Playing && self.covers(active, global_frame, out.len()) {
            self.copy_from(active, global_frame, out);
            self.consumed_frames.store(
                (global_frame + out.len()).saturating_sub(active.chunk_start_frame.load(Ordering::Relaxed)),
                Ordering::Relaxed,
            );
            return;
        }

        let other_idx = 1 - active_idx;
        let other = &self.slots[other_idx];
        if other.state() == BufferState::Ready && self.covers(other, global_frame, out.len()) {
            active.set_state(BufferState::Empty);
            other.set_state(BufferState::Playing);
            self.active.store(other_idx, Ordering::Relaxed);
            self.copy_from(other, global_frame, out);
            self.consumed_frames.store(
                (global_frame + out.len()).saturating_sub(other.chunk_start_frame.load(Ordering::Relaxed)),
                Ordering::Relaxed,
            );
            return;
        }

        out.fill(0.0);
    }

    fn covers(&self, slot: &ChunkSlot, global_frame: usize, len: usize) -> bool {
        let start = slot.chunk_start_frame.load(Ordering::Relaxed);
        let valid = slot.valid_frames.load(Ordering::Relaxed);
        global_frame >= start && global_frame + len <= start + valid
    }

    fn copy_from(&self, slot: &ChunkSlot, global_frame: usize, out: &mut [f32]) {
        let start = slot.chunk_start_frame.load(Ordering::Relaxed);
        // SAFETY: slot is Playing, so only the audio thread touches `data`.
        let data = unsafe { slot.data_ref() };
        let offset = global_frame - start;
        out.copy_from_slice(&data[offset..offset + out.len()]);
    }

    /// Loader-thread poll. Returns true if a
    /// chunk was (re)loaded this call.
    pub fn poll_loader(&self) -> bool {
        let active_idx = self.active.load(Ordering::Relaxed);
        let active = &self.slots[active_idx];
        let other_idx = 1 - active_idx;
        let other = &self.slots[other_idx];

        match active.state() {
            BufferState::Empty => {
                // Bootstrap: nothing playing yet, load the first chunk.
                if other.state() == BufferState::Empty {
                    self.load_chunk(active, 0);
                    active.set_state(BufferState::Ready);
                    return true;
                }
                false
            }
            BufferState::Playing => {
                let valid = active.valid_frames.load(Ordering::Relaxed) as f64;
                let consumed = self.consumed_frames.load(Ordering::Relaxed) as f64;
                if valid > 0.0 && consumed / valid >= REFILL_THRESHOLD && other.state() == BufferState::Empty {
                    other.set_state(BufferState::Loading);
                    let next_start = active.chunk_start_frame.load(Ordering::Relaxed)
                        + active.valid_frames.load(Ordering::Relaxed);
                    self.load_chunk(other, next_start);
                    other.set_state(BufferState::Ready);
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    fn load_chunk(&self, slot: &ChunkSlot, start_frame: usize) {
        let total = self.samples.len();
        let available = total.saturating_sub(start_frame).min(self.chunk_frames);
        // SAFETY: slot is Empty/Loading here, so only the loader touches `data`.
        let buf = unsafe { slot.data_mut() };
        buf.resize(self.chunk_frames, 0.0);
        if available > 0 {
            buf[..available].copy_from_slice(&self.samples[start_frame..start_frame + available]);
        }
        for s in buf.iter_mut().skip(available) {
            *s = 0.0;
        }
        slot.chunk_start_frame.store(start_frame, Ordering::Relaxed);
        // Past end-of-file the chunk is still zero-padded to full length, so
        // the audio thread's range check keeps succeeding instead of
        // underrunning right at the file boundary.
        slot.valid_frames.store(self.chunk_frames, Ordering::Relaxed);
    }
}

/// Maps an ADM channel-map source id to its interleaved channel index.
pub fn adm_channel_index(source_id: &str) -> Option<usize> {
    if source_id.eq_ignore_ascii_case("lfe") {
        return Some(3);
    }
    let n: usize = source_id.split('.').next()?.parse().ok()?;
    n.checked_sub(1)
}

/// Build one [`AudioSource`] per mapped channel out of a single preloaded
/// interleaved multichannel buffer ( "Multichannel (ADM
/// direct) mode").
pub fn load_adm_channels(
    interleaved: &[f32],
    num_channels: usize,
    source_ids: &[String],
    chunk_frames: usize,
) -> Vec<AudioSource> {
    let num_frames = if num_channels == 0 { 0 } else { interleaved.len() / num_channels };
    source_ids
        .iter()
        .filter_map(|id| {
            let ch = adm_channel_index(id)?;
            if ch >= num_channels {
                return None;
            }
            let mut mono = Vec::with_capacity(num_frames);
            for frame in 0..num_frames {
                mono.push(interleaved[frame * num_channels + ch]);
            }
            Some(AudioSource::new(id.clone(), mono, chunk_frames))
        })
        .collect()
}
