//! Mono per-source audio loading for the offline driver.
//!
//! A hound-based WAV read path trimmed to the mono float-or-int case each
//! per-source input file uses.

use std::collections::HashMap;
use std::path::Path;

use log::warn;
use rf_core::WarnOnce;

/// One source's full decoded mono signal, ready to be sliced into blocks.
pub struct SourceAudio {
    pub samples: Vec<f32>,
}

impl SourceAudio {
    /// Copy `len` samples starting at `start` into `out`, zero-filling past
    /// the end of the buffer.
    pub fn read_block(&self, start: usize, out: &mut [f32]) {
        let len = out.len();
        let available = self.samples.len().saturating_sub(start);
        let copy_len = available.min(len);
        if copy_len > 0 {
            out[..copy_len].copy_from_slice(&self.samples[start..start + copy_len]);
        }
        for s in out.iter_mut().skip(copy_len) {
            *s = 0.0;
        }
    }
}

/// Load every declared source's mono file from `sources_dir`. A source
/// listed in the scene but missing its file is warned and skipped — it
/// simply won't render (treated as all-zero) rather than failing the load.
pub fn load_mono_sources(
    sources_dir: &Path,
    source_ids: impl IntoIterator<Item = String>,
    scene_sample_rate: u32,
    warned: &mut WarnOnce<String>,
) -> HashMap<String, SourceAudio> {
    let mut loaded = HashMap::new();

    for id in source_ids {
        let path = sources_dir.join(format!("{id}.wav"));
        match load_one(&path, scene_sample_rate) {
            Ok(audio) => {
                loaded.insert(id, audio);
            }
            Err(reason) => {
                if warned.should_warn(format!("missing_audio:{id}")) {
                    warn!("source '{id}': {reason} ({}); rendering silence", path.display());
                }
            }
        }
    }

    loaded
}

fn load_one(path: &Path, scene_sample_rate: u32) -> Result<SourceAudio, String> {
    let mut reader = hound::WavReader::open(path).map_err(|e| e.to_string())?;
    let spec = reader.spec();

    if spec.channels != 1 {
        return Err(format!("expected mono, found {} channels", spec.channels));
    }
    if spec.sample_rate != scene_sample_rate {
        return Err(format!(
            "sample rate {} does not match scene sample rate {}",
            spec.sample_rate, scene_sample_rate
        ));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| e.to_string())?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()
                .map_err(|e| e.to_string())?
        }
    };

    Ok(SourceAudio { samples })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_block_zero_pads_past_end() {
        let audio = SourceAudio { samples: vec![1.0, 2.0, 3.0] };
        let mut out = vec![0.0f32; 5];
        audio.read_block(1, &mut out);
        assert_eq!(out, vec![2.0, 3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn read_block_fully_past_end_is_silence() {
        let audio = SourceAudio { samples: vec![1.0, 2.0] };
        let mut out = vec![9.0f32; 3];
        audio.read_block(10, &mut out);
        assert_eq!(out, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn missing_file_is_warned_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut warned = WarnOnce::new();
        let loaded = load_mono_sources(
            dir.path(),
            vec!["nope".to_string()],
            48000,
            &mut warned,
        );
        assert!(loaded.is_empty());
    }
}
