//! Loads per-source audio into [`AudioSource`]s before the stream starts.
//!
//! Reuses `rf-offline::audio_source`'s hound read path since both drivers
//! decode the same file formats; the difference is only what happens to the
//! decoded samples afterward (a flat block loop here vs. the
//! double-buffered loader there).

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};

use rf_realtime::streaming::{load_adm_channels, AudioSource, DEFAULT_CHUNK_FRAMES};

fn read_wav_interleaved(path: &Path) -> Result<(Vec<f32>, u16, u32)> {
    let mut reader = hound::WavReader::open(path).with_context(|| format!("opening {path:?}"))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .with_context(|| format!("decoding {path:?}"))?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()
                .with_context(|| format!("decoding {path:?}"))?
        }
    };

    Ok((samples, spec.channels, spec.sample_rate))
}

/// Mono mode: one `<id>.wav` per declared source id.
pub fn load_mono_folder(
    dir: &Path,
    source_ids: &[String],
    scene_sample_rate: u32,
) -> Result<HashMap<String, AudioSource>> {
    let mut sources = HashMap::with_capacity(source_ids.len());
    for id in source_ids {
        let path = dir.join(format!("{id}.wav"));
        if !path.exists() {
            log::warn!("source '{id}': no file at {path:?}; will render silence");
            continue;
        }
        let (samples, channels, sample_rate) = read_wav_interleaved(&path)?;
        if channels != 1 {
            bail!("source '{id}': expected mono, found {channels} channels");
        }
        if sample_rate != scene_sample_rate {
            bail!(
                "source '{id}': sample rate {sample_rate} does not match scene sample rate {scene_sample_rate}"
            );
        }
        sources.insert(id.clone(), AudioSource::new(id.clone(), samples, DEFAULT_CHUNK_FRAMES));
    }
    Ok(sources)
}

/// Multichannel ADM mode: one interleaved file, channels sliced per
/// id-to-channel convention.
pub fn load_adm_file(
    path: &Path,
    source_ids: &[String],
    scene_sample_rate: u32,
) -> Result<HashMap<String, AudioSource>> {
    let (interleaved, channels, sample_rate) = read_wav_interleaved(path)?;
    if sample_rate != scene_sample_rate {
        bail!("ADM file sample rate {sample_rate} does not match scene sample rate {scene_sample_rate}");
    }
    let built = load_adm_channels(&interleaved, channels as usize, source_ids, DEFAULT_CHUNK_FRAMES);
    Ok(built.into_iter().map(|s| (s.id.clone(), s)).collect())
}
