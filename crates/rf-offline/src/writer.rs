//! Multichannel PCM output writer with automatic WAV→RF64 escalation.
//!
//! `hound` has no RF64 support, so this is a small hand-rolled RIFF/RF64
//! writer rather than a hound wrapper — noted in DESIGN.md.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Standard RIFF/WAV's 32-bit size fields top out here; past this the data
/// chunk no longer fits and RF64 is required.
const WAV_DATA_LIMIT_BYTES: u64 = u32::MAX as u64;

const BYTES_PER_SAMPLE: u64 = 4; // 32-bit float

/// Which container format a write selected; exposed for diagnostics/tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Wav,
    Rf64,
}

/// Write `channels` (one `Vec<f32>` per device channel, all equal length)
/// as 32-bit float PCM, escalating to RF64 when the data chunk would
/// overflow a standard WAV's 32-bit size field.
pub fn write_multichannel(
    path: &Path,
    channels: &[Vec<f32>],
    sample_rate: u32,
) -> io::Result<ContainerFormat> {
    let num_channels = channels.len().max(1) as u16;
    let num_frames = channels.first().map(|c| c.len()).unwrap_or(0) as u64;
    let data_bytes = num_frames * num_channels as u64 * BYTES_PER_SAMPLE;

    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    match select_format(data_bytes) {
        ContainerFormat::Rf64 => {
            write_rf64(&mut w, channels, sample_rate, num_channels, num_frames, data_bytes)?;
            Ok(ContainerFormat::Rf64)
        }
        ContainerFormat::Wav => {
            write_wav(&mut w, channels, sample_rate, num_channels, num_frames, data_bytes)?;
            Ok(ContainerFormat::Wav)
        }
    }
}

/// Pure threshold decision, split out so the boundary can be tested
/// without allocating gigabytes of sample data.
fn select_format(data_bytes: u64) -> ContainerFormat {
    if data_bytes > WAV_DATA_LIMIT_BYTES {
        ContainerFormat::Rf64
    } else {
        ContainerFormat::Wav
    }
}

fn write_fmt_chunk(w: &mut impl Write, num_channels: u16, sample_rate: u32) -> io::Result<()> {
    let byte_rate = sample_rate * num_channels as u32 * BYTES_PER_SAMPLE as u32;
    let block_align = num_channels * BYTES_PER_SAMPLE as u16;

    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&3u16.to_le_bytes())?; // IEEE float
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&byte_rate.to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&32u16.to_le_bytes())?; // bits per sample
    Ok(())
}

fn write_interleaved(w: &mut impl Write, channels: &[Vec<f32>], num_frames: u64) -> io::Result<()> {
    let mut frame_buf = vec![0u8; channels.len() * 4];
    for frame in 0..num_frames as usize {
        for (c, ch) in channels.iter().enumerate() {
            let sample = ch.get(frame).copied().unwrap_or(0.0);
            let bytes = sample.to_le_bytes();
            frame_buf[c * 4..c * 4 + 4].copy_from_slice(&bytes);
        }
        w.write_all(&frame_buf)?;
    }
    Ok(())
}

fn write_wav(
    w: &mut impl Write,
    channels: &[Vec<f32>],
    sample_rate: u32,
    num_channels: u16,
    num_frames: u64,
    data_bytes: u64,
) -> io::Result<()> {
    let riff_size = 4 + (8 + 16) + (8 + data_bytes);

    w.write_all(b"RIFF")?;
    w.write_all(&(riff_size as u32).to_le_bytes())?;
    w.write_all(b"WAVE")?;
    write_fmt_chunk(w, num_channels, sample_rate)?;
    w.write_all(b"data")?;
    w.write_all(&(data_bytes as u32).to_le_bytes())?;
    write_interleaved(w, channels, num_frames)
}

fn write_rf64(
    w: &mut impl Write,
    channels: &[Vec<f32>],
    sample_rate: u32,
    num_channels: u16,
    num_frames: u64,
    data_bytes: u64,
) -> io::Result<()> {
    let riff_size: u64 = 4 + (8 + 28) + (8 + 16) + (8 + data_bytes);
    // EBU Tech 3306 "sample count": total samples per channel.
    let sample_count = num_frames;

    w.write_all(b"RF64")?;
    w.write_all(&0xFFFF_FFFFu32.to_le_bytes())?;
    w.write_all(b"WAVE")?;

    w.write_all(b"ds64")?;
    w.write_all(&28u32.to_le_bytes())?;
    w.write_all(&riff_size.to_le_bytes())?;
    w.write_all(&data_bytes.to_le_bytes())?;
    w.write_all(&sample_count.to_le_bytes())?;
    w.write_all(&0u32.to_le_bytes())?; // table length: no extra size entries

    write_fmt_chunk(w, num_channels, sample_rate)?;

    w.write_all(b"data")?;
    w.write_all(&0xFFFF_FFFFu32.to_le_bytes())?;
    write_interleaved(w, channels, num_frames)
}

/// Read back a file written by [`write_multichannel`] (WAV or RF64),
/// returning `(sample_rate, channels)`. Only understands this writer's own
/// chunk layout — general third-party WAV decoding goes through `hound` via
/// [`crate::audio_source`].
pub fn read_multichannel(path: &Path) -> io::Result<(u32, Vec<Vec<f32>>)> {
    let mut r = BufReader::new(File::open(path)?);

    let mut riff_tag = [0u8; 4];
    r.read_exact(&mut riff_tag)?;
    let is_rf64 = &riff_tag == b"RF64";
    if !is_rf64 && &riff_tag != b"RIFF" {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "not a RIFF/RF64 file"));
    }
    let mut size_placeholder = [0u8; 4];
    r.read_exact(&mut size_placeholder)?;
    let mut wave_tag = [0u8; 4];
    r.read_exact(&mut wave_tag)?;
    if &wave_tag != b"WAVE" {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "missing WAVE tag"));
    }

    let mut sample_rate = 0u32;
    let mut num_channels = 0u16;
    let mut data_size: u64 = 0;
    let mut data_start: u64 = 0;

    loop {
        let mut id = [0u8; 4];
        if r.read_exact(&mut id).is_err() {
            break;
        }
        let mut size_buf = [0u8; 4];
        r.read_exact(&mut size_buf)?;
        let chunk_size32 = u32::from_le_bytes(size_buf);

        match &id {
            b"ds64" => {
                let mut riff_size = [0u8; 8];
                let mut ds_data_size = [0u8; 8];
                r.read_exact(&mut riff_size)?;
                r.read_exact(&mut ds_data_size)?;
                data_size = u64::from_le_bytes(ds_data_size);
                let mut rest = vec![0u8; chunk_size32 as usize - 16];
                r.read_exact(&mut rest)?;
            }
            b"fmt " => {
                let mut fmt = vec![0u8; chunk_size32 as usize];
                r.read_exact(&mut fmt)?;
                num_channels = u16::from_le_bytes([fmt[2], fmt[3]]);
                sample_rate = u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]);
            }
            b"data" => {
                if !is_rf64 || data_size == 0 {
                    data_size = chunk_size32 as u64;
                }
                data_start = r.stream_position()?;
                r.seek(SeekFrom::Current(data_size as i64))?;
            }
            _ => {
                let skip = chunk_size32 as i64 + (chunk_size32 % 2) as i64;
                r.seek(SeekFrom::Current(skip))?;
            }
        }

        if data_start != 0 {
            break;
        }
    }

    r.seek(SeekFrom::Start(data_start))?;
    let num_channels = num_channels.max(1) as usize;
    let num_frames = (data_size / (num_channels as u64 * BYTES_PER_SAMPLE)) as usize;

    let mut channels: Vec<Vec<f32>> = vec![Vec::with_capacity(num_frames); num_channels];
    let mut frame_buf = vec![0u8; num_channels * 4];
    for _ in 0..num_frames {
        r.read_exact(&mut frame_buf)?;
        for (c, chan) in channels.iter_mut().enumerate() {
            let bytes = [
                frame_buf[c * 4],
                frame_buf[c * 4 + 1],
                frame_buf[c * 4 + 2],
                frame_buf[c * 4 + 3],
            ];
            chan.push(f32::from_le_bytes(bytes));
        }
    }

    Ok((sample_rate, channels))
}
