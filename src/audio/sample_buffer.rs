use std::path::Path;

use anyhow::Context;

use super::frame::StereoFrame;

#[derive(Clone, Debug)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    /// Decode a WAV file into stereo frames at `target_rate`.
    ///
    /// Integer formats are normalised to [-1, 1], mono files are duplicated onto both
    /// channels and anything wider than stereo keeps its first two channels.
    pub fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let frames: Vec<StereoFrame> = if channels == 1 {
            samples.into_iter().map(StereoFrame::mono).collect()
        } else {
            samples
                .chunks_exact(channels)
                .map(|c| StereoFrame { left: c[0], right: c[1] })
                .collect()
        };

        if frames.is_empty() {
            anyhow::bail!("{} contains no audio", path.display());
        }

        Ok(Self {
            data: resample_linear(&frames, spec.sample_rate, target_rate),
            sample_rate: target_rate,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// Plain linear interpolation; drum one-shots don't need anything fancier
fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || source_rate == 0 {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let last = frames.last().copied().unwrap_or_default();

    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos.floor() as usize;
            let frac = (src_pos - idx as f64) as f32;
            if idx + 1 >= frames.len() {
                return last;
            }
            let a = frames[idx];
            let b = frames[idx + 1];
            StereoFrame {
                left: a.left * (1.0 - frac) + b.left * frac,
                right: a.right * (1.0 - frac) + b.right * frac,
            }
        })
        .collect()
}
