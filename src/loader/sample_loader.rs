use std::path::Path;

use anyhow::Context;

use crate::audio::{next_sample_id, SampleBuffer, SampleId};

// Load a WAV from disk, ready to be registered with the engine
pub fn load(path: &Path, target_rate: u32) -> anyhow::Result<(SampleId, SampleBuffer)> {
    let buffer = SampleBuffer::load_wav(path, target_rate)
        .with_context(|| format!("loading {}", path.display()))?;
    Ok((next_sample_id(), buffer))
}
