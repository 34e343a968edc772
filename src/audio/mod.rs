use std::time::Instant;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::audio_api::{AudioCommand, AudioOut};

mod engine;
mod frame;
mod sample_buffer;
mod sample_id;
mod synth;
mod voice;

pub use frame::StereoFrame;
pub use sample_buffer::SampleBuffer;
pub use sample_id::{next_sample_id, SampleId};

use engine::Engine;

const COMMAND_QUEUE: usize = 1024;

// every command carries the moment it was sent, so the engine can take the time it
// spent in the queue off its offset
type Stamped = (Instant, AudioCommand);

pub struct AudioHandle {
    tx: Sender<Stamped>,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) -> anyhow::Result<()> {
        match self.tx.try_send((Instant::now(), cmd)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => anyhow::bail!("audio command queue is full"),
            Err(TrySendError::Disconnected(_)) => anyhow::bail!("audio thread has gone away"),
        }
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<Stamped>(COMMAND_QUEUE);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream =
                build_output_stream_f32(&device, &config.into(), rx, sample_rate, channels)?;
            output_stream.play().context("failed to play output stream")?;
            log::info!("audio output running at {sample_rate} Hz, {channels} channel(s)");

            Ok(AudioHandle {
                tx,
                _output_stream: output_stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<Stamped>,
    sample_rate: u32,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new(sample_rate);
    let mut scratch = vec![StereoFrame::zero(); 4096];

    let err_fn = |err| log::error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            let drained_at = Instant::now();
            while let Ok((sent_at, cmd)) = rx.try_recv() {
                let queued = drained_at.saturating_duration_since(sent_at).as_secs_f64();
                engine.handle_cmd(cmd, queued);
            }

            let n_frames = data.len() / channels.max(1);
            if channels == 2 {
                // an interleaved stereo f32 buffer has the same layout as [StereoFrame]
                let frames: &mut [StereoFrame] = unsafe {
                    std::slice::from_raw_parts_mut(data.as_mut_ptr() as *mut StereoFrame, n_frames)
                };
                engine.render_block(frames);
                return;
            }

            if scratch.len() < n_frames {
                scratch.resize(n_frames, StereoFrame::zero());
            }
            let frames = &mut scratch[..n_frames];
            engine.render_block(frames);
            for (out, frame) in data.chunks_exact_mut(channels).zip(frames.iter()) {
                if channels == 1 {
                    out[0] = 0.5 * (frame.left + frame.right);
                } else {
                    out.fill(0.0);
                    out[0] = frame.left;
                    out[1] = frame.right;
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// Lazily opened audio output.
///
/// Nothing touches the sound device until the first `start`, which middle.rs
/// only calls on a user gesture (play, audition or the test note).
#[derive(Default)]
pub struct AudioContext {
    handle: Option<AudioHandle>,
}

impl AudioContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioOut for AudioContext {
    fn start(&mut self) -> anyhow::Result<()> {
        if self.handle.is_none() {
            self.handle = Some(start_audio()?);
        }
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.handle.is_some()
    }

    fn send(&mut self, cmd: AudioCommand) -> anyhow::Result<()> {
        match &self.handle {
            Some(handle) => handle.send(cmd),
            None => anyhow::bail!("audio has not been started"),
        }
    }
}
