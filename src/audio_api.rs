pub use crate::audio::{SampleBuffer, SampleId};

// All offsets are seconds from the moment the engine receives the command.

#[derive(Clone, Debug)]
pub struct TriggerParams {
    pub sample_id: SampleId,
    pub gain: f32,
    pub offset: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BassNoteParams {
    pub midi: u8,
    pub velocity: f32,
    pub duration: f64,
    pub portamento: f64,
    pub offset: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SynthParams {
    pub cutoff: f32,
    pub resonance: f32,
    pub decay: f32,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            cutoff: 1000.0,
            resonance: 0.0,
            decay: 0.2,
        }
    }
}

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The engine can't load files (it would stall the audio thread), so a decoded
    // buffer is registered first and triggered by id afterwards.
    RegisterSample { id: SampleId, buffer: SampleBuffer },

    Trigger(TriggerParams),

    // Ends every voice of this sample that started at or before the stop point
    Stop { sample_id: SampleId, offset: f64 },

    BassNote(BassNoteParams),
    SetSynth(SynthParams),

    StopAll,
}

/// The control side's view of the audio backend.
///
/// `start` is the one-time initialisation gate: the first call opens the output device,
/// later calls are no-ops. `send` fails when the backend isn't started or can't take
/// more commands.
pub trait AudioOut {
    fn start(&mut self) -> anyhow::Result<()>;
    fn is_started(&self) -> bool;
    fn send(&mut self, cmd: AudioCommand) -> anyhow::Result<()>;
}
