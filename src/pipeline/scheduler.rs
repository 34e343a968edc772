// What happens on each sixteenth-note tick. The functions here only read a StepProgram
// snapshot and describe the hits; the middle layer sends them and deals with failures.

use std::collections::HashSet;

use crate::audio::SampleId;
use crate::audio_api::{BassNoteParams, TriggerParams};
use crate::shared::STEPS_PER_PATTERN;

use super::bassline::BassStep;
use super::clock::Tick;
use super::drums::DrumTrack;
use super::project::ProjectState;
use super::tempo::sixteenth_secs;

pub const SLIDE_SECS: f64 = 0.1;

/// Frozen copy of everything the tick callbacks read. Rebuilt on every edit that
/// touches tracks, steps or swing; tempo is read live.
#[derive(Clone, Debug, PartialEq)]
pub struct StepProgram {
    pub tracks: Vec<DrumTrack>,
    pub bass: [BassStep; STEPS_PER_PATTERN],
    pub swing: u8,
}

impl StepProgram {
    pub fn capture(state: &ProjectState) -> Self {
        Self {
            tracks: state.drums.tracks.to_vec(),
            bass: state.bass.steps,
            swing: state.swing,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DrumHit {
    pub track: usize,
    pub chokes: Vec<SampleId>, // stop these first, at the same offset as the trigger
    pub trigger: TriggerParams,
}

fn should_play(track: &DrumTrack, any_soloed: bool) -> bool {
    if any_soloed { track.solo } else { !track.muted }
}

/// Odd steps are pushed back by `swing`% of a sixteenth.
pub fn swing_offset(step: usize, swing: u8, tempo: u16) -> f64 {
    if step % 2 == 1 {
        swing as f64 / 100.0 * sixteenth_secs(tempo)
    } else {
        0.0
    }
}

pub fn drum_tick(program: &StepProgram, tick: Tick, tempo: u16) -> Vec<DrumHit> {
    let step = tick.step % STEPS_PER_PATTERN;
    let any_soloed = program.tracks.iter().any(|t| t.solo);
    let fires = |t: &DrumTrack| should_play(t, any_soloed) && t.steps[step].active;

    let choked: HashSet<&str> = program
        .tracks
        .iter()
        .filter(|&t| fires(t))
        .filter_map(|t| t.choke_group.as_deref())
        .collect();

    let offset = tick.offset + swing_offset(step, program.swing, tempo);

    program
        .tracks
        .iter()
        .enumerate()
        .filter(|&(_, t)| fires(t))
        .filter_map(|(i, t)| {
            let sample_id = t.sample?;
            let chokes = match t.choke_group.as_deref() {
                Some(group) if choked.contains(group) => program
                    .tracks
                    .iter()
                    .enumerate()
                    .filter(|(j, other)| *j != i && other.choke_group.as_deref() == Some(group))
                    .filter_map(|(_, other)| other.sample)
                    .collect(),
                _ => Vec::new(),
            };
            Some(DrumHit {
                track: i,
                chokes,
                trigger: TriggerParams {
                    sample_id,
                    gain: t.volume,
                    offset,
                },
            })
        })
        .collect()
}

/// The bass lane ignores swing.
pub fn bass_tick(program: &StepProgram, tick: Tick, tempo: u16) -> Option<BassNoteParams> {
    let step = program.bass[tick.step % STEPS_PER_PATTERN];
    if !step.is_on() {
        return None;
    }
    Some(BassNoteParams {
        midi: step.midi_note(),
        velocity: step.velocity,
        duration: sixteenth_secs(tempo),
        portamento: if step.slide { SLIDE_SECS } else { 0.0 },
        offset: tick.offset,
    })
}
