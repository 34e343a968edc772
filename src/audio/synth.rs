use crate::audio_api::{BassNoteParams, SynthParams};

const MAX_PENDING: usize = 8;
const ATTACK: f32 = 0.01;
const SUSTAIN: f32 = 0.1;
const RELEASE: f32 = 0.1;
const OUTPUT_GAIN: f32 = 0.3;

pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

#[derive(Clone, Copy, Debug)]
struct ScheduledNote {
    start_at: u64,
    release_at: u64,
    freq: f32,
    velocity: f32,
    glide_frames: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Monophonic sawtooth bass: saw -> resonant low-pass -> ADSR.
pub struct BassSynth {
    sample_rate: f32,
    params: SynthParams,
    pending: [Option<ScheduledNote>; MAX_PENDING],

    phase: f32,
    freq: f32,
    glide_ratio: f32,
    glide_left: u32,
    target_freq: f32,

    velocity: f32,
    stage: Stage,
    level: f32,
    release_step: f32,
    release_at: Option<u64>,

    low: f32,
    band: f32,
}

impl BassSynth {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            params: SynthParams::default(),
            pending: [None; MAX_PENDING],
            phase: 0.0,
            freq: 0.0,
            glide_ratio: 1.0,
            glide_left: 0,
            target_freq: 0.0,
            velocity: 0.0,
            stage: Stage::Idle,
            level: 0.0,
            release_step: 0.0,
            release_at: None,
            low: 0.0,
            band: 0.0,
        }
    }

    pub fn set_params(&mut self, params: SynthParams) {
        self.params = params;
    }

    #[cfg(test)]
    pub fn is_sounding(&self) -> bool {
        self.stage != Stage::Idle
    }

    #[cfg(test)]
    pub fn pending_notes(&self) -> usize {
        self.pending.iter().flatten().count()
    }

    /// Queue a note relative to `now` (engine frame clock). Returns false when the queue is full.
    pub fn schedule(&mut self, note: &BassNoteParams, now: u64) -> bool {
        let offset_frames = self.secs_to_frames(note.offset);
        let duration_frames = self.secs_to_frames(note.duration);
        let glide_frames = self.secs_to_frames(note.portamento);
        let Some(slot) = self.pending.iter_mut().find(|p| p.is_none()) else {
            return false;
        };
        let start_at = now + offset_frames;
        *slot = Some(ScheduledNote {
            start_at,
            release_at: start_at + duration_frames.max(1),
            freq: midi_to_freq(note.midi),
            velocity: note.velocity.clamp(0.0, 1.0),
            glide_frames: glide_frames as u32,
        });
        true
    }

    /// Drop anything queued and release the current note.
    pub fn silence(&mut self) {
        self.pending = [None; MAX_PENDING];
        if self.stage != Stage::Idle {
            self.begin_release();
        }
    }

    pub fn next_sample(&mut self, frame: u64) -> f32 {
        self.start_due_notes(frame);
        if self.release_at.is_some_and(|r| frame >= r) {
            self.release_at = None;
            self.begin_release();
        }
        if self.stage == Stage::Idle {
            return 0.0;
        }

        if self.glide_left > 0 {
            self.freq *= self.glide_ratio;
            self.glide_left -= 1;
            if self.glide_left == 0 {
                self.freq = self.target_freq;
            }
        }

        let saw = 2.0 * self.phase - 1.0;
        self.phase += self.freq / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        let filtered = self.filter(saw);
        let env = self.advance_envelope();
        filtered * env * self.velocity * OUTPUT_GAIN
    }

    fn start_due_notes(&mut self, frame: u64) {
        let due = self
            .pending
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.filter(|n| n.start_at <= frame).map(|n| (i, n)))
            .min_by_key(|(_, n)| n.start_at);
        if let Some((i, note)) = due {
            self.pending[i] = None;
            self.start_note(note);
        }
    }

    fn start_note(&mut self, note: ScheduledNote) {
        if note.glide_frames > 0 && self.freq > 0.0 {
            self.glide_left = note.glide_frames;
            self.glide_ratio = (note.freq / self.freq).powf(1.0 / note.glide_frames as f32);
        } else {
            self.glide_left = 0;
            self.freq = note.freq;
        }
        self.target_freq = note.freq;
        self.velocity = note.velocity;
        self.release_at = Some(note.release_at);
        self.stage = Stage::Attack;
    }

    fn begin_release(&mut self) {
        self.stage = Stage::Release;
        self.release_step = self.level / (RELEASE * self.sample_rate).max(1.0);
    }

    fn advance_envelope(&mut self) -> f32 {
        match self.stage {
            Stage::Idle => {}
            Stage::Attack => {
                self.level += 1.0 / (ATTACK * self.sample_rate).max(1.0);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                let decay = self.params.decay.clamp(0.1, 1.0);
                self.level -= (1.0 - SUSTAIN) / (decay * self.sample_rate);
                if self.level <= SUSTAIN {
                    self.level = SUSTAIN;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => {}
            Stage::Release => {
                self.level -= self.release_step;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
        self.level
    }

    // Chamberlin state-variable low-pass; cutoff is capped where the topology stays stable
    fn filter(&mut self, input: f32) -> f32 {
        let cutoff = self.params.cutoff.clamp(20.0, self.sample_rate / 6.0);
        let f = 2.0 * (std::f32::consts::PI * cutoff / self.sample_rate).sin();
        let damping = 1.0 / self.params.resonance.max(0.707);
        self.low += f * self.band;
        let high = input - self.low - damping * self.band;
        self.band += f * high;
        self.low
    }

    fn secs_to_frames(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.sample_rate as f64).round() as u64
    }
}
