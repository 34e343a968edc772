use std::collections::HashMap;

use crate::audio_api::{AudioCommand, TriggerParams};

use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use super::sample_id::SampleId;
use super::synth::BassSynth;
use super::voice::Voice;

const MAX_VOICES: usize = 32; // hard cap so we wont malloc in the audio callback

pub struct Engine {
    sample_rate: u32,
    now: u64, // frames rendered so far
    samples: HashMap<SampleId, SampleBuffer>,
    voices: [Option<Voice>; MAX_VOICES],
    bass: BassSynth,
    dropped_notes: u64, // bass notes refused by a full synth queue
}

impl Engine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            now: 0,
            samples: HashMap::new(),
            voices: [None; MAX_VOICES],
            bass: BassSynth::new(sample_rate),
            dropped_notes: 0,
        }
    }

    /// Apply one command. `queued` is how long (seconds) it sat in the channel before
    /// this block picked it up; scheduled offsets count from the send, so that wait is
    /// taken back off them.
    pub fn handle_cmd(&mut self, cmd: AudioCommand, queued: f64) {
        let since_send = |offset: f64| (offset - queued.max(0.0)).max(0.0);
        match cmd {
            AudioCommand::RegisterSample { id, buffer } => {
                self.samples.insert(id, buffer);
            }
            AudioCommand::Trigger(mut t) => {
                t.offset = since_send(t.offset);
                self.trigger_voice(t)
            }
            AudioCommand::Stop { sample_id, offset } => {
                let at = self.now + self.secs_to_frames(since_send(offset));
                self.stop_sample(sample_id, at);
            }
            AudioCommand::BassNote(mut note) => {
                note.offset = since_send(note.offset);
                if !self.bass.schedule(&note, self.now) {
                    self.dropped_notes += 1;
                    log::warn!(
                        "bass queue full, dropped midi {} ({} dropped so far)",
                        note.midi,
                        self.dropped_notes
                    );
                }
            }
            AudioCommand::SetSynth(params) => self.bass.set_params(params),
            AudioCommand::StopAll => {
                self.voices = [None; MAX_VOICES];
                self.bass.silence();
            }
        }
    }

    fn trigger_voice(&mut self, t: TriggerParams) {
        let Some(buffer) = self.samples.get(&t.sample_id).filter(|b| !b.is_empty()) else {
            return;
        };
        let rate = buffer.sample_rate as f32 / self.sample_rate as f32;
        let start_at = self.now + self.secs_to_frames(t.offset);

        // one voice per sample: a retrigger cuts the previous hit
        self.stop_sample(t.sample_id, start_at);

        let slot = match self.voices.iter().position(|v| v.is_none()) {
            Some(slot) => slot,
            None => self.oldest_voice(),
        };
        self.voices[slot] = Some(Voice::new(t.sample_id, start_at, rate, t.gain));
    }

    fn stop_sample(&mut self, sample_id: SampleId, at: u64) {
        for slot in self.voices.iter_mut() {
            if let Some(voice) = slot {
                if voice.sample_id == sample_id {
                    voice.stop_at_frame(at);
                    if !voice.active {
                        *slot = None;
                    }
                }
            }
        }
    }

    fn oldest_voice(&self) -> usize {
        self.voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.map_or(0, |v| v.start_at))
            .map_or(0, |(i, _)| i)
    }

    #[cfg(test)]
    pub fn active_voices(&self, sample_id: SampleId) -> usize {
        self.voices
            .iter()
            .flatten()
            .filter(|v| v.sample_id == sample_id && v.active)
            .count()
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());

        for slot in self.voices.iter_mut() {
            if let Some(voice) = slot {
                match self.samples.get(&voice.sample_id) {
                    Some(buffer) => voice.render_into(buffer, out, self.now),
                    None => voice.active = false,
                }
                if !voice.active {
                    *slot = None;
                }
            }
        }

        for (i, frame) in out.iter_mut().enumerate() {
            let s = self.bass.next_sample(self.now + i as u64);
            frame.mix(StereoFrame::mono(s), 1.0);
        }

        self.now += out.len() as u64;
    }

    fn secs_to_frames(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.sample_rate as f64).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_api::BassNoteParams;

    impl Engine {
        fn handle_now(&mut self, cmd: AudioCommand) {
            self.handle_cmd(cmd, 0.0);
        }

        fn start_frame(&self, id: SampleId) -> Option<u64> {
            self.voices.iter().flatten().find(|v| v.sample_id == id).map(|v| v.start_at)
        }
    }

    const HAT: SampleId = SampleId(1);
    const OPEN_HAT: SampleId = SampleId(2);

    fn engine_with_hats() -> Engine {
        let mut engine = Engine::new(1000);
        for id in [HAT, OPEN_HAT] {
            engine.handle_now(AudioCommand::RegisterSample {
                id,
                buffer: SampleBuffer {
                    data: vec![StereoFrame::mono(1.0); 500],
                    sample_rate: 1000,
                },
            });
        }
        engine
    }

    fn trigger(id: SampleId, offset: f64) -> AudioCommand {
        AudioCommand::Trigger(TriggerParams {
            sample_id: id,
            gain: 1.0,
            offset,
        })
    }

    fn stop(id: SampleId, offset: f64) -> AudioCommand {
        AudioCommand::Stop { sample_id: id, offset }
    }

    #[test]
    fn trigger_plays_after_offset() {
        let mut engine = engine_with_hats();
        engine.handle_now(trigger(HAT, 0.004));
        let mut out = [StereoFrame::zero(); 8];
        engine.render_block(&mut out);

        assert_eq!(out[3], StereoFrame::zero());
        assert_eq!(out[4], StereoFrame::mono(1.0));
    }

    #[test]
    fn unknown_sample_is_ignored() {
        let mut engine = engine_with_hats();
        engine.handle_now(trigger(SampleId(99), 0.0));
        let mut out = [StereoFrame::zero(); 4];
        engine.render_block(&mut out);
        assert!(out.iter().all(|f| *f == StereoFrame::zero()));
    }

    #[test]
    fn choke_on_same_tick_leaves_only_the_later_track() {
        let mut engine = engine_with_hats();
        // same order the drum scheduler emits for H then OH on one tick
        engine.handle_now(stop(OPEN_HAT, 0.01));
        engine.handle_now(trigger(HAT, 0.01));
        engine.handle_now(stop(HAT, 0.01));
        engine.handle_now(trigger(OPEN_HAT, 0.01));

        assert_eq!(engine.active_voices(HAT), 0);
        assert_eq!(engine.active_voices(OPEN_HAT), 1);
    }

    #[test]
    fn choke_cuts_a_ringing_voice_at_the_new_hit() {
        let mut engine = engine_with_hats();
        engine.handle_now(trigger(OPEN_HAT, 0.0));
        let mut out = [StereoFrame::zero(); 10];
        engine.render_block(&mut out);

        engine.handle_now(stop(OPEN_HAT, 0.005));
        engine.handle_now(trigger(HAT, 0.005));
        let mut out = [StereoFrame::zero(); 10];
        engine.render_block(&mut out);

        // open hat alone for 5 frames, closed hat alone afterwards
        assert_eq!(out[4], StereoFrame::mono(1.0));
        assert_eq!(out[5], StereoFrame::mono(1.0));
        assert_eq!(engine.active_voices(OPEN_HAT), 0);
        assert_eq!(engine.active_voices(HAT), 1);
    }

    #[test]
    fn retrigger_is_monophonic_per_sample() {
        let mut engine = engine_with_hats();
        engine.handle_now(trigger(HAT, 0.0));
        engine.handle_now(trigger(HAT, 0.002));
        let mut out = [StereoFrame::zero(); 4];
        engine.render_block(&mut out);

        assert_eq!(out[3], StereoFrame::mono(1.0));
        assert_eq!(engine.active_voices(HAT), 1);
    }

    #[test]
    fn stop_all_silences_everything() {
        let mut engine = engine_with_hats();
        engine.handle_now(trigger(HAT, 0.0));
        engine.handle_now(AudioCommand::BassNote(BassNoteParams {
            midi: 36,
            velocity: 0.7,
            duration: 0.1,
            portamento: 0.0,
            offset: 0.5,
        }));
        engine.handle_now(AudioCommand::StopAll);

        assert_eq!(engine.active_voices(HAT), 0);
        assert_eq!(engine.bass.pending_notes(), 0);
    }

    #[test]
    fn queue_wait_does_not_shift_the_grid() {
        // 48 kHz, 1024-frame blocks; ticks sent 125ms (6000 frames) apart with a 50ms lookahead
        let mut engine = Engine::new(48000);
        for id in [HAT, OPEN_HAT] {
            engine.handle_now(AudioCommand::RegisterSample {
                id,
                buffer: SampleBuffer {
                    data: vec![StereoFrame::mono(1.0); 48000],
                    sample_rate: 48000,
                },
            });
        }
        let mut block = [StereoFrame::zero(); 1024];

        // sent at frame 0, picked up at the start of the second block
        engine.render_block(&mut block);
        engine.handle_cmd(trigger(HAT, 0.05), 1024.0 / 48000.0);

        // sent at frame 6000, picked up at frame 6144
        while engine.now < 6144 {
            engine.render_block(&mut block);
        }
        engine.handle_cmd(trigger(OPEN_HAT, 0.05), 144.0 / 48000.0);

        let a = engine.start_frame(HAT).unwrap();
        let b = engine.start_frame(OPEN_HAT).unwrap();
        assert_eq!(a, 2400);
        assert_eq!(b - a, 6000);
    }

    #[test]
    fn wait_longer_than_the_offset_plays_immediately() {
        let mut engine = engine_with_hats();
        engine.handle_cmd(trigger(HAT, 0.002), 0.5);
        assert_eq!(engine.start_frame(HAT), Some(0));
    }

    #[test]
    fn full_bass_queue_counts_drops() {
        let mut engine = engine_with_hats();
        for _ in 0..9 {
            engine.handle_now(AudioCommand::BassNote(BassNoteParams {
                midi: 36,
                velocity: 0.7,
                duration: 0.1,
                portamento: 0.0,
                offset: 1.0,
            }));
        }
        assert_eq!(engine.bass.pending_notes(), 8);
        assert_eq!(engine.dropped_notes, 1);
    }
}
