use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use super::sample_id::SampleId;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// One playing instance of a registered sample.
///
/// Start and stop are absolute frame positions on the engine clock, so a voice can be
/// queued ahead of time and cut at an exact frame by a later choke.
#[derive(Clone, Copy, Debug)]
pub struct Voice {
    pub sample_id: SampleId,
    pub start_at: u64,
    pub stop_at: Option<u64>,
    pub pos: f32,
    pub rate: f32,
    pub gain: f32,
    pub active: bool,
}

impl Voice {
    pub fn new(sample_id: SampleId, start_at: u64, rate: f32, gain: f32) -> Self {
        Self {
            sample_id,
            start_at,
            stop_at: None,
            pos: 0.0,
            rate,
            gain,
            active: true,
        }
    }

    /// Cut the voice at `frame` if it has started by then. Returns whether it was affected.
    pub fn stop_at_frame(&mut self, frame: u64) -> bool {
        if !self.active || self.start_at > frame {
            return false;
        }
        self.stop_at = Some(self.stop_at.map_or(frame, |s| s.min(frame)));
        if frame <= self.start_at {
            self.active = false;
        }
        true
    }

    pub fn render_into(&mut self, buffer: &SampleBuffer, out: &mut [StereoFrame], block_start: u64) {
        if !self.active {
            return;
        }
        let block_end = block_start + out.len() as u64;
        if self.start_at >= block_end {
            return;
        }
        let first = self.start_at.saturating_sub(block_start) as usize;
        let last = match self.stop_at {
            Some(stop) if stop <= block_start => {
                self.active = false;
                return;
            }
            Some(stop) => (stop.min(block_end) - block_start) as usize,
            None => out.len(),
        };

        let data = &buffer.data;
        let len = data.len();
        for frame in &mut out[first..last] {
            let i = self.pos as usize;
            if i >= len {
                self.active = false;
                return;
            }
            let frac = self.pos - i as f32;
            let s0 = data[i];
            let s1 = data.get(i + 1).copied().unwrap_or(s0);
            frame.mix(
                StereoFrame {
                    left: lerp(s0.left, s1.left, frac),
                    right: lerp(s0.right, s1.right, frac),
                },
                self.gain,
            );
            self.pos += self.rate;
        }

        if matches!(self.stop_at, Some(stop) if stop <= block_end) {
            self.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(n: usize) -> SampleBuffer {
        SampleBuffer {
            data: vec![StereoFrame::mono(1.0); n],
            sample_rate: 44100,
        }
    }

    #[test]
    fn voice_waits_for_its_start_frame() {
        let buf = ones(64);
        let mut voice = Voice::new(SampleId(1), 4, 1.0, 0.5);
        let mut out = [StereoFrame::zero(); 8];
        voice.render_into(&buf, &mut out, 0);

        assert_eq!(out[3], StereoFrame::zero());
        assert_eq!(out[4], StereoFrame::mono(0.5));
        assert!(voice.active);
    }

    #[test]
    fn voice_ends_with_its_buffer() {
        let buf = ones(3);
        let mut voice = Voice::new(SampleId(1), 0, 1.0, 1.0);
        let mut out = [StereoFrame::zero(); 8];
        voice.render_into(&buf, &mut out, 0);

        assert_eq!(out[2], StereoFrame::mono(1.0));
        assert_eq!(out[3], StereoFrame::zero());
        assert!(!voice.active);
    }

    #[test]
    fn stop_cuts_at_exact_frame() {
        let buf = ones(64);
        let mut voice = Voice::new(SampleId(1), 0, 1.0, 1.0);
        assert!(voice.stop_at_frame(5));
        let mut out = [StereoFrame::zero(); 8];
        voice.render_into(&buf, &mut out, 0);

        assert_eq!(out[4], StereoFrame::mono(1.0));
        assert_eq!(out[5], StereoFrame::zero());
        assert!(!voice.active);
    }

    #[test]
    fn stop_before_start_leaves_voice_alone() {
        let mut voice = Voice::new(SampleId(1), 10, 1.0, 1.0);
        assert!(!voice.stop_at_frame(9));
        assert!(voice.active);
        assert_eq!(voice.stop_at, None);
    }

    #[test]
    fn stop_on_start_frame_kills_voice() {
        let mut voice = Voice::new(SampleId(1), 10, 1.0, 1.0);
        assert!(voice.stop_at_frame(10));
        assert!(!voice.active);
    }
}
