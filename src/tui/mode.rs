use crate::shared::{ParamPage, NUM_TRACKS, STEPS_PER_PATTERN};

pub const BASS_ROW: usize = NUM_TRACKS;

// state local to the tui: where the cursor is, which knob page is up,
// and the half-typed tempo. selected_pitch/selected_octave are synced
// from DisplayState every loop.
#[derive(Clone, Debug)]
pub struct TuiState {
    pub row: usize, // 0..NUM_TRACKS are drum tracks, BASS_ROW is the bass lane
    pub step: usize,
    pub param_page: ParamPage,
    pub tempo_entry: Option<String>,
    pub selected_pitch: Option<usize>,
    pub selected_octave: u8,
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            row: 0,
            step: 0,
            param_page: ParamPage::Groove,
            tempo_entry: None,
            selected_pitch: None,
            selected_octave: 2,
        }
    }
}

impl TuiState {
    pub fn on_bass_row(&self) -> bool {
        self.row == BASS_ROW
    }

    pub fn move_cursor(&mut self, rows: isize, steps: isize) {
        self.row = (self.row as isize + rows).clamp(0, BASS_ROW as isize) as usize;
        self.step = (self.step as isize + steps).rem_euclid(STEPS_PER_PATTERN as isize) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_wraps_steps_and_clamps_rows() {
        let mut ts = TuiState::default();
        ts.move_cursor(-1, -1);
        assert_eq!((ts.row, ts.step), (0, 15));
        ts.move_cursor(10, 1);
        assert_eq!((ts.row, ts.step), (BASS_ROW, 0));
        assert!(ts.on_bass_row());
    }
}
