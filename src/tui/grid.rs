use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::shared::{BassStepView, TrackView};

const STEP_ON: Color = Color::Rgb(0xff, 0x98, 0x00);
const STEP_OFF: Color = Color::Rgb(0x33, 0x33, 0x33);
const PLAYHEAD: Color = Color::Rgb(0xf8, 0xf8, 0xe7);

fn step_style(on: bool, playing: bool, cursor: bool) -> Style {
    let mut style = Style::default().fg(if on { STEP_ON } else { STEP_OFF });
    if playing {
        style = style.bg(PLAYHEAD);
    }
    if cursor {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

// e.g. "OH  80% M S  ■ ■ □ □ ..."
pub fn drum_row(track: &TrackView, playhead: Option<usize>, cursor: Option<usize>) -> Line<'static> {
    let flag = |set: bool, c: &'static str, color: Color| {
        if set {
            Span::styled(c, Style::default().fg(color).add_modifier(Modifier::BOLD))
        } else {
            Span::styled(c, Style::default().fg(Color::DarkGray))
        }
    };

    let name_style = if track.loaded {
        Style::default().fg(Color::Rgb(0xff, 0xe0, 0x82))
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let mut spans = vec![
        Span::styled(format!("{:<3}", track.name), name_style),
        Span::raw(format!("{:>4}% ", (track.volume * 100.0).round() as u32)),
        flag(track.muted, "M", Color::Red),
        Span::raw(" "),
        flag(track.solo, "S", Color::Yellow),
        Span::raw("  "),
    ];
    for (i, on) in track.steps.iter().enumerate() {
        let glyph = if *on { "■" } else { "□" };
        spans.push(Span::styled(glyph, step_style(*on, playhead == Some(i), cursor == Some(i))));
        spans.push(Span::raw(if i % 4 == 3 { "  " } else { " " }));
    }
    Line::from(spans)
}

// bass steps are wider so the note name fits: "C#2~" where ~ marks a slide
pub fn bass_row(steps: &[BassStepView], playhead: Option<usize>, cursor: Option<usize>) -> Line<'static> {
    let mut spans = vec![Span::styled("BASS        ", Style::default().fg(Color::Cyan))];
    for (i, step) in steps.iter().enumerate() {
        let label = if step.on { step.label.clone() } else { "--".to_string() };
        let slide = if step.slide { "~" } else { " " };
        spans.push(Span::styled(
            format!("{label:<3}{slide}"),
            step_style(step.on, playhead == Some(i), cursor == Some(i)),
        ));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}
