// ASCII tablature rendering
// One text line per string, highest-pitched string on top

use crate::detect::types::Articulation;
use crate::tab::types::{TabNote, Tablature};

impl Tablature {
    /// Render as plain-text tab
    ///
    /// Each event becomes one column. Frets are left-padded with `-` to the
    /// widest fret number in the column, articulation suffixes follow the
    /// fret, and every column ends with a `-` separator.
    pub fn to_ascii(&self) -> String {
        let n_strings = self.tuning.string_count();
        let mut lines: Vec<String> = (0..n_strings)
            .map(|display| format!("{}|", line_label(self, n_strings - 1 - display)))
            .collect();

        for event in &self.events {
            let mut cells: Vec<Option<&TabNote>> = vec![None; n_strings];
            for note in &event.notes {
                let string = note.string as usize;
                if string < n_strings {
                    cells[n_strings - 1 - string] = Some(note);
                }
            }

            let width = cells
                .iter()
                .flatten()
                .map(|note| note.fret.to_string().len())
                .max()
                .unwrap_or(1);

            for (line, cell) in lines.iter_mut().zip(&cells) {
                match cell {
                    Some(note) => {
                        let fret = note.fret.to_string();
                        line.push_str(&"-".repeat(width - fret.len()));
                        line.push_str(&fret);
                        line.push_str(&articulation_suffix(note));
                    }
                    None => line.push_str(&"-".repeat(width)),
                }
                line.push('-');
            }
        }

        for line in &mut lines {
            line.push('|');
        }
        lines.join("\n")
    }
}

/// Label for a string; the top string is lowercased when it shares the bottom string's name
fn line_label(tab: &Tablature, string: usize) -> String {
    let label = tab.tuning.string_label(string).unwrap_or("?");
    let top = tab.tuning.string_count().saturating_sub(1);
    if string == top && top > 0 && tab.tuning.string_label(0) == Some(label) {
        label.to_lowercase()
    } else {
        label.to_string()
    }
}

/// Technique markers appended after the fret number
pub fn articulation_suffix(note: &TabNote) -> String {
    let mut suffix = String::new();
    if note.has(Articulation::Vibrato) {
        suffix.push('~');
    }
    if note.has(Articulation::BendUp) {
        suffix.push_str(match note.bend_semitones {
            s if s >= 1.5 => "b^^",
            s if s >= 0.75 => "b^",
            _ => "b",
        });
    }
    for articulation in [
        Articulation::BendRelease,
        Articulation::SlideUp,
        Articulation::SlideDown,
        Articulation::HammerOn,
        Articulation::PullOff,
    ] {
        if note.has(articulation) {
            suffix.push_str(articulation.symbol());
        }
    }
    suffix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab::tuning::Tuning;
    use crate::tab::types::TabEvent;
    use pretty_assertions::assert_eq;

    fn tab_note(string: u8, fret: u8, articulations: &[Articulation], bend: f32) -> TabNote {
        TabNote {
            string,
            fret,
            articulations: articulations.iter().copied().collect(),
            bend_semitones: bend,
        }
    }

    #[test]
    fn test_render_columns() {
        let tab = Tablature {
            tuning: Tuning::standard(),
            events: vec![
                TabEvent {
                    time_ms: 0,
                    duration_ms: 500,
                    notes: vec![tab_note(4, 1, &[], 0.0)],
                },
                TabEvent {
                    time_ms: 500,
                    duration_ms: 500,
                    notes: vec![tab_note(0, 12, &[Articulation::Vibrato], 0.0)],
                },
            ],
            duration_ms: 1000,
        };

        let expected = [
            "e|-----|",
            "B|1----|",
            "G|-----|",
            "D|-----|",
            "A|-----|",
            "E|--12~-|",
        ]
        .join("\n");
        assert_eq!(tab.to_ascii(), expected);
    }

    #[test]
    fn test_suffix_does_not_widen_column() {
        let tab = Tablature {
            tuning: Tuning::standard(),
            events: vec![TabEvent {
                time_ms: 0,
                duration_ms: 250,
                notes: vec![
                    tab_note(0, 12, &[Articulation::Vibrato], 0.0),
                    tab_note(5, 3, &[], 0.0),
                ],
            }],
            duration_ms: 250,
        };

        let ascii = tab.to_ascii();
        let lines: Vec<&str> = ascii.lines().collect();
        assert_eq!(lines[0], "e|-3-|");
        assert_eq!(lines[1], "B|---|");
        assert_eq!(lines[5], "E|12~-|");
    }

    #[test]
    fn test_empty_tab() {
        let ascii = Tablature::empty(Tuning::standard()).to_ascii();
        assert_eq!(ascii, "e||\nB||\nG||\nD||\nA||\nE||");
    }

    #[test]
    fn test_labels_follow_tuning() {
        let ascii = Tablature::empty(Tuning::dadgad()).to_ascii();
        let labels: Vec<&str> = ascii.lines().map(|l| l.split('|').next().unwrap()).collect();
        assert_eq!(labels, vec!["d", "A", "G", "D", "A", "D"]);

        let ascii = Tablature::empty(Tuning::drop_d()).to_ascii();
        assert!(ascii.starts_with("E|"));
    }

    #[test]
    fn test_bend_suffixes() {
        assert_eq!(articulation_suffix(&tab_note(0, 5, &[Articulation::BendUp], 0.5)), "b");
        assert_eq!(articulation_suffix(&tab_note(0, 5, &[Articulation::BendUp], 1.0)), "b^");
        assert_eq!(articulation_suffix(&tab_note(0, 5, &[Articulation::BendUp], 2.0)), "b^^");
        assert_eq!(articulation_suffix(&tab_note(0, 5, &[Articulation::BendRelease], 1.0)), "br");
    }

    #[test]
    fn test_suffix_order() {
        let note = tab_note(
            0,
            5,
            &[Articulation::HammerOn, Articulation::BendUp, Articulation::Vibrato],
            1.0,
        );
        assert_eq!(articulation_suffix(&note), "~b^h");

        let slide = tab_note(0, 5, &[Articulation::SlideDown], 0.0);
        assert_eq!(articulation_suffix(&slide), "\\");
    }
}
