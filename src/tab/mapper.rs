// Tablature mapping
// Groups near-simultaneous notes and greedily assigns each one a string/fret
// that keeps the fretting hand close to where it last played

use serde::{Deserialize, Serialize};

use crate::detect::types::NoteEvent;
use crate::tab::tuning::Tuning;
use crate::tab::types::{TabEvent, TabNote, Tablature};

/// Position-assignment parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabMapperConfig {
    /// Highest playable fret
    pub max_fret: u8,

    /// Notes starting within this long after a group's first note join the group (seconds)
    pub onset_tolerance_sec: f64,

    /// Fret number is divided by this to penalize high positions
    pub fret_cost_divisor: u8,
}

impl Default for TabMapperConfig {
    fn default() -> Self {
        TabMapperConfig {
            max_fret: 22,
            onset_tolerance_sec: 0.035,
            fret_cost_divisor: 4,
        }
    }
}

/// Map notes onto the fretboard
///
/// Notes with no playable position (out of range, or every candidate string
/// already taken in the chord) are dropped from the tab. The tablature
/// duration still covers every input note.
pub fn map_notes(notes: &[NoteEvent], tuning: &Tuning, config: &TabMapperConfig) -> Tablature {
    if notes.is_empty() {
        return Tablature::empty(tuning.clone());
    }

    let mut last_frets: Vec<Option<u8>> = vec![None; tuning.string_count()];
    let mut events = Vec::new();
    let mut dropped = 0usize;

    for group in group_simultaneous(notes, config.onset_tolerance_sec) {
        let mut chord: Vec<&NoteEvent> = group.clone();
        chord.sort_by_key(|n| n.midi_pitch);

        let mut used = vec![false; last_frets.len()];
        let mut tab_notes = Vec::with_capacity(chord.len());

        for note in chord {
            let Some((string, fret)) = best_position(note.midi_pitch, tuning, &last_frets, &used, config)
            else {
                dropped += 1;
                continue;
            };

            used[string] = true;
            last_frets[string] = Some(fret);
            tab_notes.push(TabNote {
                string: string as u8,
                fret,
                articulations: note.articulations.clone(),
                bend_semitones: note.bend_semitones,
            });
        }

        if tab_notes.is_empty() {
            continue;
        }

        let start_ms = (group
            .iter()
            .map(|n| n.start_time_sec)
            .fold(f64::INFINITY, f64::min)
            * 1000.0) as i64;
        let end_ms = (group
            .iter()
            .map(|n| n.end_time_sec)
            .fold(f64::NEG_INFINITY, f64::max)
            * 1000.0) as i64;

        events.push(TabEvent {
            time_ms: start_ms,
            duration_ms: (end_ms - start_ms).max(1),
            notes: tab_notes,
        });
    }

    if dropped > 0 {
        log::debug!("Dropped {} unplayable notes from tablature ({})", dropped, tuning.name);
    }

    let duration_ms = (notes
        .iter()
        .map(|n| n.end_time_sec)
        .fold(f64::NEG_INFINITY, f64::max)
        * 1000.0) as i64;

    Tablature {
        tuning: tuning.clone(),
        events,
        duration_ms,
    }
}

/// Split notes (sorted by start) into groups whose members start within
/// `tolerance` of the group's first note
fn group_simultaneous(notes: &[NoteEvent], tolerance: f64) -> Vec<Vec<&NoteEvent>> {
    let mut sorted: Vec<&NoteEvent> = notes.iter().collect();
    sorted.sort_by(|a, b| a.start_time_sec.total_cmp(&b.start_time_sec));

    let mut groups: Vec<Vec<&NoteEvent>> = Vec::new();
    for note in sorted {
        match groups.last_mut() {
            Some(group) if note.start_time_sec - group[0].start_time_sec <= tolerance => {
                group.push(note)
            }
            _ => groups.push(vec![note]),
        }
    }
    groups
}

/// Cheapest free string for a pitch; ties go to the lower string index
fn best_position(
    midi_pitch: u8,
    tuning: &Tuning,
    last_frets: &[Option<u8>],
    used: &[bool],
    config: &TabMapperConfig,
) -> Option<(usize, u8)> {
    let divisor = config.fret_cost_divisor.max(1) as i32;
    let mut best: Option<(usize, u8, i32)> = None;

    for string in 0..last_frets.len() {
        if used[string] {
            continue;
        }
        let Some(open) = tuning.open_string_midi(string) else {
            continue;
        };

        let fret = midi_pitch as i32 - open as i32;
        if fret < 0 || fret > config.max_fret as i32 {
            continue;
        }

        let move_cost = last_frets[string].map_or(0, |last| (fret - last as i32).abs());
        let cost = move_cost + fret / divisor;

        if best.map_or(true, |(_, _, best_cost)| cost < best_cost) {
            best = Some((string, fret as u8, cost));
        }
    }

    best.map(|(string, fret, _)| (string, fret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::types::{Articulation, NoteArticulations};
    use crate::tab::tuning::PitchClass;

    fn note(pitch: u8, start: f64, end: f64) -> NoteEvent {
        NoteEvent::new(pitch, start, end, 0.9)
    }

    fn map(notes: &[NoteEvent]) -> Tablature {
        map_notes(notes, &Tuning::standard(), &TabMapperConfig::default())
    }

    #[test]
    fn test_empty_input() {
        let tab = map(&[]);
        assert!(tab.events.is_empty());
        assert_eq!(tab.duration_ms, 0);
        assert_eq!(tab.tuning, Tuning::standard());
    }

    #[test]
    fn test_chord_uses_distinct_strings() {
        let notes = vec![note(67, 0.0, 1.0), note(60, 0.0, 1.0), note(64, 0.0, 1.0)];
        let tab = map(&notes);

        assert_eq!(tab.events.len(), 1);
        let event = &tab.events[0];
        assert_eq!(event.notes.len(), 3);
        assert_eq!(event.time_ms, 0);
        assert_eq!(event.duration_ms, 1000);

        let strings: std::collections::BTreeSet<u8> = event.notes.iter().map(|n| n.string).collect();
        assert_eq!(strings.len(), 3);

        for n in &event.notes {
            let open = Tuning::standard().open_string_midi(n.string as usize).unwrap();
            assert!(n.fret <= 22);
            assert!([60u8, 64, 67].contains(&(open + n.fret)));
        }
    }

    #[test]
    fn test_chord_mapping_is_deterministic() {
        let notes = vec![note(60, 0.0, 1.0), note(64, 0.01, 1.0), note(67, 0.02, 1.0)];
        let first = map(&notes);
        let second = map(&notes);
        assert_eq!(first, second);

        // Fresh hand: only the fret penalty counts
        let positions: Vec<(u8, u8)> = first.events[0]
            .notes
            .iter()
            .map(|n| (n.string, n.fret))
            .collect();
        assert_eq!(positions, vec![(4, 1), (5, 0), (3, 12)]);
    }

    #[test]
    fn test_out_of_range_notes_dropped() {
        // 30 is below low E, 100 above the 22nd fret of high E
        let notes = vec![note(30, 0.0, 0.5), note(100, 1.0, 1.5), note(52, 2.0, 2.5)];
        let tab = map(&notes);

        assert_eq!(tab.events.len(), 1);
        assert_eq!(tab.events[0].time_ms, 2000);
        assert_eq!(tab.duration_ms, 2500);
    }

    #[test]
    fn test_chord_drops_notes_without_free_string() {
        // Middle C is playable on the five lowest strings only
        let notes: Vec<NoteEvent> = (0..7).map(|_| note(60, 0.0, 0.5)).collect();
        let tab = map(&notes);
        assert_eq!(tab.events.len(), 1);
        assert_eq!(tab.events[0].notes.len(), 5);
    }

    #[test]
    fn test_grouping_measured_from_first_note() {
        // 0.03 joins the first group; 0.06 is 60 ms after the first note
        let notes = vec![
            note(60, 0.0, 0.5),
            note(64, 0.03, 0.5),
            note(67, 0.06, 0.5),
            note(72, 0.25, 0.5),
        ];
        let tab = map(&notes);

        assert_eq!(tab.events.len(), 3);
        assert_eq!(tab.events[0].notes.len(), 2);
        assert_eq!(tab.events[1].notes.len(), 1);
        assert_eq!(tab.events[2].time_ms, 250);
    }

    #[test]
    fn test_move_cost_uses_last_fret() {
        // A4 lands on high E fret 5. C5 there would cost 3 (move) + 2 (fret 8),
        // so the untouched B string at fret 13 (cost 3) wins
        let notes = vec![note(69, 0.0, 0.5), note(72, 1.0, 1.5)];
        let tab = map(&notes);

        let first = &tab.events[0].notes[0];
        let second = &tab.events[1].notes[0];
        assert_eq!((first.string, first.fret), (5, 5));
        assert_eq!((second.string, second.fret), (4, 13));
    }

    #[test]
    fn test_minimum_event_duration() {
        let notes = vec![note(60, 1.0, 1.0005)];
        let tab = map(&notes);
        assert_eq!(tab.events[0].duration_ms, 1);
    }

    #[test]
    fn test_articulations_carried() {
        let bent = note(60, 0.0, 1.0).with_articulations(NoteArticulations {
            articulations: [Articulation::BendUp].into_iter().collect(),
            bend_semitones: 1.0,
            ..Default::default()
        });
        let tab = map(&[bent]);

        let tab_note = &tab.events[0].notes[0];
        assert!(tab_note.has(Articulation::BendUp));
        assert_eq!(tab_note.bend_semitones, 1.0);
    }

    #[test]
    fn test_fret_range_config() {
        let config = TabMapperConfig {
            max_fret: 12,
            ..Default::default()
        };
        let tab = map_notes(&[note(80, 0.0, 1.0)], &Tuning::standard(), &config);
        assert!(tab.events.is_empty());
        assert_eq!(tab.duration_ms, 1000);
    }

    #[test]
    fn test_short_tuning_drops_unreachable_notes() {
        use PitchClass::*;
        let tuning = Tuning::new("Four string", vec![E, A, D, G]);
        let notes = vec![
            note(40, 0.0, 0.5),
            note(80, 0.0, 0.5),
            note(67, 1.0, 1.5),
            note(90, 2.0, 2.5),
        ];

        let tab = map_notes(&notes, &tuning, &TabMapperConfig::default());

        // 80 and 90 lie above fret 22 on every remaining string
        assert_eq!(tab.events.len(), 2);
        assert_eq!(tab.note_count(), 2);
        assert_eq!((tab.events[0].notes[0].string, tab.events[0].notes[0].fret), (0, 0));
        assert_eq!((tab.events[1].notes[0].string, tab.events[1].notes[0].fret), (3, 12));
        assert!(tab.events.iter().flat_map(|e| &e.notes).all(|n| n.string < 4));
        assert_eq!(tab.duration_ms, 2500);

        let ascii = tab.to_ascii();
        let lines: Vec<&str> = ascii.lines().collect();
        assert_eq!(lines, vec!["G|--12-|", "D|-----|", "A|-----|", "E|0----|"]);
    }

    #[test]
    fn test_long_tuning_capped_at_six() {
        use PitchClass::*;
        let tuning = Tuning::new("Seven entries", vec![E, A, D, G, B, E, A]);
        assert_eq!(tuning.string_count(), 6);
        assert_eq!(tuning.open_string_midi(6), None);

        let mut notes = vec![note(64, 0.0, 1.0); 7];
        notes.push(note(69, 2.0, 3.0));
        let tab = map_notes(&notes, &tuning, &TabMapperConfig::default());

        // E4 fits on five strings; the low E would need fret 24
        assert_eq!(tab.events.len(), 2);
        assert_eq!(tab.events[0].notes.len(), 5);
        assert!(tab.events.iter().flat_map(|e| &e.notes).all(|n| n.string < 6));
        assert_eq!((tab.events[1].notes[0].string, tab.events[1].notes[0].fret), (5, 5));

        let ascii = tab.to_ascii();
        assert_eq!(ascii.lines().count(), 6);
        assert!(ascii.starts_with("e|"));
        assert!(ascii.lines().all(|line| line.ends_with('|')));
    }
}
