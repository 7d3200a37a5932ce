use crate::midi::MidiEvent;

pub const NUM_KNOBS: usize = 6;
pub const NUM_PADS: usize = 16;

/// MPD218 factory bank-A control-change numbers, knob K1 through K6.
pub const KNOB_CCS: [u8; NUM_KNOBS] = [3, 9, 12, 13, 14, 15];

/// MPD218 factory bank-A pads start at note 36, sixteen chromatic notes up.
pub const PAD_NOTE_BASE: u8 = 36;

/// Snapshot of the control surface as last reported over MIDI. The renderer
/// only ever reads this; the frame loop owns it and applies incoming events.
#[derive(Clone, Debug, Default)]
pub struct Mpd218Model {
    pub knob_values: [u8; NUM_KNOBS],
    pub knob_last_updated: Option<usize>,
    pub pads_active: [bool; NUM_PADS],
}

impl Mpd218Model {
    pub fn apply(&mut self, event: MidiEvent) {
        match event {
            MidiEvent::ControlChange {
                controller, value, ..
            } => {
                if let Some(index) = KNOB_CCS.iter().position(|cc| *cc == controller) {
                    self.knob_values[index] = value;
                    self.knob_last_updated = Some(index);
                }
            }
            MidiEvent::NoteOn { note, .. } => {
                if let Some(pad) = pad_index(note) {
                    self.pads_active[pad] = true;
                }
            }
            MidiEvent::NoteOff { note, .. } => {
                if let Some(pad) = pad_index(note) {
                    self.pads_active[pad] = false;
                }
            }
        }
    }
}

fn pad_index(note: u8) -> Option<usize> {
    let index = note.checked_sub(PAD_NOTE_BASE)? as usize;
    (index < NUM_PADS).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_change_updates_mapped_knob() {
        let mut model = Mpd218Model::default();
        model.apply(MidiEvent::ControlChange {
            channel: 0,
            controller: 12,
            value: 100,
        });
        assert_eq!(model.knob_values[2], 100);
        assert_eq!(model.knob_last_updated, Some(2));
    }

    #[test]
    fn every_factory_cc_maps_to_its_knob() {
        let mut model = Mpd218Model::default();
        for (index, cc) in KNOB_CCS.iter().enumerate() {
            model.apply(MidiEvent::ControlChange {
                channel: 0,
                controller: *cc,
                value: index as u8 + 1,
            });
            assert_eq!(model.knob_values[index], index as u8 + 1);
            assert_eq!(model.knob_last_updated, Some(index));
        }
    }

    #[test]
    fn unknown_control_change_is_ignored() {
        let mut model = Mpd218Model::default();
        model.apply(MidiEvent::ControlChange {
            channel: 0,
            controller: 7,
            value: 127,
        });
        assert_eq!(model.knob_values, [0; NUM_KNOBS]);
        assert_eq!(model.knob_last_updated, None);
    }

    #[test]
    fn note_on_and_off_toggle_the_pad() {
        let mut model = Mpd218Model::default();
        model.apply(MidiEvent::NoteOn {
            channel: 9,
            note: 41,
            velocity: 90,
        });
        assert!(model.pads_active[5]);
        model.apply(MidiEvent::NoteOff {
            channel: 9,
            note: 41,
        });
        assert!(!model.pads_active[5]);
    }

    #[test]
    fn notes_outside_the_pad_bank_are_ignored() {
        let mut model = Mpd218Model::default();
        model.apply(MidiEvent::NoteOn {
            channel: 9,
            note: 35,
            velocity: 90,
        });
        model.apply(MidiEvent::NoteOn {
            channel: 9,
            note: 52,
            velocity: 90,
        });
        assert_eq!(model.pads_active, [false; NUM_PADS]);
    }
}
