use std::sync::mpsc::{self, Receiver};

use anyhow::{Result, anyhow, bail};
use midir::{MidiInput, MidiInputConnection};

/// The MPD218 speaks notes (pads) and control changes (knobs); everything
/// else on the wire parses to `None` and is dropped at the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

pub struct MidiInputManager {
    connection: Option<MidiInputConnection<()>>,
    events: Option<Receiver<MidiEvent>>,
    port_name: Option<String>,
}

impl MidiInputManager {
    pub fn new() -> Self {
        Self {
            connection: None,
            events: None,
            port_name: None,
        }
    }

    /// Connect to the first input port whose name contains `keyword`
    /// (case-insensitive), falling back to the first port available.
    /// Returns the connected port's name.
    pub fn connect_matching(&mut self, keyword: &str) -> Result<String> {
        self.disconnect();

        let midi_in = MidiInput::new("hexpad").map_err(|err| anyhow!("MIDI init: {err}"))?;
        let ports = midi_in.ports();
        if ports.is_empty() {
            bail!("no MIDI input ports available");
        }
        let lowered = keyword.to_ascii_lowercase();
        let port = ports
            .iter()
            .find(|port| {
                midi_in
                    .port_name(port)
                    .map(|name| name.to_ascii_lowercase().contains(&lowered))
                    .unwrap_or(false)
            })
            .unwrap_or(&ports[0]);
        let name = midi_in
            .port_name(port)
            .unwrap_or_else(|_| "unknown port".to_string());

        let (tx, rx) = mpsc::channel();
        let connection = midi_in
            .connect(
                port,
                "hexpad-input",
                move |_timestamp, message, _| {
                    if let Some(event) = parse_midi_message(message) {
                        let _ = tx.send(event);
                    }
                },
                (),
            )
            .map_err(|err| anyhow!("connecting to {name}: {err}"))?;

        self.connection = Some(connection);
        self.events = Some(rx);
        self.port_name = Some(name.clone());
        Ok(name)
    }

    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        self.events = None;
        self.port_name = None;
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Drain pending events from the callback thread (non-blocking).
    pub fn poll_events(&self) -> Vec<MidiEvent> {
        let mut events = Vec::new();
        if let Some(rx) = &self.events {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }
        events
    }
}

impl Drop for MidiInputManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

pub fn parse_midi_message(data: &[u8]) -> Option<MidiEvent> {
    let status = *data.first()?;
    let channel = status & 0x0F;
    match status & 0xF0 {
        0x80 if data.len() >= 3 => Some(MidiEvent::NoteOff {
            channel,
            note: data[1],
        }),
        0x90 if data.len() >= 3 => {
            // Note-on with velocity zero is a note-off per MIDI convention.
            if data[2] == 0 {
                Some(MidiEvent::NoteOff {
                    channel,
                    note: data[1],
                })
            } else {
                Some(MidiEvent::NoteOn {
                    channel,
                    note: data[1],
                    velocity: data[2],
                })
            }
        }
        0xB0 if data.len() >= 3 => Some(MidiEvent::ControlChange {
            channel,
            controller: data[1],
            value: data[2],
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_note_on() {
        let event = parse_midi_message(&[0x99, 36, 100]).unwrap();
        assert_eq!(
            event,
            MidiEvent::NoteOn {
                channel: 9,
                note: 36,
                velocity: 100
            }
        );
    }

    #[test]
    fn parses_note_off() {
        let event = parse_midi_message(&[0x89, 36, 0]).unwrap();
        assert_eq!(
            event,
            MidiEvent::NoteOff {
                channel: 9,
                note: 36
            }
        );
    }

    #[test]
    fn note_on_with_zero_velocity_is_note_off() {
        let event = parse_midi_message(&[0x90, 40, 0]).unwrap();
        assert!(matches!(event, MidiEvent::NoteOff { note: 40, .. }));
    }

    #[test]
    fn parses_control_change() {
        let event = parse_midi_message(&[0xB0, 3, 64]).unwrap();
        assert_eq!(
            event,
            MidiEvent::ControlChange {
                channel: 0,
                controller: 3,
                value: 64
            }
        );
    }

    #[test]
    fn empty_and_short_messages_parse_to_none() {
        assert!(parse_midi_message(&[]).is_none());
        assert!(parse_midi_message(&[0x90, 36]).is_none());
        assert!(parse_midi_message(&[0xB0, 3]).is_none());
    }

    #[test]
    fn unhandled_status_bytes_parse_to_none() {
        assert!(parse_midi_message(&[0xE0, 0x00, 0x40]).is_none());
        assert!(parse_midi_message(&[0xC0, 1]).is_none());
        assert!(parse_midi_message(&[0xF8]).is_none());
    }
}
