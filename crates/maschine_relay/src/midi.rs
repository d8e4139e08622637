use std::fmt;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const POLY_PRESSURE: u8 = 0xA0;
const CONTROL_CHANGE: u8 = 0xB0;

/// A three byte channel voice message, ready for the output port.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MidiTriplet(pub [u8; 3]);

impl MidiTriplet {
    fn new(status: u8, channel: u8, data1: u8, data2: u8) -> Self {
        Self([status | (channel & 0x0f), data1 & 0x7f, data2 & 0x7f])
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(NOTE_ON, channel, note, velocity)
    }

    pub fn note_off(channel: u8, note: u8) -> Self {
        Self::new(NOTE_OFF, channel, note, 0)
    }

    pub fn aftertouch(channel: u8, note: u8, pressure: u8) -> Self {
        Self::new(POLY_PRESSURE, channel, note, pressure)
    }

    pub fn control_change(channel: u8, cc: u8, value: u8) -> Self {
        Self::new(CONTROL_CHANGE, channel, cc, value)
    }

    pub fn bytes(&self) -> &[u8; 3] {
        &self.0
    }
}

impl fmt::Display for MidiTriplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [status, d1, d2] = self.0;
        let channel = status & 0x0f;
        match status & 0xf0 {
            NOTE_ON => write!(f, "ch{channel} note on {d1} vel {d2}"),
            NOTE_OFF => write!(f, "ch{channel} note off {d1}"),
            POLY_PRESSURE => write!(f, "ch{channel} pressure {d1} = {d2}"),
            CONTROL_CHANGE => write!(f, "ch{channel} CC {d1} = {d2}"),
            _ => write!(f, "{status:02x} {d1:02x} {d2:02x}"),
        }
    }
}
