use crate::controls::{Buttons, LIT_BUTTON_COUNT};
use crate::pad::PAD_COUNT;
use crate::router::Feedback;
use serde::Deserialize;

pub const SLIDER_SEGMENTS: usize = 25;
const PAD_OFFSET: usize = LIT_BUTTON_COUNT;
const SLIDER_OFFSET: usize = PAD_OFFSET + PAD_COUNT;
const BUFFER_LEN: usize = SLIDER_OFFSET + SLIDER_SEGMENTS;
const REPORT_ID: u8 = 0x80;
pub const REPORT_LEN: usize = BUFFER_LEN + 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Brightness {
    Off = 0x00,
    Dim = 0x7c,
    Normal = 0x7e,
    Bright = 0x7f,
}

impl Brightness {
    fn from_u8(v: u8) -> Self {
        match v {
            0x7c => Brightness::Dim,
            0x7e => Brightness::Normal,
            0x7f => Brightness::Bright,
            _ => Brightness::Off,
        }
    }

    /// Coarse brightness for an 8-bit intensity, 0 is off.
    pub fn from_intensity(intensity: u8) -> Self {
        match intensity {
            0 => Brightness::Off,
            1..=85 => Brightness::Dim,
            86..=170 => Brightness::Normal,
            _ => Brightness::Bright,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadColors {
    Off = 0,
    Red,
    Orange,
    LightOrange,
    WarmYellow,
    Yellow,
    Lime,
    Green,
    Mint,
    Cyan,
    Turquoise,
    Blue,
    Plum,
    Violet,
    Purple,
    Magenta,
    Fuchsia,
    White,
}

/// LED state of the whole surface, written to the device as one report.
pub struct Lights {
    buffer: [u8; BUFFER_LEN],
    pad_color: PadColors,
    backlight: Option<Brightness>,
    dirty: bool,
}

impl Default for Lights {
    fn default() -> Self {
        Self::new()
    }
}

impl Lights {
    pub fn new() -> Self {
        Self {
            buffer: [0; BUFFER_LEN],
            pad_color: PadColors::Blue,
            backlight: None,
            dirty: true,
        }
    }

    pub fn with_pad_color(mut self, color: PadColors) -> Self {
        self.pad_color = color;
        self
    }

    /// Keep released button LEDs at `level` instead of off.
    pub fn with_backlight(mut self, level: Brightness) -> Self {
        self.backlight = Some(level);
        for button in Buttons::all().filter(|b| b.has_light()) {
            self.set_button(button, level);
        }
        self
    }

    /// Every LED off, ignoring the backlight.
    pub fn clear(&mut self) {
        self.buffer.fill(0);
        self.dirty = true;
    }

    pub fn set_button(&mut self, button: Buttons, b: Brightness) {
        if button.has_light() {
            self.store(button as usize, b as u8);
        }
    }

    pub fn get_button(&self, button: Buttons) -> Brightness {
        if !button.has_light() {
            return Brightness::Off;
        }
        Brightness::from_u8(self.buffer[button as usize])
    }

    pub fn set_pad(&mut self, idx: usize, color: PadColors, b: Brightness) {
        if idx >= PAD_COUNT {
            return;
        }
        let val = if color == PadColors::Off || b == Brightness::Off {
            0
        } else {
            ((color as u8) << 2) | (b as u8 & 0b11)
        };
        self.store(PAD_OFFSET + idx, val);
    }

    /// Colour index and brightness of a pad, `None` past the last pad.
    pub fn get_pad(&self, idx: usize) -> Option<(u8, Brightness)> {
        if idx >= PAD_COUNT {
            return None;
        }
        let val = self.buffer[PAD_OFFSET + idx];
        let b = match val & 0b11 {
            _ if val == 0 => Brightness::Off,
            0b00 => Brightness::Dim,
            0b10 => Brightness::Normal,
            _ => Brightness::Bright,
        };
        Some((val >> 2, b))
    }

    pub fn set_slider(&mut self, idx: usize, b: Brightness) {
        if idx < SLIDER_SEGMENTS {
            self.store(SLIDER_OFFSET + idx, b as u8);
        }
    }

    pub fn get_slider(&self, idx: usize) -> Option<Brightness> {
        (idx < SLIDER_SEGMENTS).then(|| Brightness::from_u8(self.buffer[SLIDER_OFFSET + idx]))
    }

    fn store(&mut self, pos: usize, val: u8) {
        if self.buffer[pos] != val {
            self.buffer[pos] = val;
            self.dirty = true;
        }
    }

    /// Returns whether anything changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// HID output report carrying every LED.
    pub fn report(&self) -> [u8; REPORT_LEN] {
        let mut buf = [0u8; REPORT_LEN];
        buf[0] = REPORT_ID;
        buf[1..].copy_from_slice(&self.buffer);
        buf
    }
}

impl Feedback for Lights {
    fn set_pad(&mut self, index: usize, intensity: u8) {
        let color = self.pad_color;
        Lights::set_pad(self, index, color, Brightness::from_intensity(intensity));
    }

    fn set_button(&mut self, button: Buttons, intensity: u8) {
        let b = match (Brightness::from_intensity(intensity), self.backlight) {
            (Brightness::Off, Some(level)) => level,
            (b, _) => b,
        };
        Lights::set_button(self, button, b);
    }

    fn set_slider(&mut self, position: u8) {
        // position is 1..=201 while touched, the lit segment tracks the finger
        // and everything below it is dimmed.
        let cnt = (position as i32 - 1 + 5) * SLIDER_SEGMENTS as i32 / 200 - 1;
        for i in 0..SLIDER_SEGMENTS {
            let b = match cnt - i as i32 {
                0 => Brightness::Normal,
                1..=25 => Brightness::Dim,
                _ => Brightness::Off,
            };
            Lights::set_slider(self, i, b);
        }
    }
}
