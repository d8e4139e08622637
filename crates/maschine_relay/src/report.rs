//! Decoding of Mikro MK3 HID input reports.

use crate::controls::{BUTTON_COUNT, Buttons};
use crate::pad::PAD_COUNT;
use log::debug;
use std::time::{Duration, Instant};

const BUTTONS_REPORT: u8 = 0x01;
const PADS_REPORT: u8 = 0x02;

/// Encoder position is a 4-bit counter, one step is 1/16 of a turn.
const ENCODER_STEPS_PER_TURN: f32 = 16.0;
/// Touching the encoder produces a small spurious turn on this device.
const ENCODER_TOUCH_SUPPRESS: Duration = Duration::from_millis(120);
const PAD_FULL_SCALE: f32 = 4095.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SurfaceEvent {
    Button { button: Buttons, pressed: bool },
    /// Relative turn, in revolutions. Positive is clockwise.
    Encoder { delta: f32 },
    /// Raw slider position, 1..=201.
    Slider { position: u8 },
    /// Pressure normalized to 0.0..=1.0.
    Pad { index: usize, sample: f32 },
}

/// Tracks the state needed to turn reports into change events.
pub struct ReportDecoder {
    buttons: [bool; BUTTON_COUNT],
    slider: u8,
    encoder_pos: Option<u8>,
    suppress_encoder_until: Option<Instant>,
}

impl Default for ReportDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportDecoder {
    pub fn new() -> Self {
        Self {
            buttons: [false; BUTTON_COUNT],
            slider: 0,
            encoder_pos: None,
            suppress_encoder_until: None,
        }
    }

    pub fn decode(&mut self, buf: &[u8], now: Instant) -> Vec<SurfaceEvent> {
        match buf.first() {
            Some(&BUTTONS_REPORT) if buf.len() >= 11 => self.decode_buttons(buf, now),
            Some(&PADS_REPORT) => decode_pads(buf),
            Some(id) => {
                debug!("ignoring report {id:#04x} ({} bytes)", buf.len());
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn decode_buttons(&mut self, buf: &[u8], now: Instant) -> Vec<SurfaceEvent> {
        let mut events = Vec::new();
        let mut encoder_touch_just_pressed = false;

        for i in 0..6 {
            for j in 0..8 {
                let idx = i * 8 + j;
                let Some(button) = Buttons::from_index(idx) else {
                    continue;
                };
                let pressed = (buf[i + 1] & (1 << j)) > 0;
                if pressed == self.buttons[idx] {
                    continue;
                }
                self.buttons[idx] = pressed;
                events.push(SurfaceEvent::Button { button, pressed });

                if button == Buttons::EncoderTouch && pressed {
                    encoder_touch_just_pressed = true;
                }
            }
        }

        if encoder_touch_just_pressed {
            self.suppress_encoder_until = Some(now + ENCODER_TOUCH_SUPPRESS);
        }

        // buf[7] holds the absolute encoder position, not a delta.
        let cur_pos = buf[7] & 0x0f;
        let suppressed = self.suppress_encoder_until.is_some_and(|until| now < until);
        let prev_pos = self.encoder_pos.filter(|_| !suppressed && !encoder_touch_just_pressed);
        if let Some(prev_pos) = prev_pos {
            let diff = cur_pos.wrapping_sub(prev_pos) & 0x0f;
            let steps: i8 = if diff < 8 { diff as i8 } else { diff as i8 - 16 };
            if steps != 0 {
                events.push(SurfaceEvent::Encoder {
                    delta: steps as f32 / ENCODER_STEPS_PER_TURN,
                });
            }
        }
        self.encoder_pos = Some(cur_pos);

        // 0 means the slider is not touched.
        let slider = buf[10];
        if slider != 0 && slider != self.slider {
            self.slider = slider;
            events.push(SurfaceEvent::Slider { position: slider });
        }

        events
    }
}

fn decode_pads(buf: &[u8]) -> Vec<SurfaceEvent> {
    let mut events = Vec::new();
    for i in (1..buf.len().saturating_sub(2)).step_by(3) {
        let idx = buf[i] as usize;
        let val = ((buf[i + 1] as u16 & 0x0f) << 8) | buf[i + 2] as u16;
        if i > 1 && idx == 0 && buf[i + 1] == 0 && val == 0 {
            break;
        }
        if idx >= PAD_COUNT {
            debug!("ignoring pad index {idx}");
            continue;
        }
        events.push(SurfaceEvent::Pad {
            index: idx,
            sample: val as f32 / PAD_FULL_SCALE,
        });
    }
    events
}
