//! Encoder delta to relative CC value.
//!
//! Values 65..=127 mean "increased by N", 1..=64 mean "decreased by N".

use crate::config::EncoderConfig;

pub const CENTER_UP: u8 = 65;
pub const CENTER_DOWN: u8 = 64;

#[derive(Clone, Debug)]
pub struct Quantizer {
    multiplier: f32,
}

impl Quantizer {
    pub fn new(config: &EncoderConfig) -> Self {
        Self {
            multiplier: config.multiplier,
        }
    }

    /// Always returns a value in 1..=127. NaN counts as no movement.
    pub fn quantize(&self, delta: f32) -> u8 {
        if delta.is_nan() {
            return 1;
        }
        if delta > 0.0 {
            (CENTER_UP as f32 + delta * self.multiplier).clamp(CENTER_UP as f32, 127.0) as u8
        } else {
            (-delta * self.multiplier).clamp(1.0, CENTER_DOWN as f32) as u8
        }
    }
}

impl Default for Quantizer {
    fn default() -> Self {
        Self::new(&EncoderConfig::default())
    }
}
