use crate::controls::Buttons;
use crate::error::{Error, Result};
use crate::osc::OscEncoder;
use serde::Deserialize;
use std::time::Duration;

/// Pad sensing calibration. Defaults are tuned for the Mikro MK3 pads.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PadConfig {
    /// Smoothed pressure below this releases the pad.
    pub low_threshold: f32,
    /// Smoothed pressure above this presses the pad.
    pub high_threshold: f32,
    /// Weight of the previous smoothed value, in [0, 1).
    pub momentum: f32,
    /// Curve applied to pressure before scaling to MIDI velocity.
    pub velocity_exponent: f32,
    /// How long a press must hold before the note starts.
    pub on_delay_ms: u64,
    /// How long a release must hold before the note stops.
    pub off_delay_ms: u64,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            low_threshold: 0.01,
            high_threshold: 0.04,
            momentum: 0.8,
            velocity_exponent: 0.5,
            on_delay_ms: 5,
            off_delay_ms: 10,
        }
    }
}

impl PadConfig {
    pub fn on_delay(&self) -> Duration {
        Duration::from_millis(self.on_delay_ms)
    }

    pub fn off_delay(&self) -> Duration {
        Duration::from_millis(self.off_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.low_threshold.is_finite() || !self.high_threshold.is_finite() {
            return Err(Error::InvalidConfig("pad thresholds must be finite".to_string()));
        }
        if self.low_threshold >= self.high_threshold {
            return Err(Error::InvalidConfig(format!(
                "pad.low_threshold ({}) must be below pad.high_threshold ({})",
                self.low_threshold, self.high_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(Error::InvalidConfig(format!(
                "pad.momentum must be in [0, 1) (found {})",
                self.momentum
            )));
        }
        if !(self.velocity_exponent.is_finite() && self.velocity_exponent > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "pad.velocity_exponent must be positive (found {})",
                self.velocity_exponent
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EncoderConfig {
    /// Scale from encoder delta (in turns) to relative CC steps.
    pub multiplier: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self { multiplier: 32.0 }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.multiplier.is_finite() && self.multiplier > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "encoder.multiplier must be positive (found {})",
                self.multiplier
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OscConfig {
    /// Forward button presses as OSC messages.
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Address prefix, button names are appended as the last path segment.
    pub prefix: String,
    /// Largest datagram the encoder will produce.
    pub capacity: usize,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 9000,
            prefix: "/maschine".to_string(),
            capacity: 1024,
        }
    }
}

impl OscConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.prefix.starts_with('/') || self.prefix.ends_with('/') {
            return Err(Error::InvalidConfig(format!(
                "osc.prefix must start with '/' and not end with one (found {:?})",
                self.prefix
            )));
        }
        if self.prefix.contains(['\0', ' ', '#', '*', '?', ',', '[', ']', '{', '}']) {
            return Err(Error::InvalidConfig(format!(
                "osc.prefix contains characters not allowed in an OSC address: {:?}",
                self.prefix
            )));
        }
        let encoder = OscEncoder::new(self.capacity);
        for button in Buttons::all() {
            let address = format!("{}/{}", self.prefix, button.name());
            encoder.encode(&address, Some("off")).map_err(|e| {
                Error::InvalidConfig(format!("osc.capacity can't hold {address}: {e}"))
            })?;
        }
        if self.enabled && self.host.trim().is_empty() {
            return Err(Error::InvalidConfig("osc.host must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        PadConfig::default().validate().unwrap();
        EncoderConfig::default().validate().unwrap();
        OscConfig::default().validate().unwrap();
    }

    #[test]
    fn pad_delays_convert_to_durations() {
        let cfg = PadConfig::default();
        assert_eq!(cfg.on_delay(), Duration::from_millis(5));
        assert_eq!(cfg.off_delay(), Duration::from_millis(10));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let cfg = PadConfig {
            low_threshold: 0.05,
            high_threshold: 0.04,
            ..PadConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn momentum_of_one_is_rejected() {
        let cfg = PadConfig {
            momentum: 1.0,
            ..PadConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn osc_capacity_must_fit_every_button() {
        // "/maschine/encoder_touch" pads to 24, plus 4 for ",s" and 4 for "off".
        let fits = OscConfig {
            capacity: 32,
            ..OscConfig::default()
        };
        fits.validate().unwrap();

        let short = OscConfig {
            capacity: 31,
            ..OscConfig::default()
        };
        assert!(matches!(short.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn osc_prefix_must_be_an_address() {
        for prefix in ["maschine", "/maschine/", "/mas chine", "/a#b"] {
            let cfg = OscConfig {
                prefix: prefix.to_string(),
                ..OscConfig::default()
            };
            assert!(cfg.validate().is_err(), "{prefix:?} should be rejected");
        }
    }
}
