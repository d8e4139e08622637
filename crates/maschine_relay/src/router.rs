//! Dispatch of surface events to MIDI, OSC and LED feedback.

use crate::config::{EncoderConfig, OscConfig, PadConfig};
use crate::controls::Buttons;
use crate::error::{Error, Result};
use crate::midi::MidiTriplet;
use crate::osc::OscEncoder;
use crate::pad::{PadAction, PadBank, pad_note};
use crate::quantizer::Quantizer;
use crate::report::SurfaceEvent;
use log::{debug, info};
use serde::Deserialize;
use std::time::Instant;

/// Sink for outgoing MIDI. Delivery is fire-and-forget.
pub trait MidiOut {
    fn send_midi(&mut self, msg: MidiTriplet);
}

/// Sink for outgoing OSC datagrams. Delivery is fire-and-forget.
pub trait OscOut {
    fn send_osc(&mut self, datagram: &[u8]);
}

impl<T: OscOut> OscOut for Option<T> {
    fn send_osc(&mut self, datagram: &[u8]) {
        if let Some(out) = self {
            out.send_osc(datagram);
        }
    }
}

/// LED feedback. Intensities are 8-bit, 0 is off and 0xff full on.
pub trait Feedback {
    fn set_pad(&mut self, index: usize, intensity: u8);
    fn set_button(&mut self, button: Buttons, intensity: u8);
    fn set_slider(&mut self, position: u8);
}

/// Where each control lands on the MIDI side.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MidiMapping {
    pub channel: u8,
    /// Note of the bottom-left pad.
    pub base_note: u8,
    /// Buttons use consecutive CCs starting here.
    pub button_cc_offset: u8,
    pub encoder_cc: u8,
    pub slider_cc: u8,
}

impl Default for MidiMapping {
    fn default() -> Self {
        Self {
            channel: 0,
            base_note: 36,
            button_cc_offset: 20,
            encoder_cc: 1,
            slider_cc: 9,
        }
    }
}

impl MidiMapping {
    pub fn validate(&self) -> Result<()> {
        if self.channel > 15 {
            return Err(Error::InvalidConfig(format!(
                "MIDI channel should be 0 to 15 (found {})",
                self.channel
            )));
        }
        if self.base_note as usize + 15 > 127 {
            return Err(Error::InvalidConfig(format!(
                "base_note {} puts the top pad above note 127",
                self.base_note
            )));
        }
        let last_button_cc = self.button_cc_offset as usize + Buttons::EncoderTouch as usize;
        if last_button_cc > 127 {
            return Err(Error::InvalidConfig(format!(
                "button CCs would run up to {last_button_cc}, above 127"
            )));
        }
        if self.encoder_cc > 127 || self.slider_cc > 127 {
            return Err(Error::InvalidConfig(
                "MIDI CC numbers should be 0 to 127".to_string(),
            ));
        }
        Ok(())
    }
}

fn to_intensity(value: u8) -> u8 {
    (value as u16 * 0xff / 127) as u8
}

pub struct Router<M, O, F> {
    pads: PadBank,
    quantizer: Quantizer,
    osc_encoder: OscEncoder,
    osc_prefix: String,
    mapping: MidiMapping,
    midi: M,
    osc: O,
    feedback: F,
}

impl<M: MidiOut, O: OscOut, F: Feedback> Router<M, O, F> {
    pub fn new(
        mapping: MidiMapping,
        pad: PadConfig,
        encoder: &EncoderConfig,
        osc: &OscConfig,
        midi: M,
        osc_out: O,
        feedback: F,
    ) -> Result<Self> {
        mapping.validate()?;
        pad.validate()?;
        encoder.validate()?;
        osc.validate()?;
        Ok(Self {
            pads: PadBank::new(pad),
            quantizer: Quantizer::new(encoder),
            osc_encoder: OscEncoder::new(osc.capacity),
            osc_prefix: osc.prefix.clone(),
            mapping,
            midi,
            osc: osc_out,
            feedback,
        })
    }

    pub fn handle(&mut self, event: SurfaceEvent, now: Instant) -> Result<()> {
        match event {
            SurfaceEvent::Pad { index, sample } => self.pad(index, sample, now).map(|_| ()),
            SurfaceEvent::Button { button, pressed } => self.button(button, pressed),
            SurfaceEvent::Encoder { delta } => self.encoder(delta).map(|_| ()),
            SurfaceEvent::Slider { position } => {
                self.slider(position);
                Ok(())
            }
        }
    }

    pub fn pad(&mut self, index: usize, sample: f32, now: Instant) -> Result<PadAction> {
        let action = self.pads.process(index, sample, now)?;
        self.emit_pad(index, action);
        Ok(action)
    }

    fn emit_pad(&mut self, index: usize, action: PadAction) {
        let Some(note) = pad_note(self.mapping.base_note, index) else {
            return;
        };
        let channel = self.mapping.channel;
        let velocity = self.pads.velocity(index).unwrap_or_default();

        match action {
            PadAction::NoAction => {}
            PadAction::NoteOn => {
                let velocity = velocity.max(1);
                self.midi.send_midi(MidiTriplet::note_on(channel, note, velocity));
                self.feedback.set_pad(index, to_intensity(velocity));
                info!("Pad {index} Note On {note} vel {velocity}");
            }
            PadAction::Aftertouch => {
                self.midi.send_midi(MidiTriplet::aftertouch(channel, note, velocity));
                // Stay lit while the note is sounding.
                self.feedback.set_pad(index, to_intensity(velocity).max(1));
            }
            PadAction::NoteOff => {
                self.midi.send_midi(MidiTriplet::note_off(channel, note));
                self.feedback.set_pad(index, 0);
                debug!("Pad {index} Note Off {note}");
            }
        }
    }

    /// Send a button edge as CC, LED and OSC. Nothing is sent if the OSC
    /// message can't be encoded.
    pub fn button(&mut self, button: Buttons, pressed: bool) -> Result<()> {
        let address = format!("{}/{}", self.osc_prefix, button.name());
        let datagram = self
            .osc_encoder
            .encode(&address, Some(if pressed { "on" } else { "off" }))?;

        let cc = self.mapping.button_cc_offset + button as u8;
        let value = if pressed { 127 } else { 0 };
        self.midi
            .send_midi(MidiTriplet::control_change(self.mapping.channel, cc, value));
        self.feedback.set_button(button, if pressed { 0xff } else { 0 });
        if pressed {
            info!("Button {button:?} pressed -> CC {cc} = 127");
        }

        self.osc.send_osc(&datagram);
        Ok(())
    }

    /// Send a relative CC for an encoder turn, returning the value sent.
    pub fn encoder(&mut self, delta: f32) -> Result<u8> {
        if !delta.is_finite() {
            return Err(Error::NonFiniteDelta);
        }
        let value = self.quantizer.quantize(delta);
        let cc = self.mapping.encoder_cc;
        self.midi
            .send_midi(MidiTriplet::control_change(self.mapping.channel, cc, value));
        debug!("Encoder turn {delta} -> CC {cc} = {value}");
        Ok(value)
    }

    /// Absolute slider position, 1..=201 from the surface.
    pub fn slider(&mut self, position: u8) {
        let value = (position.saturating_sub(1) as u16 * 127 / 200).min(127) as u8;
        let cc = self.mapping.slider_cc;
        self.midi
            .send_midi(MidiTriplet::control_change(self.mapping.channel, cc, value));
        self.feedback.set_slider(position);
        debug!("Slider {position} -> CC {cc} = {value}");
    }

    /// Let dwell timers run out on pads the surface has stopped reporting.
    pub fn idle(&mut self, now: Instant) {
        for (index, action) in self.pads.resample(now) {
            self.emit_pad(index, action);
        }
    }

    /// Stop every sounding note and clear the pad LEDs.
    pub fn release_all(&mut self) {
        let sounding = self.pads.release_all();
        for index in 0..self.pads.channels().len() {
            if sounding.contains(&index) {
                self.emit_pad(index, PadAction::NoteOff);
            } else {
                self.feedback.set_pad(index, 0);
            }
        }
        if !sounding.is_empty() {
            info!("Released {} held pads", sounding.len());
        }
    }

    pub fn pads(&self) -> &PadBank {
        &self.pads
    }

    pub fn midi(&self) -> &M {
        &self.midi
    }

    pub fn osc(&self) -> &O {
        &self.osc
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn feedback_mut(&mut self) -> &mut F {
        &mut self.feedback
    }
}
