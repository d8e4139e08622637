//! Interpretation core for the Maschine Mikro MK3 relay.
//!
//! Turns raw surface readings into MIDI messages, OSC datagrams and LED
//! feedback. Everything here is synchronous and free of I/O; the transports
//! plug in through the traits in [`router`].

pub mod config;
pub mod controls;
pub mod error;
pub mod lights;
pub mod midi;
pub mod osc;
pub mod pad;
pub mod quantizer;
pub mod report;
pub mod router;

pub use error::{Error, Result};
