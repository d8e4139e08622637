//! Pad pressure interpretation.
//!
//! Each pad runs an independent four-state machine over an exponentially
//! smoothed pressure value. Two thresholds form a dead band: the pad only
//! starts pressing above `high_threshold` and only starts releasing below
//! `low_threshold`. Both transitions must then hold for a dwell time before
//! a note starts or stops, which rejects contact bounce.

use crate::config::PadConfig;
use crate::error::{Error, Result};
use std::time::{Duration, Instant};

pub const PAD_COUNT: usize = 16;
/// Pads quiet for at least this long are re-fed their last sample.
pub const RESAMPLE_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PadState {
    Off,
    On,
    OnToOff,
    OffToOn,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PadAction {
    NoAction,
    NoteOn,
    NoteOff,
    Aftertouch,
}

/// Maps a pad index to its MIDI note. The bottom row plays the lowest notes.
///
/// `None` for an index past the last pad or a note above 127.
pub fn pad_note(base_note: u8, index: usize) -> Option<u8> {
    if index >= PAD_COUNT {
        return None;
    }
    let row = index / 4;
    let col = index % 4;
    base_note
        .checked_add((4 * (3 - row) + col) as u8)
        .filter(|note| *note <= 127)
}

#[derive(Clone, Debug)]
pub struct PadChannel {
    index: usize,
    state: PadState,
    smoothed: f32,
    last_sample: f32,
    last_sample_at: Option<Instant>,
    last_transition: Option<Instant>,
}

impl PadChannel {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            state: PadState::Off,
            smoothed: 0.0,
            last_sample: 0.0,
            last_sample_at: None,
            last_transition: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> PadState {
        self.state
    }

    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    pub fn last_sample(&self) -> f32 {
        self.last_sample
    }

    /// True while a note started by this pad is still sounding.
    pub fn is_sounding(&self) -> bool {
        matches!(self.state, PadState::On | PadState::OnToOff)
    }

    /// Feed one raw pressure sample taken at `now`. Non-finite samples read
    /// as no pressure.
    pub fn process(&mut self, config: &PadConfig, sample: f32, now: Instant) -> PadAction {
        let sample = if sample.is_finite() { sample } else { 0.0 };
        self.last_sample = sample;
        self.last_sample_at = Some(now);
        self.smoothed = config.momentum * self.smoothed + (1.0 - config.momentum) * sample;

        if self.smoothed < config.low_threshold {
            self.releasing(config, now)
        } else if self.smoothed > config.high_threshold {
            self.pressing(config, now)
        } else {
            PadAction::NoAction
        }
    }

    fn releasing(&mut self, config: &PadConfig, now: Instant) -> PadAction {
        match self.state {
            PadState::Off => PadAction::NoAction,
            PadState::On => {
                self.enter(PadState::OnToOff, now);
                PadAction::Aftertouch
            }
            PadState::OnToOff => {
                if self.dwell(now) < config.off_delay() {
                    PadAction::Aftertouch
                } else {
                    self.state = PadState::Off;
                    PadAction::NoteOff
                }
            }
            PadState::OffToOn => {
                self.state = PadState::Off;
                PadAction::NoAction
            }
        }
    }

    fn pressing(&mut self, config: &PadConfig, now: Instant) -> PadAction {
        match self.state {
            PadState::On => PadAction::Aftertouch,
            PadState::Off => {
                self.enter(PadState::OffToOn, now);
                PadAction::NoAction
            }
            PadState::OnToOff => {
                self.state = PadState::On;
                PadAction::Aftertouch
            }
            PadState::OffToOn => {
                if self.dwell(now) < config.on_delay() {
                    PadAction::NoAction
                } else {
                    self.state = PadState::On;
                    PadAction::NoteOn
                }
            }
        }
    }

    fn enter(&mut self, state: PadState, now: Instant) {
        self.state = state;
        self.last_transition = Some(now);
    }

    fn dwell(&self, now: Instant) -> Duration {
        self.last_transition
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(Duration::MAX)
    }

    /// Whether re-feeding the last sample can still move the state.
    ///
    /// A pad held steady in `On` cannot, and re-feeding it would only
    /// repeat the same aftertouch.
    fn is_settling(&self, config: &PadConfig) -> bool {
        match self.state {
            PadState::Off => self.last_sample > config.high_threshold,
            PadState::On => self.last_sample < config.low_threshold,
            PadState::OffToOn | PadState::OnToOff => true,
        }
    }

    fn is_quiet(&self, now: Instant) -> bool {
        self.last_sample_at
            .is_none_or(|t| now.saturating_duration_since(t) >= RESAMPLE_INTERVAL)
    }

    /// Pressure shaped by the velocity curve, scaled to 0..=127.
    pub fn velocity(&self, config: &PadConfig) -> u8 {
        let shaped = self.smoothed.max(0.0).powf(config.velocity_exponent);
        (shaped * 127.0).round().clamp(0.0, 127.0) as u8
    }

    /// Drop back to `Off` with no pressure, e.g. on shutdown.
    pub fn reset(&mut self) {
        self.state = PadState::Off;
        self.smoothed = 0.0;
        self.last_sample = 0.0;
        self.last_sample_at = None;
        self.last_transition = None;
    }
}

/// All sixteen pads of the surface, sharing one calibration.
#[derive(Clone, Debug)]
pub struct PadBank {
    config: PadConfig,
    channels: [PadChannel; PAD_COUNT],
}

impl PadBank {
    pub fn new(config: PadConfig) -> Self {
        Self {
            config,
            channels: std::array::from_fn(PadChannel::new),
        }
    }

    pub fn config(&self) -> &PadConfig {
        &self.config
    }

    pub fn channel(&self, index: usize) -> Result<&PadChannel> {
        self.channels.get(index).ok_or(Error::InvalidPad { index })
    }

    pub fn channels(&self) -> &[PadChannel] {
        &self.channels
    }

    pub fn process(&mut self, index: usize, sample: f32, now: Instant) -> Result<PadAction> {
        let channel = self
            .channels
            .get_mut(index)
            .ok_or(Error::InvalidPad { index })?;
        if !sample.is_finite() {
            return Err(Error::NonFiniteSample { index });
        }
        Ok(channel.process(&self.config, sample, now))
    }

    /// Velocity of the given pad as it would be reported right now.
    pub fn velocity(&self, index: usize) -> Result<u8> {
        Ok(self.channel(index)?.velocity(&self.config))
    }

    /// Re-feed each pad that is still settling, and has not been sampled for
    /// [`RESAMPLE_INTERVAL`], with its last sample.
    ///
    /// The surface stops reporting a pad once its reading settles, so the
    /// dwell timers would otherwise never resolve.
    pub fn resample(&mut self, now: Instant) -> Vec<(usize, PadAction)> {
        let config = &self.config;
        self.channels
            .iter_mut()
            .filter(|c| c.is_settling(config) && c.is_quiet(now))
            .map(|c| {
                let sample = c.last_sample;
                (c.index, c.process(config, sample, now))
            })
            .collect()
    }

    /// Reset every pad, returning the indices that were still sounding.
    pub fn release_all(&mut self) -> Vec<usize> {
        let mut sounding = Vec::new();
        for channel in self.channels.iter_mut() {
            if channel.is_sounding() {
                sounding.push(channel.index);
            }
            channel.reset();
        }
        sounding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BELOW: f32 = 0.0;
    const BETWEEN: f32 = 0.02;
    const ABOVE: f32 = 0.5;

    // Momentum 0 so a single sample lands exactly in the wanted zone.
    fn direct() -> PadConfig {
        PadConfig {
            momentum: 0.0,
            ..PadConfig::default()
        }
    }

    fn channel_in(state: PadState, since: Instant) -> PadChannel {
        let mut c = PadChannel::new(0);
        c.state = state;
        c.last_transition = Some(since);
        c
    }

    #[test]
    fn transition_table() {
        let cfg = direct();
        let t0 = Instant::now();
        let early = t0 + Duration::from_millis(1);
        let late = t0 + Duration::from_millis(50);

        use PadAction::*;
        use PadState::*;
        #[rustfmt::skip]
        let table = [
            // state,  sample,  now,   next,    action
            (Off,      BELOW,   late,  Off,     NoAction),
            (Off,      BETWEEN, late,  Off,     NoAction),
            (Off,      ABOVE,   late,  OffToOn, NoAction),
            (On,       BELOW,   late,  OnToOff, Aftertouch),
            (On,       BETWEEN, late,  On,      NoAction),
            (On,       ABOVE,   late,  On,      Aftertouch),
            (OnToOff,  BELOW,   early, OnToOff, Aftertouch),
            (OnToOff,  BELOW,   late,  Off,     NoteOff),
            (OnToOff,  BETWEEN, late,  OnToOff, NoAction),
            (OnToOff,  ABOVE,   late,  On,      Aftertouch),
            (OffToOn,  BELOW,   late,  Off,     NoAction),
            (OffToOn,  BETWEEN, late,  OffToOn, NoAction),
            (OffToOn,  ABOVE,   early, OffToOn, NoAction),
            (OffToOn,  ABOVE,   late,  On,      NoteOn),
        ];

        for (state, sample, now, next, action) in table {
            let mut c = channel_in(state, t0);
            let got = c.process(&cfg, sample, now);
            assert_eq!(
                (c.state(), got),
                (next, action),
                "from {state:?} with sample {sample}"
            );
        }
    }

    #[test]
    fn entering_a_transitional_state_restarts_the_timer() {
        let cfg = direct();
        let t0 = Instant::now();
        let mut c = channel_in(PadState::On, t0);

        let t1 = t0 + Duration::from_millis(100);
        assert_eq!(c.process(&cfg, BELOW, t1), PadAction::Aftertouch);
        assert_eq!(c.last_transition, Some(t1));

        // Only 9ms since entering OnToOff, the old timestamp must not count.
        let t2 = t1 + Duration::from_millis(9);
        assert_eq!(c.process(&cfg, BELOW, t2), PadAction::Aftertouch);
        let t3 = t1 + Duration::from_millis(10);
        assert_eq!(c.process(&cfg, BELOW, t3), PadAction::NoteOff);
    }

    #[test]
    fn bounce_shorter_than_on_delay_never_starts_a_note() {
        let cfg = PadConfig::default();
        let t0 = Instant::now();
        let mut c = PadChannel::new(3);

        // 0.25 * 0.2 = 0.05, just over the high threshold.
        let mut actions = vec![c.process(&cfg, 0.25, t0)];
        assert_eq!(c.state(), PadState::OffToOn);

        for ms in 1..40 {
            actions.push(c.process(&cfg, 0.0, t0 + Duration::from_micros(ms * 100)));
        }

        assert!(!actions.contains(&PadAction::NoteOn));
        assert_eq!(c.state(), PadState::Off);
    }

    #[test]
    fn held_pad_only_sends_aftertouch() {
        let cfg = direct();
        let t0 = Instant::now();
        let mut c = PadChannel::new(0);

        assert_eq!(c.process(&cfg, ABOVE, t0), PadAction::NoAction);
        assert_eq!(
            c.process(&cfg, ABOVE, t0 + Duration::from_millis(5)),
            PadAction::NoteOn
        );
        for ms in 6..100 {
            assert_eq!(
                c.process(&cfg, ABOVE, t0 + Duration::from_millis(ms)),
                PadAction::Aftertouch
            );
        }

        // A full release and a new press start a second note.
        let t1 = t0 + Duration::from_millis(200);
        c.process(&cfg, BELOW, t1);
        assert_eq!(
            c.process(&cfg, BELOW, t1 + Duration::from_millis(10)),
            PadAction::NoteOff
        );
        let t2 = t1 + Duration::from_millis(20);
        c.process(&cfg, ABOVE, t2);
        assert_eq!(
            c.process(&cfg, ABOVE, t2 + Duration::from_millis(5)),
            PadAction::NoteOn
        );
    }

    #[test]
    fn smoothing_follows_momentum() {
        let cfg = PadConfig::default();
        let mut c = PadChannel::new(0);
        let now = Instant::now();
        c.process(&cfg, 1.0, now);
        assert!((c.smoothed() - 0.2).abs() < 1e-6);
        c.process(&cfg, 1.0, now);
        assert!((c.smoothed() - 0.36).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_samples_do_not_panic() {
        let cfg = PadConfig::default();
        let mut c = PadChannel::new(0);
        let now = Instant::now();
        c.process(&cfg, -3.0, now);
        assert_eq!(c.state(), PadState::Off);
        assert_eq!(c.velocity(&cfg), 0);
        for _ in 0..20 {
            c.process(&cfg, 40.0, now);
        }
        assert_eq!(c.velocity(&cfg), 127);
    }

    #[test]
    fn velocity_uses_the_curve() {
        let cfg = direct();
        let mut c = PadChannel::new(0);
        c.process(&cfg, 0.25, Instant::now());
        // sqrt(0.25) = 0.5
        assert_eq!(c.velocity(&cfg), 64);
    }

    #[test]
    fn notes_follow_row_inverted_grid() {
        let expected: [u8; 16] = [
            48, 49, 50, 51, //
            44, 45, 46, 47, //
            40, 41, 42, 43, //
            36, 37, 38, 39,
        ];
        for (index, note) in expected.iter().enumerate() {
            assert_eq!(pad_note(36, index), Some(*note), "pad {index}");
        }
        assert_eq!(pad_note(0, 0), Some(12));
        assert_eq!(pad_note(0, 15), Some(3));
    }

    #[test]
    fn notes_outside_midi_range_are_none() {
        assert_eq!(pad_note(112, 0), Some(124));
        assert_eq!(pad_note(120, 0), None);
        assert_eq!(pad_note(250, 0), None);
        assert_eq!(pad_note(36, 16), None);
    }

    #[test]
    fn bank_rejects_bad_index() {
        let mut bank = PadBank::new(PadConfig::default());
        assert_eq!(
            bank.process(16, 0.5, Instant::now()),
            Err(Error::InvalidPad { index: 16 })
        );
        assert!(bank.channel(99).is_err());
    }

    #[test]
    fn non_finite_samples_do_not_stick_a_note() {
        let mut bank = PadBank::new(direct());
        let t0 = Instant::now();
        bank.process(0, ABOVE, t0).unwrap();
        assert_eq!(
            bank.process(0, ABOVE, t0 + Duration::from_millis(5)),
            Ok(PadAction::NoteOn)
        );

        let t1 = t0 + Duration::from_millis(6);
        for sample in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert_eq!(
                bank.process(0, sample, t1),
                Err(Error::NonFiniteSample { index: 0 })
            );
        }
        let c = bank.channel(0).unwrap();
        assert_eq!(c.state(), PadState::On);
        assert!(c.smoothed().is_finite());

        bank.process(0, BELOW, t1).unwrap();
        assert_eq!(
            bank.process(0, BELOW, t1 + Duration::from_millis(10)),
            Ok(PadAction::NoteOff)
        );
    }

    #[test]
    fn channel_reads_nan_as_no_pressure() {
        let cfg = PadConfig::default();
        let t0 = Instant::now();
        let mut c = channel_in(PadState::On, t0);
        c.process(&cfg, f32::NAN, t0);
        assert!(c.smoothed().is_finite());
        for ms in 1..100 {
            c.process(&cfg, 0.0, t0 + Duration::from_millis(ms));
        }
        assert_eq!(c.state(), PadState::Off);
    }

    #[test]
    fn bank_channels_are_independent() {
        let cfg = direct();
        let mut bank = PadBank::new(cfg);
        let t0 = Instant::now();
        bank.process(2, ABOVE, t0).unwrap();
        assert_eq!(bank.channel(2).unwrap().state(), PadState::OffToOn);
        for (i, c) in bank.channels().iter().enumerate() {
            assert_eq!(c.index(), i);
            if i != 2 {
                assert_eq!(c.state(), PadState::Off);
            }
        }
    }

    #[test]
    fn resample_resolves_pending_release() {
        let mut bank = PadBank::new(direct());
        let t0 = Instant::now();
        bank.process(5, ABOVE, t0).unwrap();
        assert_eq!(
            bank.process(5, ABOVE, t0 + Duration::from_millis(5)),
            Ok(PadAction::NoteOn)
        );
        bank.process(5, BELOW, t0 + Duration::from_millis(6)).unwrap();

        // No more reports arrive from the surface.
        let actions = bank.resample(t0 + Duration::from_millis(20));
        assert_eq!(actions, vec![(5, PadAction::NoteOff)]);
        assert!(bank.resample(t0 + Duration::from_millis(30)).is_empty());
    }

    #[test]
    fn resample_skips_freshly_sampled_pads() {
        let mut bank = PadBank::new(direct());
        let t0 = Instant::now();
        bank.process(0, ABOVE, t0).unwrap();
        assert!(bank.resample(t0).is_empty());
        assert_eq!(
            bank.resample(t0 + Duration::from_millis(5)),
            vec![(0, PadAction::NoteOn)]
        );
    }

    #[test]
    fn resample_leaves_a_steady_hold_alone() {
        let mut bank = PadBank::new(direct());
        let t0 = Instant::now();
        bank.process(0, ABOVE, t0).unwrap();
        bank.process(0, ABOVE, t0 + Duration::from_millis(5)).unwrap();

        for ms in 6..1000 {
            assert!(bank.resample(t0 + Duration::from_millis(ms)).is_empty());
        }
        assert_eq!(bank.channel(0).unwrap().state(), PadState::On);
    }

    #[test]
    fn resample_follows_a_settled_light_touch_down() {
        let mut bank = PadBank::new(PadConfig::default());
        let t0 = Instant::now();
        for ms in 0..40 {
            bank.process(1, 1.0, t0 + Duration::from_millis(ms)).unwrap();
        }
        assert_eq!(bank.channel(1).unwrap().state(), PadState::On);

        // The surface reports one last light reading, then goes quiet.
        bank.process(1, 0.0, t0 + Duration::from_millis(40)).unwrap();
        let actions: Vec<_> = (41..200)
            .flat_map(|ms| bank.resample(t0 + Duration::from_millis(ms)))
            .collect();
        assert_eq!(actions.last(), Some(&(1, PadAction::NoteOff)));
        assert_eq!(bank.channel(1).unwrap().state(), PadState::Off);
    }

    #[test]
    fn release_all_reports_sounding_pads() {
        let mut bank = PadBank::new(direct());
        let t0 = Instant::now();
        for index in [1, 7] {
            bank.process(index, ABOVE, t0).unwrap();
            bank.process(index, ABOVE, t0 + Duration::from_millis(5)).unwrap();
        }
        bank.process(9, ABOVE, t0).unwrap();

        assert_eq!(bank.release_all(), vec![1, 7]);
        assert!(bank.channels().iter().all(|c| c.state() == PadState::Off));
    }
}
