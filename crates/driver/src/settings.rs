use anyhow::{Result, bail};
use config::Config;
use maschine_relay::config::{EncoderConfig, OscConfig, PadConfig};
use maschine_relay::lights::{Brightness, PadColors};
use maschine_relay::router::MidiMapping;
use serde::Deserialize;

const ENV_PREFIX: &str = "MASCHINE_RELAY";

#[derive(Deserialize, Debug)]
#[serde(default)]
pub(crate) struct Settings {
    pub client_name: String,
    pub port_name: String,
    pub midi: MidiMapping,
    /// If true, treat "LED Off" for buttons as a low backlight instead.
    /// Useful as a "night mode" so you can see buttons in the dark.
    pub backlight_buttons: bool,
    /// Backlight level for buttons when `backlight_buttons = true`.
    /// Valid values: "dim", "normal", "bright".
    pub backlight_brightness: Brightness,
    /// Colour of lit pads, e.g. "blue", "light_orange", "white".
    pub pad_color: PadColors,
    pub pad: PadConfig,
    pub encoder: EncoderConfig,
    pub osc: OscConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_name: "Maschine Mikro MK3".to_string(),
            port_name: "Maschine Mikro MK3 MIDI Out".to_string(),
            midi: MidiMapping::default(),
            backlight_buttons: false,
            backlight_brightness: Brightness::Dim,
            pad_color: PadColors::Blue,
            pad: PadConfig::default(),
            encoder: EncoderConfig::default(),
            osc: OscConfig::default(),
        }
    }
}

impl Settings {
    /// Defaults, overlaid by the config file (if any), overlaid by
    /// `MASCHINE_RELAY__SECTION__KEY` environment variables.
    pub(crate) fn load(path: Option<&str>) -> Result<Self> {
        let mut cfg = Config::builder();
        if let Some(path) = path {
            cfg = cfg.add_source(config::File::with_name(path));
        }
        cfg = cfg.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
        Self::from_config(cfg.build()?)
    }

    fn from_config(cfg: Config) -> Result<Self> {
        let settings: Settings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.client_name.is_empty() {
            bail!("Client name must not be empty");
        }

        if self.port_name.is_empty() {
            bail!("Port name must not be empty");
        }

        if self.backlight_brightness == Brightness::Off {
            bail!("backlight_brightness must be one of: \"dim\", \"normal\", \"bright\"");
        }

        if self.pad_color == PadColors::Off {
            bail!("pad_color must be an actual colour");
        }

        self.midi.validate()?;
        self.pad.validate()?;
        self.encoder.validate()?;
        self.osc.validate()?;
        Ok(())
    }
}
