mod settings;
mod transport;

use crate::settings::Settings;
use crate::transport::{MidiPort, UdpOscSink, write_lights};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use env_logger::Env;
use hidapi::HidDevice;
use log::{info, warn};
use maschine_relay::controls::Buttons;
use maschine_relay::lights::Lights;
use maschine_relay::report::ReportDecoder;
use maschine_relay::router::{MidiOut, OscOut, Router};
use midir::MidiOutput;
use midir::os::unix::VirtualOutput;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

const VID: u16 = 0x17cc;
const PID: u16 = 0x1700;

#[derive(Parser, Debug)]
#[clap(
    name = "Maschine Mikro MK3 MIDI/OSC relay",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
)]
struct Args {
    #[clap(short, long, help = "Config file (see example_config.toml)")]
    config: Option<String>,

    #[clap(long, help = "Don't forward buttons over OSC, whatever the config says")]
    no_osc: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("Can't load settings")?;
    if args.no_osc {
        settings.osc.enabled = false;
    }

    info!("Running with settings:");
    info!("{settings:?}");

    // Create MIDI output port
    let output = MidiOutput::new(&settings.client_name)
        .map_err(|e| anyhow!("Couldn't open MIDI output: {e}"))?;
    let port = output
        .create_virtual(&settings.port_name)
        .map_err(|e| anyhow!("Couldn't create virtual output port: {e}"))?;

    let osc = if settings.osc.enabled {
        let sink = UdpOscSink::connect(&settings.osc.host, settings.osc.port)?;
        info!("Forwarding buttons over OSC to {}", sink.target());
        Some(sink)
    } else {
        None
    };

    let mut lights = Lights::new().with_pad_color(settings.pad_color);
    if settings.backlight_buttons {
        lights = lights.with_backlight(settings.backlight_brightness);
    }

    let api = hidapi::HidApi::new()?;
    let device = api
        .open(VID, PID)
        .context("Can't open Maschine Mikro MK3 (is it plugged in?)")?;
    device.set_blocking_mode(false)?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let mut router = Router::new(
        settings.midi.clone(),
        settings.pad.clone(),
        &settings.encoder,
        &settings.osc,
        MidiPort::new(port),
        osc,
        lights,
    )?;

    print_mapping(&settings);

    let result = main_loop(&device, &mut router, &running);

    // Never leave notes hanging, even if the device went away.
    router.release_all();
    router.feedback_mut().clear();
    if let Err(e) = write_lights(&device, router.feedback()) {
        warn!("Couldn't clear LEDs on exit: {e}");
    }

    result
}

fn print_mapping(settings: &Settings) {
    let midi = &settings.midi;
    info!("MIDI mapping (channel {}):", midi.channel + 1);
    info!(
        "  Pads:    notes {}-{} (bottom-left pad is {})",
        midi.base_note,
        midi.base_note + 15,
        midi.base_note
    );
    info!(
        "  Buttons: CC {}-{} (value 127=press, 0=release)",
        midi.button_cc_offset,
        midi.button_cc_offset + Buttons::EncoderTouch as u8
    );
    info!(
        "  Encoder: CC {} (relative: 65+=CW, 64-=CCW)",
        midi.encoder_cc
    );
    info!("  Slider:  CC {} (0-127)", midi.slider_cc);
    if settings.osc.enabled {
        info!("  OSC:     {}/<button> \"on\"/\"off\"", settings.osc.prefix);
    }
}

fn main_loop<M: MidiOut, O: OscOut>(
    device: &HidDevice,
    router: &mut Router<M, O, Lights>,
    running: &AtomicBool,
) -> Result<()> {
    let mut buf = [0u8; 64];
    let mut decoder = ReportDecoder::new();

    while running.load(Ordering::SeqCst) {
        let size = device.read_timeout(&mut buf, 1)?;
        let now = Instant::now();

        for event in decoder.decode(&buf[..size], now) {
            if let Err(e) = router.handle(event, now) {
                warn!("Dropped {event:?}: {e}");
            }
        }

        // Pads the surface stopped reporting still need their timers run.
        router.idle(now);

        if router.feedback_mut().take_dirty() {
            write_lights(device, router.feedback())?;
        }
    }

    info!("Shutting down");
    Ok(())
}
