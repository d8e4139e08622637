use anyhow::{Context, Result};
use hidapi::{HidDevice, HidResult};
use log::{trace, warn};
use maschine_relay::lights::Lights;
use maschine_relay::midi::MidiTriplet;
use maschine_relay::router::{MidiOut, OscOut};
use midir::MidiOutputConnection;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

pub(crate) struct MidiPort {
    conn: MidiOutputConnection,
}

impl MidiPort {
    pub(crate) fn new(conn: MidiOutputConnection) -> Self {
        Self { conn }
    }
}

impl MidiOut for MidiPort {
    fn send_midi(&mut self, msg: MidiTriplet) {
        match self.conn.send(msg.bytes()) {
            Ok(()) => trace!("MIDI {msg}"),
            Err(e) => warn!("Dropped MIDI message ({msg}): {e}"),
        }
    }
}

pub(crate) struct UdpOscSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpOscSink {
    pub(crate) fn connect(host: &str, port: u16) -> Result<Self> {
        let target = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("can't resolve OSC target {host}:{port}"))?
            .next()
            .with_context(|| format!("OSC target {host}:{port} has no address"))?;
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind).context("can't bind OSC socket")?;
        socket
            .set_nonblocking(true)
            .context("can't make OSC socket non-blocking")?;
        Ok(Self { socket, target })
    }

    pub(crate) fn target(&self) -> SocketAddr {
        self.target
    }
}

impl OscOut for UdpOscSink {
    fn send_osc(&mut self, datagram: &[u8]) {
        if let Err(e) = self.socket.send_to(datagram, self.target) {
            warn!("Dropped OSC datagram to {}: {e}", self.target);
        }
    }
}

pub(crate) fn write_lights(device: &HidDevice, lights: &Lights) -> HidResult<()> {
    device.write(&lights.report())?;
    Ok(())
}
