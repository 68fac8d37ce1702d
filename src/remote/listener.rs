//! UDP transport for remote parameter control.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use super::osc::{decode_packet, encode_message, OscMessage};
use crate::error::{Result, SculptError};
use crate::params::ParamValue;

/// Default UDP port for remote control
pub const DEFAULT_PORT: u16 = 57110;

/// Largest datagram accepted
const MAX_PACKET: usize = 8192;

/// Poll interval for the stop flag while waiting for packets
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Request to set one parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamUpdate {
    pub address: String,
    pub value: ParamValue,
}

impl ParamUpdate {
    pub fn new(address: impl Into<String>, value: ParamValue) -> Self {
        Self {
            address: address.into(),
            value,
        }
    }

    /// `None` when the message arguments do not form a parameter value
    pub fn from_message(msg: &OscMessage) -> Option<Self> {
        msg.to_param_value()
            .map(|value| Self::new(msg.address.clone(), value))
    }
}

/// Background thread that receives OSC packets and forwards parameter updates
pub struct RemoteListener {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RemoteListener {
    /// Bind `addr` and start receiving. Updates arrive on the returned channel.
    pub fn spawn(addr: impl ToSocketAddrs) -> Result<(Self, Receiver<ParamUpdate>)> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        let local_addr = socket.local_addr()?;

        let (tx, rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("remote-listener".into())
            .spawn(move || receive_loop(socket, tx, thread_running))?;

        info!("Listening for remote control on {}", local_addr);
        Ok((
            Self {
                local_addr,
                running,
                handle: Some(handle),
            },
            rx,
        ))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RemoteListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop(socket: UdpSocket, tx: Sender<ParamUpdate>, running: Arc<AtomicBool>) {
    let mut buf = [0u8; MAX_PACKET];
    while running.load(Ordering::Relaxed) {
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(e) => {
                warn!("Remote control socket error: {}", e);
                continue;
            }
        };

        let messages = match decode_packet(&buf[..len]) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Dropping packet from {}: {}", from, e);
                continue;
            }
        };

        for msg in messages {
            match ParamUpdate::from_message(&msg) {
                Some(update) => {
                    debug!("Remote {} <- {}", update.address, update.value);
                    if tx.send(update).is_err() {
                        // Receiver gone, nothing left to do
                        return;
                    }
                }
                None => warn!("Ignoring {} with {} arguments", msg.address, msg.args.len()),
            }
        }
    }
}

/// Sends parameter values to a remote controller so it can mirror state
pub struct RemoteSender {
    socket: UdpSocket,
}

impl RemoteSender {
    pub fn connect(target: impl ToSocketAddrs) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(target)?;
        Ok(Self { socket })
    }

    pub fn send(&self, address: &str, value: &ParamValue) -> Result<()> {
        let packet = encode_message(&OscMessage::from_param(address, value));
        let sent = self.socket.send(&packet)?;
        if sent != packet.len() {
            return Err(SculptError::Protocol(format!(
                "sent {} of {} bytes",
                sent,
                packet.len()
            )));
        }
        Ok(())
    }

    /// Send every value in `changes`, logging failures
    pub fn broadcast(&self, changes: &[(String, ParamValue)]) {
        for (address, value) in changes {
            if let Err(e) = self.send(address, value) {
                warn!("Failed to send {}: {}", address, e);
            }
        }
    }
}
