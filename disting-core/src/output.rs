//! Where output voltages go once a frame is done.
//!
//! The OSC sink encodes each frame on the caller's thread and pushes it to
//! a bounded channel. A dedicated sender thread drains the channel and does
//! the `send_to`, keeping UDP I/O off the frame loop.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use disting_types::OUTPUT_COUNT;
use rosc::{OscMessage, OscPacket, OscType};

use crate::config::OscSettings;

/// Receives the eight output voltages once per frame.
pub trait OutputSink {
    fn send(&mut self, outputs: &[f32; OUTPUT_COUNT]);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn send(&mut self, _outputs: &[f32; OUTPUT_COUNT]) {}
}

/// Keeps every frame it was given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub frames: Vec<[f32; OUTPUT_COUNT]>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&[f32; OUTPUT_COUNT]> {
        self.frames.last()
    }
}

impl OutputSink for RecordingSink {
    fn send(&mut self, outputs: &[f32; OUTPUT_COUNT]) {
        self.frames.push(*outputs);
    }
}

/// Frames queued for the sender thread before new ones are dropped.
/// The sender drains far faster than the 60Hz producer.
const SEND_QUEUE_CAPACITY: usize = 64;

/// Encode one frame as an OSC message: `address f f f f f f f f`.
pub fn encode_outputs(address: &str, outputs: &[f32; OUTPUT_COUNT]) -> Result<Vec<u8>, rosc::OscError> {
    let packet = OscPacket::Message(OscMessage {
        addr: address.to_string(),
        args: outputs.iter().map(|v| OscType::Float(*v)).collect(),
    });
    rosc::encoder::encode(&packet)
}

pub struct OscOutputSink {
    address: String,
    tx: Option<Sender<Vec<u8>>>,
    handle: Option<JoinHandle<()>>,
    dropped: usize,
}

impl OscOutputSink {
    /// Bind a local UDP socket and start the sender thread.
    pub fn spawn(settings: &OscSettings) -> io::Result<Self> {
        let bind: SocketAddr = if settings.target.is_ipv4() {
            "0.0.0.0:0".parse().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
        } else {
            "[::]:0".parse().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
        };
        let socket = UdpSocket::bind(bind)?;
        let target = settings.target;

        let (tx, rx) = crossbeam_channel::bounded::<Vec<u8>>(SEND_QUEUE_CAPACITY);

        let handle = thread::Builder::new()
            .name("osc-sender".into())
            .spawn(move || sender_loop(socket, target, rx))?;

        log::info!(target: "output::osc", "streaming outputs to {} as {}", target, settings.address);
        Ok(Self {
            address: settings.address.clone(),
            tx: Some(tx),
            handle: Some(handle),
            dropped: 0,
        })
    }

    /// Frames dropped because the queue was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Close the queue and wait for the sender thread to drain it.
    pub fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!(target: "output::osc", "osc-sender thread panicked");
            }
        }
    }
}

impl OutputSink for OscOutputSink {
    fn send(&mut self, outputs: &[f32; OUTPUT_COUNT]) {
        let Some(tx) = &self.tx else { return };
        let encoded = match encode_outputs(&self.address, outputs) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!(target: "output::osc", "could not encode outputs: {:?}", e);
                return;
            }
        };
        match tx.try_send(encoded) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                log::debug!(target: "output::osc", "send queue full, dropping frame");
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!(target: "output::osc", "sender thread gone, disabling OSC output");
                self.tx = None;
            }
        }
    }
}

impl Drop for OscOutputSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sender_loop(socket: UdpSocket, target: SocketAddr, rx: Receiver<Vec<u8>>) {
    while let Ok(bytes) = rx.recv() {
        if let Err(e) = socket.send_to(&bytes, target) {
            log::debug!(target: "output::osc", "send to {} failed: {}", target, e);
        }
    }
}
