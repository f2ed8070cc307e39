//! Output capability: anything that can accept "buffer + metadata".
//!
//! The engine fans each packet out to two typed groups of sinks, one for the
//! `f32` buffer and one for its `i16` twin. Within a step the groups are
//! independent; both always see the same timestamp and stream id.
//!
//! Built-in sinks:
//! - [`ChannelSink`] : hands events to a bounded `crossbeam-channel`; a full
//!   channel blocks the producer up to a timeout (back-pressure, no drops)
//! - [`MemorySink`]  : records everything in memory; cloning shares storage

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::{Result, SigGenError};
use crate::packet::{Buffer, Packet};
use crate::sri::Sri;

/// A typed consumer of buffers.
pub trait Sink<T>: Send {
    /// Used in error messages and logs.
    fn name(&self) -> &str { "sink" }

    /// Called once per SRI change, before the first buffer that uses it.
    fn announce(&mut self, sri: &Sri) -> Result<()>;

    /// Called once per buffer (including the final end-of-stream marker).
    fn emit(&mut self, buffer: &Buffer<T>, sri: &Sri) -> Result<()>;
}

/// The two sink groups a runner drives.
#[derive(Default)]
pub struct Outputs {
    float: Vec<Box<dyn Sink<f32>>>,
    fixed: Vec<Box<dyn Sink<i16>>>,
}

impl Outputs {
    pub fn new() -> Self { Self::default() }

    pub fn with_float(mut self, sink: impl Sink<f32> + 'static) -> Self { self.add_float(sink); self }
    pub fn with_fixed(mut self, sink: impl Sink<i16> + 'static) -> Self { self.add_fixed(sink); self }

    pub fn add_float(&mut self, sink: impl Sink<f32> + 'static) { self.float.push(Box::new(sink)); }
    pub fn add_fixed(&mut self, sink: impl Sink<i16> + 'static) { self.fixed.push(Box::new(sink)); }

    pub fn len(&self) -> usize { self.float.len() + self.fixed.len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Announce `sri` on every sink.
    pub fn announce(&mut self, sri: &Sri) -> Result<()> {
        for s in &mut self.float {
            s.announce(sri)?;
        }
        for s in &mut self.fixed {
            s.announce(sri)?;
        }
        Ok(())
    }

    /// Emit both twins of `packet`.
    pub fn emit(&mut self, packet: &Packet) -> Result<()> {
        for s in &mut self.float {
            s.emit(&packet.float, &packet.sri)?;
        }
        for s in &mut self.fixed {
            s.emit(&packet.fixed, &packet.sri)?;
        }
        Ok(())
    }

    /// Announce if flagged, then emit.
    pub fn deliver(&mut self, packet: &Packet) -> Result<()> {
        if packet.announce {
            self.announce(&packet.sri)?;
        }
        self.emit(packet)
    }
}

/// What a sink observed, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent<T> {
    Announce(Sri),
    Data { buffer: Buffer<T>, sri: Sri },
}

impl<T> SinkEvent<T> {
    pub fn buffer(&self) -> Option<&Buffer<T>> {
        match self {
            SinkEvent::Data { buffer, .. } => Some(buffer),
            SinkEvent::Announce(_) => None,
        }
    }
}

// ---------------------------------- ChannelSink ----------------------------------

/// Forwards events over a bounded channel.
pub struct ChannelSink<T> {
    name: String,
    tx: Sender<SinkEvent<T>>,
    timeout: Duration,
}

impl<T: Clone + Send> ChannelSink<T> {
    /// Sink plus the receiving end. A full channel blocks `emit` for at most
    /// `timeout` before the sink reports failure.
    pub fn bounded(name: impl Into<String>, capacity: usize, timeout: Duration) -> (Self, Receiver<SinkEvent<T>>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { name: name.into(), tx, timeout }, rx)
    }

    fn send(&self, ev: SinkEvent<T>) -> Result<()> {
        self.tx.send_timeout(ev, self.timeout).map_err(|e| match e {
            SendTimeoutError::Timeout(_) => {
                SigGenError::sink(&self.name, format!("consumer did not accept within {:?}", self.timeout))
            }
            SendTimeoutError::Disconnected(_) => SigGenError::sink(&self.name, "consumer hung up"),
        })
    }
}

impl<T: Clone + Send> Sink<T> for ChannelSink<T> {
    fn name(&self) -> &str { &self.name }

    fn announce(&mut self, sri: &Sri) -> Result<()> {
        self.send(SinkEvent::Announce(sri.clone()))
    }

    fn emit(&mut self, buffer: &Buffer<T>, sri: &Sri) -> Result<()> {
        self.send(SinkEvent::Data { buffer: buffer.clone(), sri: sri.clone() })
    }
}

// ---------------------------------- MemorySink -----------------------------------

/// Records every event. Clones share the same log, so keep one clone to
/// inspect while the other is owned by [`Outputs`].
#[derive(Clone)]
pub struct MemorySink<T> {
    name: String,
    events: Arc<Mutex<Vec<SinkEvent<T>>>>,
}

impl<T> MemorySink<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), events: Arc::new(Mutex::new(Vec::new())) }
    }
}

impl<T: Clone> MemorySink<T> {
    pub fn events(&self) -> Vec<SinkEvent<T>> { self.events.lock().clone() }

    /// Data buffers only, in order.
    pub fn buffers(&self) -> Vec<Buffer<T>> {
        self.events.lock().iter().filter_map(|e| e.buffer().cloned()).collect()
    }

    /// Announced SRIs only, in order.
    pub fn announces(&self) -> Vec<Sri> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Announce(sri) => Some(sri.clone()),
                SinkEvent::Data { .. } => None,
            })
            .collect()
    }
}

impl<T: Clone + Send> Sink<T> for MemorySink<T> {
    fn name(&self) -> &str { &self.name }

    fn announce(&mut self, sri: &Sri) -> Result<()> {
        self.events.lock().push(SinkEvent::Announce(sri.clone()));
        Ok(())
    }

    fn emit(&mut self, buffer: &Buffer<T>, sri: &Sri) -> Result<()> {
        self.events.lock().push(SinkEvent::Data { buffer: buffer.clone(), sri: sri.clone() });
        Ok(())
    }
}
