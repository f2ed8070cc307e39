//! Timestamps, buffers and the packetizer that stamps them.
//!
//! A buffer's timestamp is `origin + samples_since_origin / sample_rate`, kept
//! as separate whole and fractional seconds so that long runs keep sub-sample
//! resolution. The sample counter only moves forward; a sample-rate change
//! rebases the origin to the next buffer's start time instead of rescaling
//! time already stamped.

use std::time::{SystemTime, UNIX_EPOCH};

use siggen_core::convert::to_fixed;

use crate::error::{Result, SigGenError};
use crate::sri::Sri;

// ----------------------------------- Timestamp -----------------------------------

/// Seconds since the Unix epoch, split as `whole + frac` with `frac ∈ [0,1)`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Timestamp {
    pub whole: f64,
    pub frac: f64,
}

impl Timestamp {
    /// Normalizes so that `frac ∈ [0,1)` and `whole` is integral.
    pub fn new(whole: f64, frac: f64) -> Self {
        let (w0, f0) = split(whole);
        let (w1, f1) = split(f0 + frac);
        Self { whole: w0 + w1, frac: f1 }
    }

    pub fn from_secs(secs: f64) -> Self { Self::new(secs, 0.0) }

    /// Wall-clock now.
    pub fn now() -> Self {
        let d = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self { whole: d.as_secs() as f64, frac: f64::from(d.subsec_nanos()) * 1e-9 }
    }

    #[inline] pub fn as_secs(&self) -> f64 { self.whole + self.frac }

    #[inline] pub fn is_finite(&self) -> bool { self.whole.is_finite() && self.frac.is_finite() }

    /// `self + secs`, carrying between the two parts.
    pub fn offset(self, secs: f64) -> Self {
        let (w, f) = split(secs);
        Self::new(self.whole + w, self.frac + f)
    }
}

#[inline]
fn split(x: f64) -> (f64, f64) {
    let w = x.floor();
    (w, x - w)
}

// ------------------------------------ Buffers ------------------------------------

/// One emitted batch of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer<T> {
    pub samples: Vec<T>,
    /// Time of `samples[0]`.
    pub timestamp: Timestamp,
    pub eos: bool,
    pub stream_id: String,
    pub xdelta: f64,
}

impl<T> Buffer<T> {
    #[inline] pub fn len(&self) -> usize { self.samples.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.samples.is_empty() }

    /// Empty end-of-stream marker.
    pub fn eos(timestamp: Timestamp, sri: &Sri) -> Self {
        Self { samples: Vec::new(), timestamp, eos: true, stream_id: sri.stream_id.clone(), xdelta: sri.xdelta }
    }
}

impl Buffer<f32> {
    /// Fixed-point twin: same timestamp and metadata, samples rounded and saturated.
    pub fn to_fixed(&self) -> Buffer<i16> {
        Buffer {
            samples: self.samples.iter().map(|&x| to_fixed(x)).collect(),
            timestamp: self.timestamp,
            eos: self.eos,
            stream_id: self.stream_id.clone(),
            xdelta: self.xdelta,
        }
    }
}

/// Everything one production step hands to the sinks.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub float: Buffer<f32>,
    pub fixed: Buffer<i16>,
    pub sri: Sri,
    /// SRI changed since the previous packet; announce before emitting.
    pub announce: bool,
}

impl Packet {
    #[inline] pub fn is_eos(&self) -> bool { self.float.eos }

    /// Wall time this packet covers.
    pub fn duration_secs(&self) -> f64 { self.float.len() as f64 * self.sri.xdelta }
}

// ----------------------------------- Packetizer ----------------------------------

/// Turns sample blocks into stamped buffers.
#[derive(Debug, Clone)]
pub struct Packetizer {
    origin: Timestamp,
    since_origin: u64,
    total: u64,
    sample_rate: f64,
}

impl Packetizer {
    pub fn new(origin: Timestamp, sample_rate: f64) -> Self {
        Self { origin, since_origin: 0, total: 0, sample_rate }
    }

    /// Samples stamped since start.
    #[inline] pub fn samples(&self) -> u64 { self.total }

    #[inline] pub fn sample_rate(&self) -> f64 { self.sample_rate }

    /// Switch rate. Time already covered is folded into the origin first.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        if sample_rate == self.sample_rate {
            return;
        }
        self.origin = self.next_timestamp();
        self.since_origin = 0;
        self.sample_rate = sample_rate;
    }

    /// Start time of the next buffer.
    pub fn next_timestamp(&self) -> Timestamp {
        self.origin.offset(self.since_origin as f64 / self.sample_rate)
    }

    /// Stamp `samples` as the next buffer of the stream described by `sri`.
    pub fn stamp(&mut self, samples: Vec<f32>, sri: &Sri) -> Result<Buffer<f32>> {
        let timestamp = self.next_timestamp();
        if !timestamp.is_finite() {
            return Err(SigGenError::fatal(format!("non-finite timestamp {timestamp:?}")));
        }
        let n = samples.len() as u64;
        let (Some(since), Some(total)) = (self.since_origin.checked_add(n), self.total.checked_add(n)) else {
            return Err(SigGenError::fatal("sample counter overflow"));
        };
        self.since_origin = since;
        self.total = total;
        Ok(Buffer { samples, timestamp, eos: false, stream_id: sri.stream_id.clone(), xdelta: sri.xdelta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ConfigUpdate};

    fn close(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

    #[test]
    fn timestamp_normalizes() {
        let t = Timestamp::new(10.0, 1.25);
        assert_eq!(t.whole, 11.0);
        assert!(close(t.frac, 0.25));
        let t = Timestamp::new(10.5, 0.75);
        assert_eq!(t.whole, 11.0);
        assert!(close(t.frac, 0.25));
        let t = Timestamp::from_secs(3.0).offset(-0.5);
        assert_eq!(t.whole, 2.0);
        assert!(close(t.frac, 0.5));
    }

    #[test]
    fn timestamps_advance_by_buffer_period() {
        let sri = Sri::from_config(&Config::default());
        let mut p = Packetizer::new(Timestamp::new(1_700_000_000.0, 0.9), 5000.0);
        let a = p.stamp(vec![0.0; 1000], &sri).unwrap();
        let b = p.stamp(vec![0.0; 1000], &sri).unwrap();
        let c = p.stamp(vec![0.0; 1000], &sri).unwrap();
        assert_eq!(a.timestamp.whole, 1_700_000_000.0);
        assert!(close(a.timestamp.frac, 0.9));
        assert_eq!(b.timestamp.whole, 1_700_000_001.0);
        assert!(close(b.timestamp.frac, 0.1));
        assert!(close(c.timestamp.frac, 0.3));
        assert_eq!(p.samples(), 3000);
        assert_eq!(a.stream_id, "SigGen Stream");
    }

    #[test]
    fn rate_change_keeps_time_continuous() {
        let sri = Sri::from_config(&Config::default());
        let mut p = Packetizer::new(Timestamp::from_secs(100.0), 1000.0);
        let _ = p.stamp(vec![0.0; 500], &sri).unwrap(); // covers 0.5 s
        p.set_sample_rate(2000.0);
        let b = p.stamp(vec![0.0; 500], &sri).unwrap(); // covers 0.25 s
        let c = p.stamp(vec![0.0; 1], &sri).unwrap();
        assert!(close(b.timestamp.as_secs(), 100.5));
        assert!(close(c.timestamp.as_secs(), 100.75));
        assert_eq!(p.samples(), 1001);
    }

    #[test]
    fn fixed_twin_shares_metadata() {
        let cfg = Config::default().apply(&ConfigUpdate::new().stream_id("twin")).unwrap();
        let sri = Sri::from_config(&cfg);
        let mut p = Packetizer::new(Timestamp::from_secs(5.0), cfg.sample_rate);
        let f = p.stamp(vec![1e9, -1e9, 100.4, -0.6], &sri).unwrap();
        let i = f.to_fixed();
        assert_eq!(i.samples, [i16::MAX, i16::MIN, 100, -1]);
        assert_eq!(i.timestamp, f.timestamp);
        assert_eq!(i.stream_id, "twin");
        assert_eq!(i.xdelta, f.xdelta);
    }

    #[test]
    fn eos_marker_is_empty() {
        let sri = Sri::from_config(&Config::default());
        let b: Buffer<i16> = Buffer::eos(Timestamp::from_secs(1.0), &sri);
        assert!(b.eos && b.is_empty());
    }
}
