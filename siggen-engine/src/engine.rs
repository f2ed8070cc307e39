//! The production engine and its lifecycle.
//!
//! `Engine` owns everything that must survive between buffers: the
//! synthesizer (phase clock + sequence register), the packetizer (sample
//! counter + origin), the SRI manager, and the configuration in effect. One
//! call to [`Engine::produce`] is one buffer; that is the pull interface. The
//! [`Runner`](crate::runner::Runner) wraps it in a paced loop driving sinks.
//!
//! States: `Created → Configured → Running → Stopped`, and `Stopped` goes
//! back to `Configured` on the next `configure`.
//!
//! Reconfiguration while running is queued and swapped in at the start of the
//! next `produce`, so a buffer never mixes two configurations.

use core::fmt;

use siggen_core::synth::Synthesizer;

use crate::config::{Config, ConfigUpdate};
use crate::error::{Result, SigGenError};
use crate::packet::{Buffer, Packet, Packetizer, Timestamp};
use crate::sri::SriManager;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Configured,
    Running,
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineState::Created => "created",
            EngineState::Configured => "configured",
            EngineState::Running => "running",
            EngineState::Stopped => "stopped",
        })
    }
}

pub struct Engine {
    state: EngineState,
    active: Option<Config>,
    pending: Option<Config>,
    synth: Synthesizer,
    packetizer: Packetizer,
    sri: SriManager,
    buffers: u64,
    error: Option<SigGenError>,
}

impl Default for Engine {
    fn default() -> Self { Self::new() }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            state: EngineState::Created,
            active: None,
            pending: None,
            synth: Synthesizer::default(),
            packetizer: Packetizer::new(Timestamp::default(), 1.0),
            sri: SriManager::new(),
            buffers: 0,
            error: None,
        }
    }

    /// `new` followed by `configure(update)`.
    pub fn with_config(update: &ConfigUpdate) -> Result<Self> {
        let mut e = Self::new();
        e.configure(update)?;
        Ok(e)
    }

    #[inline] pub fn state(&self) -> EngineState { self.state }

    /// Configuration the last produced buffer used (or the next one will use,
    /// before the first `produce`).
    #[inline] pub fn config(&self) -> Option<&Config> { self.active.as_ref() }

    /// Latest accepted configuration, including one still waiting for a
    /// buffer boundary.
    #[inline] pub fn latest_config(&self) -> Option<&Config> { self.pending.as_ref().or(self.active.as_ref()) }

    /// Error that stopped production, if any.
    #[inline] pub fn last_error(&self) -> Option<&SigGenError> { self.error.as_ref() }

    #[inline] pub fn synthesizer(&self) -> &Synthesizer { &self.synth }
    #[inline] pub fn buffers_produced(&self) -> u64 { self.buffers }
    #[inline] pub fn samples_produced(&self) -> u64 { self.packetizer.samples() }

    /// Merge `update` onto the latest configuration (or the defaults, the
    /// first time) and accept it. Rejected updates leave everything as it was.
    pub fn configure(&mut self, update: &ConfigUpdate) -> Result<()> {
        let base = self.latest_config().cloned().unwrap_or_default();
        let next = base.apply(update)?;
        self.submit(next)
    }

    /// Accept a complete snapshot. Validated again here so callers that build
    /// `Config` by hand get the same guarantees.
    pub fn submit(&mut self, next: Config) -> Result<()> {
        next.validate()?;
        match self.state {
            EngineState::Created => {
                self.synth = Synthesizer::new(next.frequency, next.sample_rate);
                tracing::info!(shape = %next.shape, sample_rate = next.sample_rate, xfer_len = next.xfer_len, "engine configured");
                self.active = Some(next);
                self.state = EngineState::Configured;
            }
            EngineState::Configured => {
                self.synth.retune(next.frequency, next.sample_rate);
                self.active = Some(next);
            }
            EngineState::Running => {
                tracing::debug!(shape = %next.shape, frequency = next.frequency, "reconfiguration queued for next buffer");
                self.pending = Some(next);
            }
            EngineState::Stopped => {
                // restart: fresh stream state, configuration carries over
                self.synth = Synthesizer::new(next.frequency, next.sample_rate);
                self.sri.reset();
                self.buffers = 0;
                self.error = None;
                self.pending = None;
                tracing::info!(shape = %next.shape, "engine re-configured after stop");
                self.active = Some(next);
                self.state = EngineState::Configured;
            }
        }
        Ok(())
    }

    /// Begin production. `origin` is the timestamp of the first sample.
    pub fn start(&mut self, origin: Timestamp) -> Result<()> {
        if self.state != EngineState::Configured {
            return Err(SigGenError::InvalidState { op: "start", state: self.state });
        }
        let Some(cfg) = self.active.as_ref() else {
            return Err(SigGenError::fatal("configured engine without a configuration"));
        };
        self.packetizer = Packetizer::new(origin, cfg.sample_rate);
        self.state = EngineState::Running;
        tracing::info!(stream_id = cfg.stream_id(), "engine running");
        Ok(())
    }

    /// Produce the next buffer pair.
    pub fn produce(&mut self) -> Result<Packet> {
        if self.state != EngineState::Running {
            return Err(SigGenError::InvalidState { op: "produce", state: self.state });
        }
        if let Some(next) = self.pending.take() {
            self.apply(next);
        }
        let Some(cfg) = self.active.as_ref() else {
            return Err(self.halt(SigGenError::fatal("running engine without a configuration")));
        };

        let mut samples = vec![0.0f32; cfg.xfer_len];
        self.synth.fill(cfg.shape, cfg.magnitude, &mut samples);
        let (sri, announce) = self.sri.current(cfg);

        let float = match self.packetizer.stamp(samples, &sri) {
            Ok(b) => b,
            Err(e) => return Err(self.halt(e)),
        };
        let fixed = float.to_fixed();
        self.buffers += 1;
        tracing::trace!(n = self.buffers, t = float.timestamp.as_secs(), "buffer produced");
        Ok(Packet { float, fixed, sri, announce })
    }

    /// Stop production and return the end-of-stream marker. Any queued
    /// configuration becomes the base for a later restart.
    pub fn stop(&mut self) -> Result<Packet> {
        if self.state != EngineState::Running {
            return Err(SigGenError::InvalidState { op: "stop", state: self.state });
        }
        if let Some(next) = self.pending.take() {
            self.active = Some(next);
        }
        let Some(cfg) = self.active.as_ref() else {
            return Err(self.halt(SigGenError::fatal("running engine without a configuration")));
        };
        let (sri, announce) = self.sri.current(cfg);
        let ts = self.packetizer.next_timestamp();
        self.state = EngineState::Stopped;
        tracing::info!(buffers = self.buffers, samples = self.packetizer.samples(), "engine stopped");
        Ok(Packet { float: Buffer::eos(ts, &sri), fixed: Buffer::eos(ts, &sri), sri, announce })
    }

    /// Stop on an error raised outside the engine (e.g. by a sink). The error
    /// is kept for inspection and handed back.
    pub fn halt(&mut self, err: SigGenError) -> SigGenError {
        tracing::error!(error = %err, "production halted");
        self.state = EngineState::Stopped;
        self.error = Some(err.clone());
        err
    }

    fn apply(&mut self, next: Config) {
        if let Some(prev) = self.active.as_ref() {
            if prev.frequency != next.frequency || prev.sample_rate != next.sample_rate {
                self.synth.retune(next.frequency, next.sample_rate);
            }
            if prev.sample_rate != next.sample_rate {
                self.packetizer.set_sample_rate(next.sample_rate);
            }
        }
        tracing::debug!(shape = %next.shape, frequency = next.frequency, magnitude = next.magnitude, "reconfiguration applied");
        self.active = Some(next);
    }
}
