//! The production loop on its own thread.
//!
//! One iteration: apply queued commands → `produce` → wait for the pacer's
//! deadline (on the command channel, so `stop` never waits out a buffer
//! period) → announce if needed → emit. A sink error halts the loop; the
//! engine keeps the error and the final [`RunReport`] carries it.
//!
//! Control goes over a `crossbeam-channel`; the handle keeps a
//! `parking_lot` mirror of the latest accepted configuration so that
//! `configure` can validate and answer synchronously.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::config::{Config, ConfigUpdate};
use crate::engine::{Engine, EngineState};
use crate::error::{Result, SigGenError};
use crate::pacer::Pacer;
use crate::packet::Timestamp;
use crate::sink::Outputs;

/// Messages from the handle to the loop.
#[derive(Debug, Clone)]
pub enum Command {
    /// Already-validated snapshot; takes effect at the next buffer.
    Configure(Config),
    Stop,
}

/// What a finished run leaves behind.
pub struct RunReport {
    pub buffers: u64,
    pub samples: u64,
    /// Times the pacer gave up catching up with a stalled consumer.
    pub reanchors: u64,
    /// Set when production was halted rather than stopped.
    pub error: Option<SigGenError>,
    /// The engine, stopped. `configure` + `Runner::spawn` restarts it.
    pub engine: Engine,
}

pub struct Runner {
    engine: Engine,
    outputs: Outputs,
    pacer: Pacer,
    rx: Receiver<Command>,
}

impl Runner {
    /// Start `engine` (which must be configured) and drive `outputs` from a
    /// dedicated thread.
    pub fn spawn(mut engine: Engine, outputs: Outputs) -> Result<RunnerHandle> {
        if engine.state() != EngineState::Configured {
            return Err(SigGenError::InvalidState { op: "spawn", state: engine.state() });
        }
        let Some(latest) = engine.latest_config().cloned() else {
            return Err(SigGenError::fatal("configured engine without a configuration"));
        };
        engine.start(Timestamp::now())?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let runner = Runner { engine, outputs, pacer: Pacer::new(), rx };
        let join = std::thread::Builder::new()
            .name("siggen-runner".into())
            .spawn(move || runner.run())
            .map_err(|e| SigGenError::msg(format!("failed to spawn runner thread: {e}")))?;

        Ok(RunnerHandle { tx, latest: Arc::new(Mutex::new(latest)), join: Some(join) })
    }

    fn run(mut self) -> RunReport {
        tracing::debug!(sinks = self.outputs.len(), "runner loop started");
        loop {
            if self.drain() {
                break;
            }

            let packet = match self.engine.produce() {
                Ok(p) => p,
                Err(_) => return self.report(),
            };

            let throttle = self.engine.config().is_some_and(|c| c.throttle);
            let stopping = match self.pacer.schedule(throttle, packet.duration_secs()) {
                Some(deadline) => self.wait_until(deadline),
                None => false,
            };

            if let Err(e) = self.outputs.deliver(&packet) {
                self.engine.halt(e);
                return self.report();
            }
            if stopping {
                break;
            }
        }

        match self.engine.stop() {
            Ok(eos) => {
                if let Err(e) = self.outputs.deliver(&eos) {
                    tracing::warn!(error = %e, "end-of-stream not delivered");
                }
            }
            Err(e) => tracing::error!(error = %e, "engine refused to stop"),
        }
        self.report()
    }

    /// Apply everything queued. Returns true when asked to stop.
    fn drain(&mut self) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(Command::Configure(cfg)) => self.submit(cfg),
                Ok(Command::Stop) | Err(TryRecvError::Disconnected) => return true,
                Err(TryRecvError::Empty) => return false,
            }
        }
    }

    /// Block until `deadline`, handling commands as they arrive. Returns true
    /// when asked to stop.
    fn wait_until(&mut self, deadline: std::time::Instant) -> bool {
        loop {
            match self.rx.recv_deadline(deadline) {
                Ok(Command::Configure(cfg)) => self.submit(cfg),
                Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => return true,
                Err(RecvTimeoutError::Timeout) => return false,
            }
        }
    }

    fn submit(&mut self, cfg: Config) {
        if let Err(e) = self.engine.submit(cfg) {
            tracing::warn!(error = %e, "queued configuration dropped");
        }
    }

    fn report(self) -> RunReport {
        RunReport {
            buffers: self.engine.buffers_produced(),
            samples: self.engine.samples_produced(),
            reanchors: self.pacer.reanchors(),
            error: self.engine.last_error().cloned(),
            engine: self.engine,
        }
    }
}

/// Control side of a running [`Runner`]. Dropping it stops the loop.
pub struct RunnerHandle {
    tx: Sender<Command>,
    latest: Arc<Mutex<Config>>,
    join: Option<JoinHandle<RunReport>>,
}

impl RunnerHandle {
    /// Validate `update` against the latest accepted configuration and queue
    /// it. Rejections leave the running configuration untouched.
    pub fn configure(&self, update: &ConfigUpdate) -> Result<()> {
        let mut latest = self.latest.lock();
        let next = latest.apply(update)?;
        self.tx
            .send(Command::Configure(next.clone()))
            .map_err(|_| SigGenError::msg("runner has already stopped"))?;
        *latest = next;
        Ok(())
    }

    /// Latest accepted configuration.
    pub fn config(&self) -> Config { self.latest.lock().clone() }

    /// True once the loop has exited (stopped or halted).
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the loop, wait for the end-of-stream marker to go out, and
    /// collect the report.
    pub fn stop(mut self) -> Result<RunReport> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<RunReport> {
        let Some(join) = self.join.take() else {
            return Err(SigGenError::msg("runner already joined"));
        };
        // fails only if the loop already exited on its own
        let _ = self.tx.send(Command::Stop);
        join.join().map_err(|_| SigGenError::fatal("runner thread panicked"))
    }
}

impl Drop for RunnerHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            if let Err(e) = self.shutdown() {
                tracing::error!(error = %e, "runner did not shut down cleanly");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Buffer;
    use crate::sink::{MemorySink, Sink, SinkEvent};
    use crate::sri::Sri;
    use siggen_core::shape::Shape;
    use std::time::{Duration, Instant};

    fn engine(update: ConfigUpdate) -> Engine {
        Engine::with_config(&update).unwrap()
    }

    fn memory() -> (Outputs, MemorySink<f32>, MemorySink<i16>) {
        let f = MemorySink::new("float");
        let i = MemorySink::new("fixed");
        (Outputs::new().with_float(f.clone()).with_fixed(i.clone()), f, i)
    }

    struct Failing;

    impl Sink<f32> for Failing {
        fn name(&self) -> &str { "failing" }
        fn announce(&mut self, _: &Sri) -> Result<()> { Ok(()) }
        fn emit(&mut self, _: &Buffer<f32>, _: &Sri) -> Result<()> {
            Err(SigGenError::sink("failing", "disk full"))
        }
    }

    #[test]
    fn spawn_requires_configured_engine() {
        let (out, _, _) = memory();
        assert!(matches!(
            Runner::spawn(Engine::new(), out),
            Err(SigGenError::InvalidState { op: "spawn", .. })
        ));
    }

    #[test]
    fn throttled_rate_tracks_sample_rate() {
        let (out, f, _) = memory();
        let h = Runner::spawn(engine(ConfigUpdate::new().sample_rate(5000.0).xfer_len(1000)), out).unwrap();
        std::thread::sleep(Duration::from_millis(900));
        let n = f.buffers().len();
        let report = h.stop().unwrap();
        assert!((4..=6).contains(&n), "n={n}");
        assert!(report.error.is_none());
        assert_eq!(report.samples, report.buffers * 1000);
    }

    #[test]
    fn stop_interrupts_long_wait() {
        let (out, f, i) = memory();
        let h = Runner::spawn(
            engine(ConfigUpdate::new().shape(Shape::Constant).sample_rate(1.0).xfer_len(10)),
            out,
        )
        .unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let t0 = Instant::now();
        let report = h.stop().unwrap();
        assert!(t0.elapsed() < Duration::from_secs(2));
        assert_eq!(report.engine.state(), EngineState::Stopped);

        let last = f.buffers().pop().unwrap();
        assert!(last.eos && last.is_empty());
        assert!(i.buffers().last().is_some_and(|b| b.eos));
        assert!(matches!(f.events()[0], SinkEvent::Announce(_)));
    }

    #[test]
    fn slowest_valid_rate_still_stops_cleanly() {
        let (out, f, _) = memory();
        let h = Runner::spawn(engine(ConfigUpdate::new().sample_rate(1e-16).xfer_len(1000).throttle(true)), out).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        let t0 = Instant::now();
        let report = h.stop().unwrap();
        assert!(t0.elapsed() < Duration::from_secs(2));
        assert!(report.error.is_none());
        assert_eq!(report.buffers, 2);
        let bufs = f.buffers();
        assert_eq!(bufs.len(), 3);
        assert!(bufs[2].eos);
    }

    #[test]
    fn live_reconfiguration_reaches_sinks() {
        let (out, f, _) = memory();
        let h = Runner::spawn(engine(ConfigUpdate::new().sample_rate(5000.0).xfer_len(50)), out).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        h.configure(&ConfigUpdate::new().stream_id("unit_test_stream_id")).unwrap();
        assert_eq!(h.config().stream_id(), "unit_test_stream_id");
        assert!(h.configure(&ConfigUpdate::new().sample_rate(-1.0)).is_err());
        std::thread::sleep(Duration::from_millis(60));
        let _ = h.stop().unwrap();

        let ids: Vec<String> = f.announces().into_iter().map(|s| s.stream_id).collect();
        assert_eq!(ids, ["SigGen Stream", "unit_test_stream_id"]);
        let bufs = f.buffers();
        let switch = bufs.iter().position(|b| b.stream_id == "unit_test_stream_id").unwrap();
        assert!(bufs[switch..].iter().all(|b| b.stream_id == "unit_test_stream_id"));
        assert!(bufs[..switch].iter().all(|b| b.stream_id == "SigGen Stream"));
    }

    #[test]
    fn sink_failure_halts_production() {
        let h = Runner::spawn(engine(ConfigUpdate::new().throttle(false)), Outputs::new().with_float(Failing)).unwrap();
        let t0 = Instant::now();
        while !h.is_finished() && t0.elapsed() < Duration::from_secs(5) {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(h.is_finished());
        assert!(h.configure(&ConfigUpdate::new().magnitude(1.0)).is_err());
        let report = h.stop().unwrap();
        assert!(matches!(report.error, Some(SigGenError::Sink { .. })));
        assert_eq!(report.buffers, 1);
        assert_eq!(report.engine.state(), EngineState::Stopped);
    }

    #[test]
    fn report_engine_can_restart() {
        let (out, _, _) = memory();
        let h = Runner::spawn(engine(ConfigUpdate::new().xfer_len(10)), out).unwrap();
        let mut e = h.stop().unwrap().engine;
        e.configure(&ConfigUpdate::new().magnitude(2.0)).unwrap();
        let (out, f, _) = memory();
        let h = Runner::spawn(e, out).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        drop(h);
        assert!(f.buffers().first().is_some_and(|b| b.len() == 10));
        assert!(f.buffers().last().is_some_and(|b| b.eos));
    }
}
