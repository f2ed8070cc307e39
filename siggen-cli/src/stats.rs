//! Log-only sink: per-buffer statistics through `tracing`.

use siggen_engine::{Buffer, Result, Sink, Sri};

/// Peak and mean of one buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BufferStats {
    pub peak: f64,
    pub mean: f64,
}

impl BufferStats {
    pub fn of<T: Copy + Into<f64>>(samples: &[T]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let (mut peak, mut sum) = (0.0f64, 0.0f64);
        for &s in samples {
            let v: f64 = s.into();
            peak = peak.max(v.abs());
            sum += v;
        }
        Self { peak, mean: sum / samples.len() as f64 }
    }
}

/// Logs every announce at `info` and every buffer at `debug`, plus a summary
/// line every `every` buffers.
pub struct StatsSink {
    name: String,
    every: u64,
    buffers: u64,
    samples: u64,
}

impl StatsSink {
    pub fn new(name: impl Into<String>, every: u64) -> Self {
        Self { name: name.into(), every: every.max(1), buffers: 0, samples: 0 }
    }
}

impl<T: Copy + Into<f64>> Sink<T> for StatsSink {
    fn name(&self) -> &str { &self.name }

    fn announce(&mut self, sri: &Sri) -> Result<()> {
        tracing::info!(
            sink = %self.name,
            stream_id = %sri.stream_id,
            sample_rate = sri.sample_rate(),
            blocking = sri.blocking,
            keywords = sri.keywords.len(),
            "SRI announced"
        );
        Ok(())
    }

    fn emit(&mut self, buffer: &Buffer<T>, _sri: &Sri) -> Result<()> {
        if buffer.eos {
            tracing::info!(sink = %self.name, buffers = self.buffers, samples = self.samples, "end of stream");
            return Ok(());
        }
        self.buffers += 1;
        self.samples += buffer.len() as u64;
        let st = BufferStats::of(&buffer.samples);
        tracing::debug!(
            sink = %self.name,
            t = buffer.timestamp.as_secs(),
            n = buffer.len(),
            peak = st.peak,
            mean = st.mean,
            "buffer"
        );
        if self.buffers % self.every == 0 {
            tracing::info!(sink = %self.name, buffers = self.buffers, samples = self.samples, peak = st.peak, "streaming");
        }
        Ok(())
    }
}
