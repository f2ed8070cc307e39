//! Optional playback: the f32 stream on an audio output device via `cpal`.
//!
//! The runner thread hands normalized sample blocks to the device callback
//! through a bounded channel. The callback never blocks; if it runs dry it
//! plays silence and counts the underrun.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, SendTimeoutError, Sender};
use siggen_engine::{Buffer, Config, Result, SigGenError, Sink, Sri};

/// Blocks in flight between the runner and the device.
const QUEUE_BLOCKS: usize = 8;

fn audio_err(what: &str, e: impl std::fmt::Display) -> SigGenError {
    SigGenError::msg(format!("{what}: {e}"))
}

pub fn list_output_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Available output devices ({:?}):", host.id());
    for dev in host.output_devices().map_err(|e| audio_err("enumerating devices", e))? {
        let name = dev.name().map_err(|e| audio_err("reading device name", e))?;
        match dev.default_output_config() {
            Ok(cfg) => println!("- {name}  [{} Hz, {} ch, {:?}]", cfg.sample_rate().0, cfg.channels(), cfg.sample_format()),
            Err(_) => println!("- {name}"),
        }
    }
    Ok(())
}

fn pick_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices().map_err(|e| audio_err("enumerating devices", e))? {
            if d.name().is_ok_and(|n| n == name) {
                return Ok(d);
            }
        }
        return Err(SigGenError::msg(format!("requested device not found: {name}")));
    }
    host.default_output_device().ok_or_else(|| SigGenError::msg("no default output device"))
}

/// Closest supported config to `sample_rate`, preferring fewer channels.
fn choose_config(device: &cpal::Device, sample_rate: u32) -> Result<cpal::SupportedStreamConfig> {
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs().map_err(|e| audio_err("querying configs", e))? {
        let (lo, hi) = (range.min_sample_rate().0, range.max_sample_rate().0);
        let sr_pen = if (lo..=hi).contains(&sample_rate) { 0 } else { u64::from(lo.abs_diff(sample_rate).min(hi.abs_diff(sample_rate))) };
        let score = sr_pen.saturating_mul(1000) + u64::from(range.channels());
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }
    let (_, range) = best.ok_or_else(|| SigGenError::msg("no supported output configs"))?;
    let sr = sample_rate.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
    Ok(range.with_sample_rate(cpal::SampleRate(sr)))
}

/// Live output stream. Keep it alive for as long as audio should play.
pub struct Playback {
    stream: cpal::Stream,
    underruns: Arc<AtomicU64>,
}

impl Playback {
    /// Open `device` (or the default) close to the stream's sample rate and
    /// return the stream plus the sink that feeds it.
    pub fn open(device: Option<&str>, cfg: &Config, gain: f32) -> Result<(Self, PlaybackSink)> {
        let device = pick_device(device)?;
        let requested = cfg.sample_rate.round().clamp(1.0, f64::from(u32::MAX)) as u32;
        let supported = choose_config(&device, requested)?;
        let format = supported.sample_format();
        let stream_cfg = supported.config();
        if stream_cfg.sample_rate.0 != requested {
            tracing::warn!(requested, actual = stream_cfg.sample_rate.0, "device cannot match stream rate; pitch will be off");
        }
        tracing::info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = stream_cfg.sample_rate.0,
            channels = stream_cfg.channels,
            ?format,
            "opening playback"
        );

        let (tx, rx) = crossbeam_channel::bounded(QUEUE_BLOCKS);
        let underruns = Arc::new(AtomicU64::new(0));
        let stream = match format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_cfg, rx, underruns.clone())?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_cfg, rx, underruns.clone())?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_cfg, rx, underruns.clone())?,
            other => return Err(SigGenError::msg(format!("unsupported device sample format: {other:?}"))),
        };
        stream.play().map_err(|e| audio_err("starting playback", e))?;

        let scale = if cfg.magnitude == 0.0 { 0.0 } else { gain / cfg.magnitude.abs() as f32 };
        let timeout = Duration::from_secs_f64((cfg.buffer_period() * QUEUE_BLOCKS as f64).max(0.5));
        Ok((Self { stream, underruns }, PlaybackSink { tx, scale, timeout }))
    }

    pub fn underruns(&self) -> u64 { self.underruns.load(Ordering::Relaxed) }

    pub fn close(self) {
        if let Err(e) = self.stream.pause() {
            tracing::debug!(error = %e, "pausing playback");
        }
        tracing::info!(underruns = self.underruns(), "playback closed");
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    rx: Receiver<Vec<f32>>,
    underruns: Arc<AtomicU64>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(cfg.channels);
    let mut pending: VecDeque<f32> = VecDeque::new();
    let err_fn = |e: cpal::StreamError| tracing::error!(error = %e, "audio stream error");

    device
        .build_output_stream(
            cfg,
            move |output: &mut [T], _| {
                let mut starved = false;
                for frame in output.chunks_mut(channels) {
                    if pending.is_empty() {
                        if let Ok(block) = rx.try_recv() {
                            pending.extend(block);
                        }
                    }
                    let s = match pending.pop_front() {
                        Some(s) => s.clamp(-1.0, 1.0),
                        None => {
                            starved = true;
                            0.0
                        }
                    };
                    let v: T = T::from_sample(s);
                    for ch in frame.iter_mut() { *ch = v; }
                }
                if starved {
                    underruns.fetch_add(1, Ordering::Relaxed);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| audio_err("building output stream", e))
}

/// Feeds [`Playback`]. Samples are scaled so that `magnitude` maps to `gain`.
pub struct PlaybackSink {
    tx: Sender<Vec<f32>>,
    scale: f32,
    timeout: Duration,
}

impl Sink<f32> for PlaybackSink {
    fn name(&self) -> &str { "playback" }

    fn announce(&mut self, _sri: &Sri) -> Result<()> { Ok(()) }

    fn emit(&mut self, buffer: &Buffer<f32>, _sri: &Sri) -> Result<()> {
        if buffer.eos {
            return Ok(());
        }
        let block = buffer.samples.iter().map(|&x| x * self.scale).collect();
        self.tx.send_timeout(block, self.timeout).map_err(|e| match e {
            SendTimeoutError::Timeout(_) => SigGenError::sink("playback", "audio device stalled"),
            SendTimeoutError::Disconnected(_) => SigGenError::sink("playback", "audio stream closed"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siggen_engine::Timestamp;

    fn sink(scale: f32) -> (PlaybackSink, Receiver<Vec<f32>>) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (PlaybackSink { tx, scale, timeout: Duration::from_millis(10) }, rx)
    }

    #[test]
    fn normalizes_by_magnitude() {
        let (mut s, rx) = sink(0.5 / 100.0);
        let sri = Sri::from_config(&Config::default());
        let b = Buffer { samples: vec![100.0, -50.0], timestamp: Timestamp::from_secs(0.0), eos: false, stream_id: sri.stream_id.clone(), xdelta: sri.xdelta };
        s.emit(&b, &sri).unwrap();
        assert_eq!(rx.recv().unwrap(), [0.5, -0.25]);
    }

    #[test]
    fn stalled_device_is_a_sink_error() {
        let (mut s, rx) = sink(1.0);
        let sri = Sri::from_config(&Config::default());
        let b = Buffer { samples: vec![0.0], timestamp: Timestamp::from_secs(0.0), eos: false, stream_id: sri.stream_id.clone(), xdelta: sri.xdelta };
        s.emit(&b, &sri).unwrap();
        assert!(matches!(s.emit(&b, &sri), Err(SigGenError::Sink { .. })));
        drop(rx);
        assert!(s.emit(&Buffer::eos(Timestamp::from_secs(1.0), &sri), &sri).is_ok());
    }
}
