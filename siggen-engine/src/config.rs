//! Configuration model.
//!
//! [`Config`] is a complete, validated snapshot; the engine only ever swaps
//! whole snapshots at buffer boundaries. [`ConfigUpdate`] is the partial record
//! callers hand in: fields left as `None` keep their last value (or the
//! default, on the very first configuration).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use siggen_core::shape::Shape;

use crate::error::ConfigError;
use crate::sri::DEFAULT_STREAM_ID;

pub const DEFAULT_FREQUENCY: f64 = 1000.0;
pub const DEFAULT_SAMPLE_RATE: f64 = 5000.0;
pub const DEFAULT_MAGNITUDE: f64 = 100.0;
pub const DEFAULT_XFER_LEN: usize = 1000;

/// Full configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub shape: Shape,
    /// Hz.
    pub frequency: f64,
    /// Hz, > 0.
    pub sample_rate: f64,
    /// Peak amplitude; 0 is allowed.
    pub magnitude: f64,
    /// Samples per emitted buffer, > 0.
    pub xfer_len: usize,
    /// `None` resolves to [`DEFAULT_STREAM_ID`].
    pub stream_id: Option<String>,
    /// Pace emission to real time.
    pub throttle: bool,
    /// Copied into `Sri::blocking`.
    pub sri_blocking: bool,
    /// Channel RF in Hz, announced as the `CHAN_RF` keyword.
    pub chan_rf: Option<f64>,
    /// Collector RF in Hz, announced as the `COL_RF` keyword.
    pub col_rf: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shape: Shape::Sine,
            frequency: DEFAULT_FREQUENCY,
            sample_rate: DEFAULT_SAMPLE_RATE,
            magnitude: DEFAULT_MAGNITUDE,
            xfer_len: DEFAULT_XFER_LEN,
            stream_id: None,
            throttle: true,
            sri_blocking: false,
            chan_rf: None,
            col_rf: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() {
            return Err(ConfigError::NonFinite { field: "sample_rate", value: self.sample_rate });
        }
        if self.sample_rate <= 0.0 {
            return Err(ConfigError::SampleRate(self.sample_rate));
        }
        if self.xfer_len == 0 {
            return Err(ConfigError::XferLen);
        }
        if !self.xdelta().is_finite() || Duration::try_from_secs_f64(self.buffer_period()).is_err() {
            return Err(ConfigError::Period { sample_rate: self.sample_rate, xfer_len: self.xfer_len });
        }
        let finite = [
            ("frequency", Some(self.frequency)),
            ("magnitude", Some(self.magnitude)),
            ("chan_rf", self.chan_rf),
            ("col_rf", self.col_rf),
        ];
        for (field, value) in finite {
            if let Some(value) = value.filter(|v| !v.is_finite()) {
                return Err(ConfigError::NonFinite { field, value });
            }
        }
        if self.stream_id.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(ConfigError::EmptyStreamId);
        }
        Ok(())
    }

    /// Merge `update` onto this snapshot and validate the result. `self` is
    /// untouched either way.
    pub fn apply(&self, update: &ConfigUpdate) -> Result<Config, ConfigError> {
        let mut next = self.clone();
        if let Some(v) = update.shape { next.shape = v; }
        if let Some(v) = update.frequency { next.frequency = v; }
        if let Some(v) = update.sample_rate { next.sample_rate = v; }
        if let Some(v) = update.magnitude { next.magnitude = v; }
        if let Some(v) = update.xfer_len { next.xfer_len = v; }
        if let Some(v) = &update.stream_id { next.stream_id = Some(v.clone()); }
        if let Some(v) = update.throttle { next.throttle = v; }
        if let Some(v) = update.sri_blocking { next.sri_blocking = v; }
        if let Some(v) = update.chan_rf { next.chan_rf = Some(v); }
        if let Some(v) = update.col_rf { next.col_rf = Some(v); }
        next.validate()?;
        Ok(next)
    }

    /// Stream id with the default applied.
    #[inline]
    pub fn stream_id(&self) -> &str {
        self.stream_id.as_deref().unwrap_or(DEFAULT_STREAM_ID)
    }

    /// Sample period in seconds.
    #[inline] pub fn xdelta(&self) -> f64 { 1.0 / self.sample_rate }

    /// Seconds covered by one buffer.
    #[inline] pub fn buffer_period(&self) -> f64 { self.xfer_len as f64 / self.sample_rate }
}

/// Partial configuration record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigUpdate {
    pub shape: Option<Shape>,
    pub frequency: Option<f64>,
    pub sample_rate: Option<f64>,
    pub magnitude: Option<f64>,
    pub xfer_len: Option<usize>,
    pub stream_id: Option<String>,
    pub throttle: Option<bool>,
    pub sri_blocking: Option<bool>,
    pub chan_rf: Option<f64>,
    pub col_rf: Option<f64>,
}

impl ConfigUpdate {
    pub fn new() -> Self { Self::default() }

    pub fn shape(mut self, v: Shape) -> Self { self.shape = Some(v); self }
    pub fn frequency(mut self, v: f64) -> Self { self.frequency = Some(v); self }
    pub fn sample_rate(mut self, v: f64) -> Self { self.sample_rate = Some(v); self }
    pub fn magnitude(mut self, v: f64) -> Self { self.magnitude = Some(v); self }
    pub fn xfer_len(mut self, v: usize) -> Self { self.xfer_len = Some(v); self }
    pub fn stream_id(mut self, v: impl Into<String>) -> Self { self.stream_id = Some(v.into()); self }
    pub fn throttle(mut self, v: bool) -> Self { self.throttle = Some(v); self }
    pub fn sri_blocking(mut self, v: bool) -> Self { self.sri_blocking = Some(v); self }
    pub fn chan_rf(mut self, v: f64) -> Self { self.chan_rf = Some(v); self }
    pub fn col_rf(mut self, v: f64) -> Self { self.col_rf = Some(v); self }

    /// Fields set in `other` win over fields set in `self`.
    pub fn overlay(mut self, other: ConfigUpdate) -> Self {
        self.shape = other.shape.or(self.shape);
        self.frequency = other.frequency.or(self.frequency);
        self.sample_rate = other.sample_rate.or(self.sample_rate);
        self.magnitude = other.magnitude.or(self.magnitude);
        self.xfer_len = other.xfer_len.or(self.xfer_len);
        self.stream_id = other.stream_id.or(self.stream_id);
        self.throttle = other.throttle.or(self.throttle);
        self.sri_blocking = other.sri_blocking.or(self.sri_blocking);
        self.chan_rf = other.chan_rf.or(self.chan_rf);
        self.col_rf = other.col_rf.or(self.col_rf);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_configure_fills_defaults() {
        let cfg = Config::default().apply(&ConfigUpdate::new().shape(Shape::Constant)).unwrap();
        assert_eq!(cfg.shape, Shape::Constant);
        assert_eq!(cfg.frequency, DEFAULT_FREQUENCY);
        assert_eq!(cfg.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(cfg.xfer_len, DEFAULT_XFER_LEN);
        assert_eq!(cfg.stream_id(), "SigGen Stream");
        assert!(cfg.throttle);
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let a = Config::default()
            .apply(&ConfigUpdate::new().frequency(250.0).stream_id("a").magnitude(3.0))
            .unwrap();
        let b = a.apply(&ConfigUpdate::new().magnitude(9.0)).unwrap();
        assert_eq!(b.frequency, 250.0);
        assert_eq!(b.stream_id(), "a");
        assert_eq!(b.magnitude, 9.0);
    }

    #[test]
    fn rejects_bad_values_and_keeps_previous() {
        let base = Config::default();
        assert_eq!(base.apply(&ConfigUpdate::new().sample_rate(0.0)), Err(ConfigError::SampleRate(0.0)));
        assert_eq!(base.apply(&ConfigUpdate::new().sample_rate(-5.0)), Err(ConfigError::SampleRate(-5.0)));
        assert_eq!(base.apply(&ConfigUpdate::new().xfer_len(0)), Err(ConfigError::XferLen));
        assert!(matches!(
            base.apply(&ConfigUpdate::new().frequency(f64::NAN)),
            Err(ConfigError::NonFinite { field: "frequency", .. })
        ));
        assert!(matches!(
            base.apply(&ConfigUpdate::new().col_rf(f64::INFINITY)),
            Err(ConfigError::NonFinite { field: "col_rf", .. })
        ));
        assert_eq!(base.apply(&ConfigUpdate::new().stream_id("  ")), Err(ConfigError::EmptyStreamId));
        assert_eq!(
            base.apply(&ConfigUpdate::new().sample_rate(1e-310)),
            Err(ConfigError::Period { sample_rate: 1e-310, xfer_len: DEFAULT_XFER_LEN })
        );
        assert!(matches!(
            base.apply(&ConfigUpdate::new().sample_rate(1e-17).xfer_len(1000)),
            Err(ConfigError::Period { .. })
        ));
        assert_eq!(base, Config::default());
    }

    #[test]
    fn zero_magnitude_is_fine() {
        assert!(Config::default().apply(&ConfigUpdate::new().magnitude(0.0)).is_ok());
    }

    #[test]
    fn tiny_rate_with_representable_period_is_accepted() {
        let cfg = Config::default().apply(&ConfigUpdate::new().sample_rate(1e-16).xfer_len(1000)).unwrap();
        assert!((cfg.buffer_period() - 1e19).abs() / 1e19 < 1e-12);
    }

    #[test]
    fn overlay_prefers_later_fields() {
        let file = ConfigUpdate::new().frequency(10.0).stream_id("file");
        let flags = ConfigUpdate::new().stream_id("flag");
        let merged = file.overlay(flags);
        assert_eq!(merged.frequency, Some(10.0));
        assert_eq!(merged.stream_id.as_deref(), Some("flag"));
        assert!(!merged.is_empty());
        assert!(ConfigUpdate::new().is_empty());
    }

    #[test]
    fn parses_from_toml() {
        let update: ConfigUpdate = toml::from_str(
            r#"
            shape = "lrs"
            frequency = 1000.0
            sample_rate = 5000.0
            xfer_len = 1000
            throttle = false
            chan_rf = 1.5e9
            "#,
        )
        .unwrap();
        assert_eq!(update.shape, Some(Shape::Lrs));
        assert_eq!(update.xfer_len, Some(1000));
        assert_eq!(update.chan_rf, Some(1.5e9));
        assert!(update.stream_id.is_none());

        assert!(toml::from_str::<ConfigUpdate>("volume = 3").is_err());
        assert!(toml::from_str::<ConfigUpdate>("shape = \"whitenoise\"").is_err());
    }

    #[test]
    fn derived_quantities() {
        let cfg = Config::default();
        assert!((cfg.xdelta() - 1.0 / 5000.0).abs() < 1e-18);
        assert!((cfg.buffer_period() - 0.2).abs() < 1e-12);
    }
}
