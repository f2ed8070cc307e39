//! Stream metadata (SRI) and the manager that decides when to re-announce it.
//!
//! Sinks learn about a stream through `announce(sri)`; after that every buffer
//! carries only the stream id and sample period. The manager compares the
//! SRI-affecting part of each configuration with the last SRI it handed out
//! and flags an announce exactly once per change.

use crate::config::Config;

/// Stream id used when the configuration does not name one.
pub const DEFAULT_STREAM_ID: &str = "SigGen Stream";

pub const KEYWORD_CHAN_RF: &str = "CHAN_RF";
pub const KEYWORD_COL_RF: &str = "COL_RF";

/// One named numeric SRI keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub id: String,
    pub value: f64,
}

/// Stream metadata record.
#[derive(Debug, Clone, PartialEq)]
pub struct Sri {
    pub stream_id: String,
    /// Seconds between samples, `1 / sample_rate`.
    pub xdelta: f64,
    /// Ask consumers to block rather than drop.
    pub blocking: bool,
    pub keywords: Vec<Keyword>,
}

impl Sri {
    pub fn from_config(cfg: &Config) -> Self {
        let keywords = [(KEYWORD_CHAN_RF, cfg.chan_rf), (KEYWORD_COL_RF, cfg.col_rf)]
            .into_iter()
            .filter_map(|(id, v)| v.map(|value| Keyword { id: id.to_owned(), value }))
            .collect();
        Self {
            stream_id: cfg.stream_id().to_owned(),
            xdelta: cfg.xdelta(),
            blocking: cfg.sri_blocking,
            keywords,
        }
    }

    #[inline] pub fn sample_rate(&self) -> f64 { 1.0 / self.xdelta }

    pub fn keyword(&self, id: &str) -> Option<f64> {
        self.keywords.iter().find(|k| k.id == id).map(|k| k.value)
    }
}

/// Tracks the last announced SRI.
#[derive(Debug, Default)]
pub struct SriManager {
    current: Option<Sri>,
    announces: u64,
}

impl SriManager {
    pub fn new() -> Self { Self::default() }

    /// SRI for `cfg`, plus whether it must be announced before the next buffer.
    pub fn current(&mut self, cfg: &Config) -> (Sri, bool) {
        let wanted = Sri::from_config(cfg);
        match &self.current {
            Some(sri) if *sri == wanted => (wanted, false),
            _ => {
                tracing::debug!(stream_id = %wanted.stream_id, xdelta = wanted.xdelta, "SRI changed; announcing");
                self.current = Some(wanted.clone());
                self.announces += 1;
                (wanted, true)
            }
        }
    }

    /// Last SRI handed out, if any.
    pub fn last(&self) -> Option<&Sri> { self.current.as_ref() }

    /// Number of announces issued so far.
    pub fn announces(&self) -> u64 { self.announces }

    /// Forget everything (stop/restart).
    pub fn reset(&mut self) {
        self.current = None;
        self.announces = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigUpdate;

    #[test]
    fn default_stream_id_and_xdelta() {
        let sri = Sri::from_config(&Config::default());
        assert_eq!(sri.stream_id, "SigGen Stream");
        assert!((sri.sample_rate() - 5000.0).abs() < 1e-9);
        assert!(sri.keywords.is_empty());
        assert!(!sri.blocking);
    }

    #[test]
    fn announces_once_per_change() {
        let mut m = SriManager::new();
        let a = Config::default();
        assert!(m.current(&a).1);
        assert!(!m.current(&a).1);
        assert!(!m.current(&a).1);

        // magnitude is not part of SRI
        let b = a.apply(&ConfigUpdate::new().magnitude(1.0)).unwrap();
        assert!(!m.current(&b).1);

        let c = b.apply(&ConfigUpdate::new().stream_id("other")).unwrap();
        let (sri, announce) = m.current(&c);
        assert!(announce);
        assert_eq!(sri.stream_id, "other");
        assert!(!m.current(&c).1);

        let d = c.apply(&ConfigUpdate::new().sample_rate(10_000.0)).unwrap();
        assert!(m.current(&d).1);
        assert_eq!(m.announces(), 3);
    }

    #[test]
    fn keywords_follow_config() {
        let cfg = Config::default().apply(&ConfigUpdate::new().chan_rf(1.0e9).sri_blocking(true)).unwrap();
        let sri = Sri::from_config(&cfg);
        assert_eq!(sri.keyword(KEYWORD_CHAN_RF), Some(1.0e9));
        assert_eq!(sri.keyword(KEYWORD_COL_RF), None);
        assert!(sri.blocking);
    }

    #[test]
    fn reset_forces_new_announce() {
        let mut m = SriManager::new();
        let cfg = Config::default();
        let _ = m.current(&cfg);
        m.reset();
        assert!(m.last().is_none());
        assert!(m.current(&cfg).1);
    }
}
