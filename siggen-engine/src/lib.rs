//! SigGen Engine: configuration, packetization, SRI, pacing, sinks and the
//! production loop around `siggen-core`.
//!
//! Crate layout:
//! - [`config`] : `Config` snapshots and partial `ConfigUpdate`s
//! - [`engine`] : `Engine` state machine; one `produce` = one buffer pair
//! - [`packet`] : timestamps, buffers and the packetizer
//! - [`sri`]    : stream metadata and announce tracking
//! - [`pacer`]  : deadline-based real-time throttling
//! - [`sink`]   : the `Sink` trait plus channel and in-memory sinks
//! - [`runner`] : the paced production loop on its own thread
//! - [`error`]  : `SigGenError` / `ConfigError`
//!
//! Use [`Engine`] directly for pull-style production (tests, offline
//! rendering); use [`Runner`] for a live stream.

pub mod config;
pub mod engine;
pub mod error;
pub mod pacer;
pub mod packet;
pub mod runner;
pub mod sink;
pub mod sri;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use config::{Config, ConfigUpdate};
pub use engine::{Engine, EngineState};
pub use error::{ConfigError, Result, SigGenError};
pub use packet::{Buffer, Packet, Timestamp};
pub use runner::{RunReport, Runner, RunnerHandle};
pub use sink::{ChannelSink, MemorySink, Outputs, Sink, SinkEvent};
pub use sri::Sri;
pub use siggen_core::shape::Shape;
