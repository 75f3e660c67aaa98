//! Cassettes: recorded port interactions for deterministic replay.
//!
//! A recording session wraps the live clock, text model, and embedder so that
//! every call is captured to a per-port YAML file. Replaying contexts serve
//! those interactions back in order, which lets whole monitoring cycles run
//! offline with byte-identical results.

pub mod config;
pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;
