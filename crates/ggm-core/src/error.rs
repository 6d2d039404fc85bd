//! Error types for ggm-core.
//!
//! Only construction-time failures are represented as `Result`-returning
//! errors. Patch-time wiring mistakes, runtime control messages with
//! out-of-range values, event-queue overflow, and MIDI decode errors at the
//! host boundary are logged and treated as no-ops at the call site — they do
//! not appear here because they never propagate as a `Result`.

use crate::compat::String;
use thiserror::Error;

/// Errors produced while constructing or tearing down the module graph.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown module type: {0}")]
    UnknownModuleType(String),

    #[error("invalid argument for module '{0}': {1}")]
    InvalidArgument(String, String),

    #[error("root module exceeds port limits (audio_in={audio_in}, audio_out={audio_out}, midi_in={midi_in}, midi_out={midi_out})")]
    RootPortLimitExceeded {
        audio_in: usize,
        audio_out: usize,
        midi_in: usize,
        midi_out: usize,
    },

    #[error("synth already has a root module installed")]
    RootAlreadySet,

    #[error("no root module installed")]
    NoRoot,

    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f64),
}

/// Result type alias for ggm-core.
pub type Result<T> = core::result::Result<T, Error>;
