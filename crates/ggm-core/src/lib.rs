//! `ggm-core`: the module/port graph runtime kernel — ports, events,
//! MIDI-CC routing, and the synth host object. `no_std` by default (the
//! `std` feature only gates debug-formatting helpers); never allocates on
//! the real-time `process` path.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod block;
pub mod compat;
pub mod config;
pub mod error;
pub mod event;
pub mod lut;
pub mod midi;
pub mod module;
pub mod port;
pub mod registry;
pub mod synth;
pub mod util;

/// Samples per processing block. Fixed at compile time; every `AudioBuf`
/// and every module's `process` call operates on exactly this many frames.
pub const BLOCK: usize = 128;

/// Default sample rate used when a host does not specify one.
pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;

/// Maximum audio input/output ports a *root* module may expose — the
/// driver boundary only wires up to this many physical channels.
pub const MAX_AUDIO_IN: usize = 2;
pub const MAX_AUDIO_OUT: usize = 2;
pub const MAX_MIDI_IN: usize = 1;
pub const MAX_MIDI_OUT: usize = 1;

/// Upper bound on how many audio ports (in + out) any single module type
/// may declare, root or not. A debug-time sanity bound, not a hard limit
/// enforced at runtime for non-root modules.
pub const MAX_AUDIO_PORTS: usize = MAX_AUDIO_IN + MAX_AUDIO_OUT;

/// Deferred event queue capacity. Must be a power of two (the queue masks
/// indices rather than modulo-ing them).
pub const NUM_EVENTS: usize = 16;

/// MIDI-CC routing table shape: `NUM_MIDI_MAP_SLOTS` slots of
/// `NUM_MIDI_MAP_ENTRIES` entries each.
pub const NUM_MIDI_MAP_SLOTS: usize = 8;
pub const NUM_MIDI_MAP_ENTRIES: usize = 8;

/// Debug-time bound on how many destinations a single output port may
/// accumulate.
pub const NUM_PORT_FWD: usize = 8;

/// `u32` phase-accumulator constants: a full 2*pi turn is `2^32`.
pub const FULL_CYCLE: u32 = 0;
pub const HALF_CYCLE: u32 = 1 << 31;
pub const QUARTER_CYCLE: u32 = 1 << 30;
