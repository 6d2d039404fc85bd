//! `ggm-synth`: composite modules built on `ggm-dsp`'s oscillators, filters
//! and envelopes — voice managers, the pan mixer, breath excitation, the
//! byte-code sequencer, a delay line, the module-type registry, and
//! ready-to-run root patches (`root/metro`, `root/poly`).

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod delay;
pub mod midi;
pub mod mix;
pub mod patch;
pub mod pm;
pub mod registry;
pub mod seq;
pub mod smf;
pub mod voice;
