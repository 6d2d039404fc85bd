//! `ggm-dsp`: the envelope, oscillator and filter algorithms that give the
//! engine its voice. Every state machine here is a plain, `Copy`-free but
//! allocation-free `struct` with a `step()`/`process()` method so
//! `ggm-synth`'s composite modules can embed one directly as private state;
//! each is additionally wrapped as a standalone, registrable [`Module`] so
//! it can be patched and tested in isolation, matching the way the
//! original project's every `.c` DSP file also carries a `module_type`.
//!
//! [`Module`]: ggm_core::module::Module

#![cfg_attr(not(feature = "std"), no_std)]

pub mod envelope;
pub mod filter;
pub mod osc;
