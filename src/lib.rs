//! # ggm - Real-time Modular Audio Synthesizer Core
//!
//! A dataflow graph of typed-port modules driven one fixed-size block at a
//! time. Built from three layers:
//!
//! - **ggm-core** - module/port graph, event dispatch, synth host object,
//!   MIDI-CC routing, block primitives, math tables
//! - **ggm-dsp** - ADSR envelope, oscillators, filters
//! - **ggm-synth** - voice managers, pan mixer, breath excitation, byte-code
//!   sequencer, delay line, root patches
//!
//! ## Quick start
//!
//! ```ignore
//! use ggm::prelude::*;
//! use ggm::core::compat::{Rc, RefCell};
//!
//! // The synth exists before the root patch does, so the patch builder
//! // can hand every module it constructs a back-reference to it.
//! let synth = Rc::new(RefCell::new(Synth::new(SynthConfig::default(), &[])?));
//! let root = ggm::synth_modules::patch::metro::MetroModule::build(&synth, 48_000.0, program)?;
//! synth.borrow_mut().set_root(root)?;
//!
//! loop {
//!     synth.borrow_mut().process_block()?;
//!     // hand synth.borrow().audio_out(..) to the audio driver
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub use ggm_core as core;
pub use ggm_core::{
    config::{PortBoolCfg, PortFloatCfg, PortIntCfg, SynthCfg, SynthConfig},
    error::{Error, Result},
    event::{Event, EventQueue},
    midi,
    module::{Module, ModuleType},
    port::{PortInfo, PortKind},
    registry::{module_new, module_root},
    synth::Synth,
};

pub use ggm_dsp as dsp;
pub use ggm_synth as synth_modules;
pub use ggm_synth::registry::REGISTRY;

/// Convenience prelude for common imports.
pub mod prelude {
    pub use crate::core::{
        config::SynthConfig,
        error::{Error, Result},
        event::Event,
        module::Module,
        registry::{module_new, module_root},
        synth::Synth,
    };
    pub use crate::dsp::*;
    pub use crate::synth_modules::*;
    pub use crate::REGISTRY;
}
