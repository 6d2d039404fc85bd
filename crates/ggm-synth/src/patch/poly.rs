//! `root/poly`: a 5-voice polyphonic synth behind a pan mixer, grounded in
//! spec.md §8 scenario 2 ("Polyphonic chord").
//!
//! The original's polyphonic root patch reports itself as always active,
//! regardless of whether any voice is actually sounding — a quirk of the C
//! module never wiring its own `process` return value to the sub-graph's
//! real active state, left uncorrected here (see DESIGN.md, Open Question
//! resolution #4) rather than silently "fixed" to match `root/metro`'s
//! properly-gated behavior.

use ggm_core::block::AudioBuf;
use ggm_core::compat::{Rc, RefCell, Vec};
use ggm_core::error::Result;
use ggm_core::event::Event;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_root;
use ggm_core::synth::Synth;

use crate::midi::poly::{PolyModule, MAX_POLYPHONY};
use crate::mix::pan::PanModule;
use crate::voice::osc::OscVoiceModule;

static IN_PORTS: &[PortInfo] = &[PortInfo::new("midi", PortKind::Midi)];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out_l", PortKind::Audio), PortInfo::new("out_r", PortKind::Audio)];

pub static POLY_PATCH_TYPE: ModuleType = ModuleType {
    mname: "root/poly",
    iname: "poly",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct PolyPatchModule {
    base: ModuleBase,
    poly: ModuleHandle,
    pan: ModuleHandle,
}

impl PolyPatchModule {
    pub fn build(synth: &Rc<RefCell<Synth>>, sample_rate: f64) -> Result<ModuleHandle> {
        let voices: Vec<ModuleHandle> = (0..MAX_POLYPHONY)
            .map(|i| OscVoiceModule::build(None, None, Some(i as u32), sample_rate))
            .collect();
        let poly = PolyModule::build(None, Some("poly"), None, voices);
        let pan = PanModule::build(None, Some("pan"), None);

        module_root(&POLY_PATCH_TYPE, synth, |base| PolyPatchModule { base, poly, pan })
    }
}

impl Module for PolyPatchModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }
    fn handle_input(&mut self, port_idx: usize, event: &Event) {
        if port_idx == 0 {
            self.poly.borrow_mut().handle_input(0, event);
        }
    }
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        let mut poly_out = [0.0f32; ggm_core::BLOCK];
        self.poly.borrow_mut().process(&mut [&mut poly_out]);

        let (l, r) = bufs.split_at_mut(1);
        let l0 = &mut *l[0];
        let r0 = &mut *r[0];
        self.pan.borrow_mut().process(&mut [&mut poly_out, l0, r0]);

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ggm_core::config::SynthConfig;

    fn test_synth() -> Rc<RefCell<Synth>> {
        Rc::new(RefCell::new(Synth::new(SynthConfig::default(), &[]).unwrap()))
    }

    #[test]
    fn test_poly_root_builds_within_audio_port_limits() {
        let root = PolyPatchModule::build(&test_synth(), 48_000.0);
        assert!(root.is_ok());
    }

    #[test]
    fn test_chord_of_three_notes_mixes_into_stereo_output() {
        let root = PolyPatchModule::build(&test_synth(), 48_000.0).unwrap();
        for note in [60u8, 64, 67] {
            root.borrow_mut().handle_input(0, &Event::note_on(0, note, 100));
        }
        let mut l = [0.0f32; ggm_core::BLOCK];
        let mut r = [0.0f32; ggm_core::BLOCK];
        for _ in 0..20 {
            let active = root.borrow_mut().process(&mut [&mut l, &mut r]);
            // root/poly always reports active, by design (see module docs).
            assert!(active);
        }
        assert!(l.iter().any(|&s| s != 0.0));
    }
}
