//! BiQuad filter, ported from `ggm/src/filter/biquad.c`.
//!
//! The original never implements `cutoff`/`resonance` coefficient
//! computation — both port handlers are `/* TODO */` stubs — so this is
//! kept as the same skeleton: direct-form-II processing is real and
//! tested, but the coefficients stay at their identity-filter defaults
//! until a concrete design (RBJ cookbook, etc.) is chosen.

use ggm_core::block::AudioBuf;
use ggm_core::event::Event;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;
use ggm_core::util::clampf;

#[derive(Debug, Clone, Copy)]
pub struct BiQuad {
    sample_rate: f64,
    a0: f32,
    a1: f32,
    a2: f32,
    b1: f32,
    b2: f32,
    d1: f32,
    d2: f32,
}

impl BiQuad {
    pub fn new(sample_rate: f64) -> Self {
        BiQuad {
            sample_rate,
            a0: 0.0,
            a1: 0.0,
            a2: 0.0,
            b1: 0.0,
            b2: 0.0,
            d1: 0.0,
            d2: 0.0,
        }
    }

    /// TODO: no coefficient design is implemented upstream; this only
    /// clamps and logs the requested cutoff, matching the original.
    pub fn set_cutoff(&mut self, cutoff: f32) {
        let _cutoff = clampf(cutoff, 0.0, 0.5 * self.sample_rate as f32);
    }

    /// TODO: see `set_cutoff`.
    pub fn set_resonance(&mut self, resonance: f32) {
        let _resonance = clampf(resonance, 0.0, 1.0);
    }

    pub fn process(&mut self, input: &AudioBuf, out: &mut AudioBuf) -> bool {
        let (a0, a1, a2, b1, b2) = (self.a0, self.a1, self.a2, self.b1, self.b2);
        let (mut d1, mut d2) = (self.d1, self.d2);
        for (o, &x) in out.iter_mut().zip(input.iter()) {
            let d0 = x - (b1 * d1) - (b2 * d2);
            *o = (a0 * d0) + (a1 * d1) + (a2 * d2);
            d2 = d1;
            d1 = d0;
        }
        self.d1 = d1;
        self.d2 = d2;
        true
    }
}

static IN_PORTS: &[PortInfo] = &[
    PortInfo::new("in", PortKind::Audio),
    PortInfo::new("cutoff", PortKind::Float),
    PortInfo::new("resonance", PortKind::Float),
];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static BIQUAD_TYPE: ModuleType = ModuleType {
    mname: "filter/biquad",
    iname: "biquad",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct BiQuadModule {
    base: ModuleBase,
    filter: BiQuad,
}

impl BiQuadModule {
    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, sample_rate: f64) -> ModuleHandle {
        module_new(parent, &BIQUAD_TYPE, name, id, |base| BiQuadModule {
            base,
            filter: BiQuad::new(sample_rate),
        })
    }
}

impl Module for BiQuadModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }
    fn handle_input(&mut self, port_idx: usize, event: &Event) {
        match port_idx {
            1 => self.filter.set_cutoff(event.as_float()),
            2 => self.filter.set_resonance(event.as_float()),
            _ => {}
        }
    }
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        let (ins, outs) = bufs.split_at_mut(1);
        let input = *ins[0];
        self.filter.process(&input, outs[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_coefficients_produce_silence() {
        let mut f = BiQuad::new(48_000.0);
        let input = [1.0f32; ggm_core::BLOCK];
        let mut out = [9.0f32; ggm_core::BLOCK];
        f.process(&input, &mut out);
        for &s in out.iter() {
            assert_eq!(s, 0.0, "identity coefficients (all zero) should mute the signal");
        }
    }

    #[test]
    fn test_unit_a0_is_pass_through() {
        let mut f = BiQuad::new(48_000.0);
        f.a0 = 1.0;
        let input = [0.5f32, -0.25, 0.75, 1.0];
        let mut out = [0.0f32; 4];
        let mut in_buf = [0.0f32; ggm_core::BLOCK];
        let mut out_buf = [0.0f32; ggm_core::BLOCK];
        in_buf[..4].copy_from_slice(&input);
        f.process(&in_buf, &mut out_buf);
        out.copy_from_slice(&out_buf[..4]);
        assert_eq!(out, input);
    }
}
