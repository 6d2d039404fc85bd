//! State variable filter, ported from `ggm/src/filter/svf.c`. Two distinct
//! topologies share one module: the classic Chamberlin form (`Hc`) and the
//! Cytomic "linear trapezoidal" form (`Trapezoidal`), chosen at
//! construction time and fixed for the module's lifetime.

use ggm_core::block::AudioBuf;
use ggm_core::event::Event;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;
use ggm_core::util::clampf;
use ggm_core::lut::cos_lookup;
use ggm_core::HALF_CYCLE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvfType {
    Hc,
    Trapezoidal,
}

#[derive(Debug, Clone, Copy)]
pub struct Svf {
    sample_rate: f64,
    ty: SvfType,
    // Hc state
    kf: f32,
    kq: f32,
    bp: f32,
    lp: f32,
    // Trapezoidal state
    g: f32,
    k: f32,
    ic1eq: f32,
    ic2eq: f32,
}

impl Svf {
    pub fn new(ty: SvfType, sample_rate: f64) -> Self {
        Svf {
            sample_rate,
            ty,
            kf: 0.0,
            kq: 2.0,
            bp: 0.0,
            lp: 0.0,
            g: 0.0,
            k: 2.0,
            ic1eq: 0.0,
            ic2eq: 0.0,
        }
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        let cutoff = clampf(cutoff, 0.0, 0.5 * self.sample_rate as f32);
        let period = 1.0 / self.sample_rate as f32;
        let theta = core::f32::consts::PI * cutoff * period;
        match self.ty {
            SvfType::Hc => self.kf = 2.0 * sin_approx(theta),
            SvfType::Trapezoidal => self.g = tan_approx(theta),
        }
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        let resonance = clampf(resonance, 0.0, 1.0);
        match self.ty {
            SvfType::Hc => self.kq = 2.0 - 2.0 * resonance,
            SvfType::Trapezoidal => self.k = 2.0 - 2.0 * resonance,
        }
    }

    fn filter_hc(&mut self, input: &AudioBuf, out: &mut AudioBuf) {
        let (mut lp, mut bp) = (self.lp, self.bp);
        let (kf, kq) = (self.kf, self.kq);
        for (o, &x) in out.iter_mut().zip(input.iter()) {
            lp += kf * bp;
            let hp = x - lp - (kq * bp);
            bp += kf * hp;
            *o = lp;
        }
        self.lp = lp;
        self.bp = bp;
    }

    fn filter_trapezoidal(&mut self, input: &AudioBuf, out: &mut AudioBuf) {
        let (mut ic1eq, mut ic2eq) = (self.ic1eq, self.ic2eq);
        let a1 = 1.0 / (1.0 + (self.g * (self.g + self.k)));
        let a2 = self.g * a1;
        let a3 = self.g * a2;
        for (o, &v0) in out.iter_mut().zip(input.iter()) {
            let v3 = v0 - ic2eq;
            let v1 = (a1 * ic1eq) + (a2 * v3);
            let v2 = ic2eq + (a2 * ic1eq) + (a3 * v3);
            ic1eq = (2.0 * v1) - ic1eq;
            ic2eq = (2.0 * v2) - ic2eq;
            *o = v2;
        }
        self.ic1eq = ic1eq;
        self.ic2eq = ic2eq;
    }

    pub fn process(&mut self, input: &AudioBuf, out: &mut AudioBuf) -> bool {
        match self.ty {
            SvfType::Hc => self.filter_hc(input, out),
            SvfType::Trapezoidal => self.filter_trapezoidal(input, out),
        }
        true
    }
}

/// `sin(x)` via the shared cosine LUT (`sin(x) = cos(x - pi/2)`), avoiding a
/// dependency on `std::f32::sin` so this module stays usable without the
/// `std` feature. `x` is expected in `[0, pi]`, the only range `set_cutoff`
/// ever produces.
fn sin_approx(x: f32) -> f32 {
    let phase_scale = (1u64 << 32) as f32 / core::f32::consts::TAU;
    let phase = (x * phase_scale) as u32;
    cos_lookup(phase.wrapping_sub(HALF_CYCLE / 2))
}

fn tan_approx(x: f32) -> f32 {
    let phase_scale = (1u64 << 32) as f32 / core::f32::consts::TAU;
    let phase = (x * phase_scale) as u32;
    let c = cos_lookup(phase);
    let s = cos_lookup(phase.wrapping_sub(HALF_CYCLE / 2));
    s / c
}

static IN_PORTS: &[PortInfo] = &[
    PortInfo::new("in", PortKind::Audio),
    PortInfo::new("cutoff", PortKind::Float),
    PortInfo::new("resonance", PortKind::Float),
];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static SVF_TYPE: ModuleType = ModuleType {
    mname: "filter/svf",
    iname: "svf",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct SvfModule {
    base: ModuleBase,
    filter: Svf,
}

impl SvfModule {
    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, ty: SvfType, sample_rate: f64) -> ModuleHandle {
        module_new(parent, &SVF_TYPE, name, id, |base| SvfModule {
            base,
            filter: Svf::new(ty, sample_rate),
        })
    }
}

impl Module for SvfModule {
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
    fn test_hc_lowpass_attenuates_high_frequency() {
        let mut f = Svf::new(SvfType::Hc, 48_000.0);
        f.set_cutoff(200.0);
        f.set_resonance(0.1);
        let mut input = [0.0f32; ggm_core::BLOCK];
        for (i, s) in input.iter_mut().enumerate() {
            *s = if i % 2 == 0 { 1.0 } else { -1.0 };
        }
        let mut out = [0.0f32; ggm_core::BLOCK];
        f.process(&input, &mut out);
        let in_energy: f32 = input.iter().map(|x| x * x).sum();
        let out_energy: f32 = out.iter().map(|x| x * x).sum();
        assert!(out_energy < in_energy, "low cutoff should attenuate a nyquist-rate input");
    }

    #[test]
    fn test_trapezoidal_dc_passes_through_in_steady_state() {
        let mut f = Svf::new(SvfType::Trapezoidal, 48_000.0);
        f.set_cutoff(1000.0);
        f.set_resonance(0.5);
        let input = [1.0f32; ggm_core::BLOCK];
        let mut out = [0.0f32; ggm_core::BLOCK];
        for _ in 0..50 {
            f.process(&input, &mut out);
        }
        assert!((out[ggm_core::BLOCK - 1] - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_zero_input_stays_silent() {
        let mut f = Svf::new(SvfType::Hc, 48_000.0);
        f.set_cutoff(500.0);
        f.set_resonance(0.3);
        let input = [0.0f32; ggm_core::BLOCK];
        let mut out = [1.0f32; ggm_core::BLOCK];
        f.process(&input, &mut out);
        for &s in out.iter() {
            assert_eq!(s, 0.0);
        }
    }
}
