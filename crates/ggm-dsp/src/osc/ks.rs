//! Karplus-Strong plucked string, ported from `ggm/src/osc/ks.c`. A fixed
//! 128-sample delay line is stepped through with a 32-bit phase value;
//! falling between samples is handled with linear interpolation, and each
//! time the step crosses a sample boundary that sample is averaged with its
//! neighbour (a one-pole low-pass "pluck decay" filter).

use ggm_core::block::AudioBuf;
use ggm_core::event::Event;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;
use ggm_core::util::{clampf, clampf_lo, map_exp, map_lin, RandState};

use super::freq_to_step;

const DELAY_BITS: u32 = 7;
const DELAY_SIZE: usize = 1 << DELAY_BITS;
const DELAY_MASK: u32 = (DELAY_SIZE as u32) - 1;
const FRAC_BITS: u32 = 32 - DELAY_BITS;
const FRAC_MASK: u32 = (1 << FRAC_BITS) - 1;
const FRAC_SCALE: f32 = 1.0 / (1u32 << FRAC_BITS) as f32;

/// MIDI-CC scale for the `attenuation` port: `0.75..1.0`.
pub fn cc_attenuation(v: f32) -> f32 {
    map_lin(v, 0.75, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KsState {
    Idle = 0,
    Plucked = 1,
    Release = 2,
    Reset = 3,
}

#[derive(Debug, Clone, Copy)]
pub struct Ks {
    sample_rate: f64,
    state: KsState,
    rand: RandState,
    delay: [f32; DELAY_SIZE],
    kval: [f32; 4],
    x: u32,
    xstep: u32,
}

impl Ks {
    pub fn new(sample_rate: f64) -> Self {
        Ks {
            sample_rate,
            state: KsState::Idle,
            rand: RandState::default(),
            delay: [0.0; DELAY_SIZE],
            kval: [0.0, 0.5, 0.8 * 0.5, 0.1 * 0.1 * 0.5],
            x: 0,
            xstep: 0,
        }
    }

    pub fn set_frequency(&mut self, freq: f32) {
        self.xstep = freq_to_step(freq, self.sample_rate);
    }

    pub fn set_attenuation(&mut self, attenuation: f32) {
        let attenuation = clampf(attenuation, 0.0, 1.0);
        self.kval[KsState::Plucked as usize] = 0.5 * attenuation;
    }

    fn pluck_buffer(&mut self, gate: f32) {
        let gate = clampf(gate, 0.0, 1.0);
        let gate = map_exp(gate, 0.0, 1.0, -4.0);

        let mut sum = 0.0f32;
        for i in 0..DELAY_SIZE - 1 {
            let mut val = gate * self.rand.next_f32();
            let x = sum + val;
            if x > 1.0 || x < -1.0 {
                val = -val;
            }
            sum += val;
            self.delay[i] = val;
        }
        self.delay[DELAY_SIZE - 1] = -sum;
    }

    fn zero_buffer(&mut self) {
        for i in 0..DELAY_SIZE - 1 {
            self.delay[i] = 0.0;
        }
    }

    pub fn gate(&mut self, level: f32) {
        if level > 0.0 {
            self.pluck_buffer(level);
            self.state = KsState::Plucked;
        } else {
            self.state = KsState::Release;
        }
    }

    /// `hard` zeroes the delay line and returns to idle (silent). A soft
    /// reset keeps ringing but switches to the aggressive decay state.
    pub fn reset(&mut self, hard: bool) {
        if hard {
            self.zero_buffer();
            self.state = KsState::Idle;
        } else {
            self.state = KsState::Reset;
        }
    }

    pub fn active(&self) -> bool {
        self.state != KsState::Idle
    }

    pub fn process(&mut self, buf: &mut AudioBuf) -> bool {
        if self.state == KsState::Idle {
            return false;
        }
        for s in buf.iter_mut() {
            let x0 = (self.x >> FRAC_BITS) & DELAY_MASK;
            let x1 = (x0 + 1) & DELAY_MASK;
            let y0 = self.delay[x0 as usize];
            let y1 = self.delay[x1 as usize];
            *s = y0 + (y1 - y0) * FRAC_SCALE * (self.x & FRAC_MASK) as f32;

            self.x = self.x.wrapping_add(self.xstep);

            if x0 != (self.x >> FRAC_BITS) & DELAY_MASK {
                let k = self.kval[self.state as usize];
                self.delay[x0 as usize] = k * (y0 + y1);
            }
        }
        true
    }
}

static IN_PORTS: &[PortInfo] = &[
    PortInfo::new("reset", PortKind::Bool),
    PortInfo::new("gate", PortKind::Float),
    PortInfo::new("note", PortKind::Float),
    PortInfo::new("frequency", PortKind::Float),
    PortInfo::scaled("attenuation", cc_attenuation),
];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static KS_TYPE: ModuleType = ModuleType {
    mname: "osc/ks",
    iname: "ks",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct KsModule {
    base: ModuleBase,
    osc: Ks,
}

impl KsModule {
    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, sample_rate: f64) -> ModuleHandle {
        module_new(parent, &KS_TYPE, name, id, |base| KsModule {
            base,
            osc: Ks::new(sample_rate),
        })
    }
}

impl Module for KsModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }
    fn handle_input(&mut self, port_idx: usize, event: &Event) {
        match port_idx {
            0 => self.osc.reset(event.as_bool()),
            1 => self.osc.gate(event.as_float()),
            2 => self.osc.set_frequency(ggm_core::midi::midi_to_frequency(event.as_float())),
            3 => self.osc.set_frequency(clampf_lo(event.as_float(), 0.0)),
            4 => self.osc.set_attenuation(event.as_float()),
            _ => {}
        }
    }
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        self.osc.process(bufs[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_produces_no_output() {
        let mut ks = Ks::new(48_000.0);
        ks.set_frequency(220.0);
        let mut buf = [1.0f32; ggm_core::BLOCK];
        assert!(!ks.process(&mut buf));
    }

    #[test]
    fn test_pluck_decays_toward_silence() {
        let mut ks = Ks::new(48_000.0);
        ks.set_frequency(220.0);
        ks.gate(1.0);
        let mut energy_first = 0.0f32;
        let mut buf = [0.0f32; ggm_core::BLOCK];
        ks.process(&mut buf);
        for &s in buf.iter() {
            energy_first += s * s;
        }
        let mut energy_later = 0.0f32;
        for _ in 0..40 {
            ks.process(&mut buf);
        }
        for &s in buf.iter() {
            energy_later += s * s;
        }
        assert!(energy_later < energy_first, "string should decay, not sustain or grow");
    }

    #[test]
    fn test_hard_reset_silences_and_idles() {
        let mut ks = Ks::new(48_000.0);
        ks.set_frequency(220.0);
        ks.gate(1.0);
        let mut buf = [0.0f32; ggm_core::BLOCK];
        ks.process(&mut buf);
        ks.reset(true);
        assert!(!ks.active());
        assert!(!ks.process(&mut buf));
    }

    #[test]
    fn test_deterministic_pluck_given_fixed_seed() {
        let mut a = Ks::new(48_000.0);
        let mut b = Ks::new(48_000.0);
        a.set_frequency(110.0);
        b.set_frequency(110.0);
        a.gate(0.8);
        b.gate(0.8);
        let mut ba = [0.0f32; ggm_core::BLOCK];
        let mut bb = [0.0f32; ggm_core::BLOCK];
        a.process(&mut ba);
        b.process(&mut bb);
        assert_eq!(ba, bb);
    }
}
