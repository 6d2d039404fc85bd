//! Goom wave oscillator, ported from `ggm/src/osc/goom.c`.
//!
//! A Goom wave has four segments per period: a falling sine (`s0`), a flat
//! trough (`f0`), a rising sine (`s1`) and a flat crest (`f1`). `duty` splits
//! the period between `s0f0` and `s1f1`; `slope` splits each of those halves
//! between its sloped sine portion and its flat portion. See
//! <https://www.quinapalus.com/goom.html> for the shape this approximates.

use ggm_core::block::AudioBuf;
use ggm_core::event::Event;
use ggm_core::lut::cos_lookup;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;
use ggm_core::util::{clampf, clampf_lo, map_lin};
use ggm_core::HALF_CYCLE;

/// `2^32` as a float, the span of the phase accumulator. `HALF_CYCLE` etc.
/// are `u32` wraparound constants and can't stand in for this directly.
const FULL_CYCLE_F: f32 = 4_294_967_296.0;

use super::freq_to_step;

#[derive(Debug, Clone, Copy)]
pub struct Goom {
    sample_rate: f64,
    duty: f32,
    slope: f32,
    tp: u32,
    k0: f32,
    k1: f32,
    x: u32,
    xstep: u32,
    xreset: u32,
    gated: bool,
}

impl Goom {
    pub fn new(sample_rate: f64) -> Self {
        let mut g = Goom {
            sample_rate,
            duty: 0.0,
            slope: 0.0,
            tp: 0,
            k0: 0.0,
            k1: 0.0,
            x: 0,
            xstep: 0,
            xreset: 0,
            gated: false,
        };
        g.set_shape(0.5, 0.5);
        g.x = g.xreset;
        g
    }

    pub fn set_shape(&mut self, duty: f32, slope: f32) {
        self.duty = duty;
        self.tp = (FULL_CYCLE_F * map_lin(duty, 0.05, 0.5)) as u32;

        self.slope = slope;
        let slope = map_lin(slope, 0.1, 1.0);
        self.k0 = 1.0 / (self.tp as f32 * slope);
        self.k1 = 1.0 / ((FULL_CYCLE_F - 1.0 - self.tp as f32) * slope);
        self.xreset = (self.tp as f32 * slope * 0.5) as u32;
    }

    pub fn set_frequency(&mut self, freq: f32) {
        self.xstep = freq_to_step(freq, self.sample_rate);
    }

    /// `gate > 0` resets the phase to the zero-output position and starts
    /// the oscillator; `gate == 0` stops it.
    pub fn gate(&mut self, level: f32) {
        if level > 0.0 {
            self.x = self.xreset;
            self.gated = true;
        } else {
            self.gated = false;
        }
    }

    pub fn active(&self) -> bool {
        self.gated
    }

    /// Resets the phase to the zero-output position without touching the
    /// gate state.
    pub fn reset_phase(&mut self) {
        self.x = self.xreset;
    }

    pub fn sample(&mut self) -> f32 {
        let (mut x, ofs) = if self.x < self.tp {
            (self.x as f32 * self.k0, 0u32)
        } else {
            ((self.x - self.tp) as f32 * self.k1, HALF_CYCLE)
        };
        if x > 1.0 {
            x = 1.0;
        }
        let out = cos_lookup((x * HALF_CYCLE as f32) as u32 + ofs);
        self.x = self.x.wrapping_add(self.xstep);
        out
    }

    pub fn process(&mut self, buf: &mut AudioBuf) -> bool {
        if !self.gated {
            return false;
        }
        for s in buf.iter_mut() {
            *s = self.sample();
        }
        true
    }
}

static IN_PORTS: &[PortInfo] = &[
    PortInfo::new("gate", PortKind::Float),
    PortInfo::new("note", PortKind::Float),
    PortInfo::new("frequency", PortKind::Float),
    PortInfo::new("duty", PortKind::Float),
    PortInfo::new("slope", PortKind::Float),
    PortInfo::new("reset", PortKind::Bool),
];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static GOOM_TYPE: ModuleType = ModuleType {
    mname: "osc/goom",
    iname: "goom",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct GoomModule {
    base: ModuleBase,
    osc: Goom,
}

impl GoomModule {
    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, sample_rate: f64) -> ModuleHandle {
        module_new(parent, &GOOM_TYPE, name, id, |base| GoomModule {
            base,
            osc: Goom::new(sample_rate),
        })
    }
}

impl Module for GoomModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }
    fn handle_input(&mut self, port_idx: usize, event: &Event) {
        match port_idx {
            0 => self.osc.gate(event.as_float()),
            1 => self.osc.set_frequency(ggm_core::midi::midi_to_frequency(event.as_float())),
            2 => self.osc.set_frequency(clampf_lo(event.as_float(), 0.0)),
            3 => {
                let duty = clampf(event.as_float(), 0.0, 1.0);
                self.osc.set_shape(duty, self.osc.slope);
            }
            4 => {
                let slope = clampf(event.as_float(), 0.0, 1.0);
                self.osc.set_shape(self.osc.duty, slope);
            }
            5 => {
                if event.as_bool() {
                    self.osc.reset_phase();
                }
            }
            _ => {}
        }
    }
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        self.osc.process(bufs[0])
    }
}
