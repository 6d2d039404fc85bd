//! Sine oscillator: the cosine LUT driven straight by the phase
//! accumulator. Ported from `ggm/src/osc/sine.c`.

use super::freq_to_step;
use ggm_core::block::AudioBuf;
use ggm_core::event::Event;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;
use ggm_core::QUARTER_CYCLE;

#[derive(Debug, Clone, Copy)]
pub struct Sine {
    sample_rate: f64,
    x: u32,
    xstep: u32,
    gated: bool,
}

impl Sine {
    pub fn new(sample_rate: f64) -> Self {
        Sine {
            sample_rate,
            x: QUARTER_CYCLE,
            xstep: 0,
            gated: false,
        }
    }

    pub fn set_frequency(&mut self, freq: f32) {
        self.xstep = freq_to_step(freq, self.sample_rate);
    }

    /// `gate > 0` starts the oscillator fresh at zero output (quarter-cycle
    /// phase); `gate == 0` stops it.
    pub fn gate(&mut self, level: f32) {
        if level > 0.0 {
            self.x = QUARTER_CYCLE;
            self.gated = true;
        } else {
            self.gated = false;
        }
    }

    pub fn active(&self) -> bool {
        self.gated
    }

    pub fn sample(&mut self) -> f32 {
        let v = ggm_core::lut::cos_lookup(self.x);
        self.x = self.x.wrapping_add(self.xstep);
        v
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
];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static SINE_TYPE: ModuleType = ModuleType {
    mname: "sine",
    iname: "sine",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct SineModule {
    base: ModuleBase,
    osc: Sine,
}

impl SineModule {
    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, sample_rate: f64) -> ModuleHandle {
        module_new(parent, &SINE_TYPE, name, id, |base| SineModule {
            base,
            osc: Sine::new(sample_rate),
        })
    }
}

impl Module for SineModule {
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
            2 => self.osc.set_frequency(event.as_float()),
            _ => {}
        }
    }
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        self.osc.process(bufs[0])
    }
}
