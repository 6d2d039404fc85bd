//! Low frequency oscillator, ported from `ggm/src/osc/lfo.c`. Six wave
//! shapes computed in `q8.24` fixed point exactly as the original, then
//! converted back to float on the way out.

use ggm_core::block::AudioBuf;
use ggm_core::event::Event;
use ggm_core::lut::cos_lookup;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;
use ggm_core::util::{clampf_lo, clampi};

use super::freq_to_step;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoShape {
    Triangle = 0,
    SawDown = 1,
    SawUp = 2,
    Square = 3,
    Sine = 4,
    SampleAndHold = 5,
}

impl LfoShape {
    fn from_index(i: i32) -> Self {
        match clampi(i, 0, 5) {
            0 => LfoShape::Triangle,
            1 => LfoShape::SawDown,
            2 => LfoShape::SawUp,
            3 => LfoShape::Square,
            4 => LfoShape::Sine,
            _ => LfoShape::SampleAndHold,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Lfo {
    sample_rate: f64,
    shape: LfoShape,
    depth: f32,
    x: u32,
    xstep: u32,
    rand_state: u32,
}

impl Lfo {
    pub fn new(sample_rate: f64) -> Self {
        Lfo {
            sample_rate,
            shape: LfoShape::Triangle,
            depth: 1.0,
            x: 0,
            xstep: 0,
            rand_state: 0,
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.xstep = freq_to_step(clampf_lo(rate, 0.0), self.sample_rate);
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = clampf_lo(depth, 0.0);
    }

    pub fn set_shape(&mut self, shape: i32) {
        self.shape = LfoShape::from_index(shape);
    }

    pub fn sync(&mut self) {
        self.x = 0;
    }

    fn sample(&mut self) -> f32 {
        match self.shape {
            LfoShape::Triangle => {
                let x = self.x.wrapping_add(1 << 30);
                let mut sample = (x >> 6) as i32;
                sample ^= -((x >> 31) as i32);
                sample &= (1 << 25) - 1;
                sample -= 1 << 24;
                sample as f32 / (1 << 24) as f32
            }
            LfoShape::SawDown => {
                let sample = -(self.x as i32) >> 7;
                sample as f32 / (1 << 24) as f32
            }
            LfoShape::SawUp => {
                let sample = (self.x as i32) >> 7;
                sample as f32 / (1 << 24) as f32
            }
            LfoShape::Square => {
                let sample = (self.x & (1 << 31)) as i32;
                let sample = (sample >> 6) | (1 << 24);
                sample as f32 / (1 << 24) as f32
            }
            LfoShape::Sine => {
                let x = self.x.wrapping_sub(1 << 30);
                return cos_lookup(x);
            }
            LfoShape::SampleAndHold => {
                if self.x < self.xstep {
                    self.rand_state = (self.rand_state.wrapping_mul(179).wrapping_add(17)) & 0xff;
                }
                let sample = ((self.rand_state << 24) as i32) >> 7;
                sample as f32 / (1 << 24) as f32
            }
        }
    }

    pub fn process(&mut self, buf: &mut AudioBuf) -> bool {
        for s in buf.iter_mut() {
            self.x = self.x.wrapping_add(self.xstep);
            *s = self.depth * self.sample();
        }
        true
    }
}

static IN_PORTS: &[PortInfo] = &[
    PortInfo::new("rate", PortKind::Float),
    PortInfo::new("depth", PortKind::Float),
    PortInfo::new("shape", PortKind::Int),
    PortInfo::new("sync", PortKind::Bool),
];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static LFO_TYPE: ModuleType = ModuleType {
    mname: "osc/lfo",
    iname: "lfo",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct LfoModule {
    base: ModuleBase,
    osc: Lfo,
}

impl LfoModule {
    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, sample_rate: f64) -> ModuleHandle {
        module_new(parent, &LFO_TYPE, name, id, |base| LfoModule {
            base,
            osc: Lfo::new(sample_rate),
        })
    }
}

impl Module for LfoModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }
    fn handle_input(&mut self, port_idx: usize, event: &Event) {
        match port_idx {
            0 => self.osc.set_rate(event.as_float()),
            1 => self.osc.set_depth(event.as_float()),
            2 => self.osc.set_shape(event.as_int()),
            3 => {
                if event.as_bool() {
                    self.osc.sync();
                }
            }
            _ => {}
        }
    }
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        self.osc.process(bufs[0])
    }
}
