//! Noise generator, ported from `ggm/src/osc/noise.c`. White noise comes
//! straight from the shared linear-congruential generator; brown and the
//! two pink variants filter it through one-pole (brown), three-pole
//! (pink1) or Paul Kellett's seven-pole (pink2) state.

use ggm_core::block::AudioBuf;
use ggm_core::event::Event;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;
use ggm_core::util::RandState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseType {
    White,
    Brown,
    Pink1,
    Pink2,
}

#[derive(Debug, Clone, Copy)]
pub struct Noise {
    ty: NoiseType,
    rand: RandState,
    b0: f32,
    b1: f32,
    b2: f32,
    b3: f32,
    b4: f32,
    b5: f32,
    b6: f32,
}

impl Noise {
    pub fn new(ty: NoiseType) -> Self {
        Noise {
            ty,
            rand: RandState::default(),
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            b3: 0.0,
            b4: 0.0,
            b5: 0.0,
            b6: 0.0,
        }
    }

    fn generate_white(&mut self, out: &mut AudioBuf) {
        for s in out.iter_mut() {
            *s = self.rand.next_f32();
        }
    }

    fn generate_brown(&mut self, out: &mut AudioBuf) {
        let mut b0 = self.b0;
        for s in out.iter_mut() {
            let white = self.rand.next_f32();
            b0 = (b0 + (0.02 * white)) * (1.0 / 1.02);
            *s = b0 * (1.0 / 0.38);
        }
        self.b0 = b0;
    }

    fn generate_pink1(&mut self, out: &mut AudioBuf) {
        let (mut b0, mut b1, mut b2) = (self.b0, self.b1, self.b2);
        for s in out.iter_mut() {
            let white = self.rand.next_f32();
            b0 = 0.997_65 * b0 + white * 0.099_046;
            b1 = 0.963_00 * b1 + white * 0.296_516_4;
            b2 = 0.570_00 * b2 + white * 1.052_691_3;
            let pink = b0 + b1 + b2 + white * 0.1848;
            *s = pink * (1.0 / 10.4);
        }
        self.b0 = b0;
        self.b1 = b1;
        self.b2 = b2;
    }

    fn generate_pink2(&mut self, out: &mut AudioBuf) {
        let (mut b0, mut b1, mut b2, mut b3, mut b4, mut b5, mut b6) =
            (self.b0, self.b1, self.b2, self.b3, self.b4, self.b5, self.b6);
        for s in out.iter_mut() {
            let white = self.rand.next_f32();
            b0 = 0.998_86 * b0 + white * 0.055_517_9;
            b1 = 0.993_32 * b1 + white * 0.075_075_9;
            b2 = 0.969_00 * b2 + white * 0.153_852_0;
            b3 = 0.866_50 * b3 + white * 0.310_485_6;
            b4 = 0.550_00 * b4 + white * 0.532_952_2;
            b5 = -0.7616 * b5 - white * 0.016_898_0;
            let pink = b0 + b1 + b2 + b3 + b4 + b5 + b6 + white * 0.5362;
            b6 = white * 0.115_926;
            *s = pink * (1.0 / 10.2);
        }
        self.b0 = b0;
        self.b1 = b1;
        self.b2 = b2;
        self.b3 = b3;
        self.b4 = b4;
        self.b5 = b5;
        self.b6 = b6;
    }

    pub fn process(&mut self, buf: &mut AudioBuf) -> bool {
        match self.ty {
            NoiseType::White => self.generate_white(buf),
            NoiseType::Brown => self.generate_brown(buf),
            NoiseType::Pink1 => self.generate_pink1(buf),
            NoiseType::Pink2 => self.generate_pink2(buf),
        }
        true
    }
}

static IN_PORTS: &[PortInfo] = &[
    PortInfo::new("reset", PortKind::Bool),
    PortInfo::new("frequency", PortKind::Float),
];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static NOISE_TYPE: ModuleType = ModuleType {
    mname: "osc/noise",
    iname: "noise",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct NoiseModule {
    base: ModuleBase,
    gen: Noise,
}

impl NoiseModule {
    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, ty: NoiseType) -> ModuleHandle {
        module_new(parent, &NOISE_TYPE, name, id, |base| NoiseModule {
            base,
            gen: Noise::new(ty),
        })
    }
}

impl Module for NoiseModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }
    fn handle_input(&mut self, _port_idx: usize, _event: &Event) {
        // reset/frequency are unused stubs in the original, kept for
        // port-table compatibility with the other oscillators.
    }
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        self.gen.process(bufs[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_noise_in_range() {
        let mut n = Noise::new(NoiseType::White);
        let mut buf = [0.0f32; ggm_core::BLOCK];
        n.process(&mut buf);
        for &s in buf.iter() {
            assert!((-1.0..1.0).contains(&s));
        }
    }

    #[test]
    fn test_deterministic_given_seed() {
        let mut a = Noise::new(NoiseType::Pink2);
        let mut b = Noise::new(NoiseType::Pink2);
        let mut ba = [0.0f32; ggm_core::BLOCK];
        let mut bb = [0.0f32; ggm_core::BLOCK];
        a.process(&mut ba);
        b.process(&mut bb);
        assert_eq!(ba, bb);
    }

    #[test]
    fn test_brown_noise_is_bounded() {
        let mut n = Noise::new(NoiseType::Brown);
        let mut buf = [0.0f32; ggm_core::BLOCK];
        for _ in 0..50 {
            n.process(&mut buf);
            for &s in buf.iter() {
                assert!(s.is_finite());
                assert!(s.abs() < 5.0);
            }
        }
    }
}
