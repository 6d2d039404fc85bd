//! Fixed-length delay line, ported from `ggm/src/fx/delay.c`.
//!
//! The original reads from one slot behind the write cursor rather than
//! `N` slots behind: `delay_step` writes `x` at `wr`, then reads `wr - 1`,
//! then advances `wr`. That makes the audible delay exactly one sample
//! regardless of how large a buffer the caller allocates — `N` only bounds
//! memory, never the delay time. Kept verbatim (see `DESIGN.md`) rather
//! than "fixed" into a true `N`-sample delay line.

use ggm_core::block::AudioBuf;
use ggm_core::compat::Vec;
use ggm_core::error::{Error, Result};
use ggm_core::event::Event;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;

#[derive(Debug, Clone)]
pub struct Delay {
    buf: Vec<f32>,
    wr: usize,
}

impl Delay {
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::InvalidArgument(
                "delay".into(),
                "length must be greater than zero".into(),
            ));
        }
        Ok(Delay {
            buf: { let mut v = Vec::with_capacity(len); v.resize(len, 0.0); v },
            wr: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn step(&mut self, x: f32) -> f32 {
        let n = self.buf.len();
        self.buf[self.wr] = x;
        let rd = (self.wr + n - 1) % n;
        let y = self.buf[rd];
        self.wr = (self.wr + 1) % n;
        y
    }

    pub fn process(&mut self, input: &AudioBuf, out: &mut AudioBuf) -> bool {
        for (o, &x) in out.iter_mut().zip(input.iter()) {
            *o = self.step(x);
        }
        true
    }
}

static IN_PORTS: &[PortInfo] = &[PortInfo::new("in", PortKind::Audio)];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static DELAY_TYPE: ModuleType = ModuleType {
    mname: "fx/delay",
    iname: "delay",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct DelayModule {
    base: ModuleBase,
    delay: Delay,
}

impl DelayModule {
    pub fn build(
        parent: Option<ModuleHandle>,
        name: Option<&str>,
        id: Option<u32>,
        len: usize,
    ) -> Result<ModuleHandle> {
        let delay = Delay::new(len)?;
        Ok(module_new(parent, &DELAY_TYPE, name, id, |base| DelayModule { base, delay }))
    }
}

impl Module for DelayModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }
    fn handle_input(&mut self, _port_idx: usize, _event: &Event) {}
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        let (ins, outs) = bufs.split_at_mut(1);
        let input = *ins[0];
        self.delay.process(&input, outs[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_length_is_rejected() {
        assert!(Delay::new(0).is_err());
    }

    #[test]
    fn test_effective_delay_is_one_sample_regardless_of_length() {
        // len == 1 is degenerate: `wr - 1 mod 1` is always `wr` itself, so
        // the line passes through with no delay at all. Any len > 1 still
        // only ever delays by one sample, never by len.
        for len in [2usize, 4, 128, 4096] {
            let mut d = Delay::new(len).unwrap();
            let first = d.step(1.0);
            assert_eq!(first, 0.0, "len={len}");
            let second = d.step(2.0);
            assert_eq!(second, 1.0, "len={len}");
            let third = d.step(3.0);
            assert_eq!(third, 2.0, "len={len}");
        }
    }

    #[test]
    fn test_length_one_is_a_pass_through() {
        let mut d = Delay::new(1).unwrap();
        assert_eq!(d.step(1.0), 1.0);
        assert_eq!(d.step(2.0), 2.0);
    }

    #[test]
    fn test_process_matches_step() {
        let mut d = Delay::new(16).unwrap();
        let mut input = [0.0f32; ggm_core::BLOCK];
        for (i, s) in input.iter_mut().enumerate() {
            *s = i as f32;
        }
        let mut out = [0.0f32; ggm_core::BLOCK];
        d.process(&input, &mut out);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
        assert_eq!(out[2], 1.0);
    }
}
