//! The ADSR envelope generator, ported from `ggm/src/core/adsr.c`.
//!
//! [`Adsr`] is the reusable state machine: composite voices (osc-voice,
//! Goom-voice, breath excitation, poly/mono voice managers) embed it
//! directly as a plain struct field. [`AdsrModule`] wraps it as a
//! standalone, patchable graph module so it can be wired and tested the
//! same way any other DSP block can.

use ggm_core::block::AudioBuf;
use ggm_core::event::Event;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;
use ggm_core::util::{clampf, map_lin};

/// `ln(1e-3)`, the natural log of the "segment complete" threshold.
pub const LEVEL_EPSILON: f32 = 1e-3;
const LN_LEVEL_EPSILON: f32 = -6.907_755_3;

pub const MIN_ATTACK_TIME: f32 = 2e-3;
pub const MIN_DECAY_TIME: f32 = 4e-3;
pub const MIN_RELEASE_TIME: f32 = 4e-3;
pub const SOFT_RESET_TIME: f32 = 30e-3;

/// MIDI-CC time ranges from spec.md §4.5, used as `PortInfo::cc_scale`
/// functions for the standalone module's parameter ports.
pub const MAX_ATTACK_TIME: f32 = 1.0;
pub const MAX_DECAY_TIME: f32 = 2.0;
pub const MAX_RELEASE_TIME: f32 = 1.0;

/// `k = 1 - exp(ln(eps) / (t * rate))`: the per-sample coefficient that
/// makes a first-order exponential segment reach within `eps` of its target
/// in `t` seconds at sample rate `rate`.
fn get_k(t: f32, rate: f64) -> f32 {
    if t <= 0.0 {
        return 1.0;
    }
    1.0 - libm_expf(LN_LEVEL_EPSILON / (t * rate as f32))
}

/// `no_std`-friendly `exp` (the crate otherwise avoids `std::f32` methods on
/// the hot path so it stays usable without the standard library feature).
#[cfg(feature = "std")]
fn libm_expf(x: f32) -> f32 {
    x.exp()
}

#[cfg(not(feature = "std"))]
fn libm_expf(x: f32) -> f32 {
    // get_k is only ever called from parameter setters (construction/patch
    // time, never the per-sample hot path), so a short Taylor/Pade-free
    // series evaluated via repeated squaring is an acceptable no_std stand-in.
    // exp(x) = 2^(x / ln2), reusing the crate's existing pow2 LUT.
    ggm_core::lut::pow2(x * core::f32::consts::LOG2_E)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdsrState {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
    /// Soft-reset ramp: a fast (30 ms) exponential to zero used to silence
    /// a voice being stolen without an audible click.
    Reset,
}

/// The 5(+1)-state envelope generator (spec.md §4.5).
#[derive(Debug, Clone, Copy)]
pub struct Adsr {
    sample_rate: f64,
    state: AdsrState,
    v: f32,
    sustain: f32,
    ak: f32,
    dk: f32,
    rk: f32,
    reset_k: f32,
}

impl Adsr {
    pub fn new(sample_rate: f64) -> Self {
        let mut a = Adsr {
            sample_rate,
            state: AdsrState::Idle,
            v: 0.0,
            sustain: 0.0,
            ak: 0.0,
            dk: 0.0,
            rk: 0.0,
            reset_k: get_k(SOFT_RESET_TIME, sample_rate),
        };
        a.set_attack(MIN_ATTACK_TIME);
        a.set_decay(MIN_DECAY_TIME);
        a.set_release(MIN_RELEASE_TIME);
        a
    }

    pub fn set_attack(&mut self, t: f32) {
        self.ak = get_k(t.max(MIN_ATTACK_TIME), self.sample_rate);
    }

    pub fn set_decay(&mut self, t: f32) {
        self.dk = get_k(t.max(MIN_DECAY_TIME), self.sample_rate);
    }

    pub fn set_sustain(&mut self, s: f32) {
        self.sustain = clampf(s, 0.0, 1.0);
    }

    pub fn set_release(&mut self, t: f32) {
        self.rk = get_k(t.max(MIN_RELEASE_TIME), self.sample_rate);
    }

    /// `true` once this envelope is back at `Idle` and producing silence.
    pub fn active(&self) -> bool {
        self.state != AdsrState::Idle
    }

    pub fn value(&self) -> f32 {
        self.v
    }

    pub fn state(&self) -> AdsrState {
        self.state
    }

    /// `gate > 0` starts (or restarts) the attack segment; `gate == 0`
    /// releases — straight to `Idle` if the release segment is
    /// instantaneous (`rk >= 1`, i.e. the floored minimum still rounds up
    /// to "done in one sample" at this sample rate), otherwise into the
    /// `Release` segment.
    pub fn gate(&mut self, level: f32) {
        if level > 0.0 {
            self.state = AdsrState::Attack;
        } else if self.state != AdsrState::Idle {
            if self.rk >= 1.0 {
                self.state = AdsrState::Idle;
                self.v = 0.0;
            } else {
                self.state = AdsrState::Release;
            }
        }
    }

    /// `hard = true`: immediate silence. `hard = false`: arm the soft-reset
    /// ramp unless already idle — used by the polyphonic voice manager to
    /// silence a voice about to be reallocated without a click.
    pub fn reset(&mut self, hard: bool) {
        if hard {
            self.state = AdsrState::Idle;
            self.v = 0.0;
        } else if self.state != AdsrState::Idle {
            self.state = AdsrState::Reset;
        }
    }

    /// Advances the envelope by one sample and returns its current value.
    pub fn step(&mut self) -> f32 {
        match self.state {
            AdsrState::Idle => {
                self.v = 0.0;
            }
            AdsrState::Attack => {
                self.v += self.ak * (1.0 - self.v);
                if self.v >= 1.0 - LEVEL_EPSILON {
                    self.v = 1.0;
                    self.state = AdsrState::Decay;
                }
            }
            AdsrState::Decay => {
                self.v += self.dk * (self.sustain - self.v);
                let thresh = self.sustain + (1.0 - self.sustain) * LEVEL_EPSILON;
                if self.v <= thresh {
                    if self.sustain <= 0.0 {
                        self.state = AdsrState::Idle;
                        self.v = 0.0;
                    } else {
                        self.state = AdsrState::Sustain;
                        self.v = self.sustain;
                    }
                }
            }
            AdsrState::Sustain => {
                self.v = self.sustain;
            }
            AdsrState::Release => {
                self.v += self.rk * (0.0 - self.v);
                if self.v <= self.sustain * LEVEL_EPSILON {
                    self.state = AdsrState::Idle;
                    self.v = 0.0;
                }
            }
            AdsrState::Reset => {
                self.v += self.reset_k * (0.0 - self.v);
                if self.v <= self.sustain * LEVEL_EPSILON {
                    self.state = AdsrState::Idle;
                    self.v = 0.0;
                }
            }
        }
        self.v
    }

    /// Fills `buf` with `BLOCK` samples of the envelope and returns whether
    /// any of them were non-idle (the `process` "active" convention).
    pub fn process(&mut self, buf: &mut AudioBuf) -> bool {
        let mut active = false;
        for s in buf.iter_mut() {
            *s = self.step();
            active |= self.active();
        }
        active
    }
}

fn cc_attack(x: f32) -> f32 {
    map_lin(x, MIN_ATTACK_TIME, MAX_ATTACK_TIME)
}
fn cc_decay(x: f32) -> f32 {
    map_lin(x, MIN_DECAY_TIME, MAX_DECAY_TIME)
}
fn cc_sustain(x: f32) -> f32 {
    map_lin(x, 0.0, 1.0)
}
fn cc_release(x: f32) -> f32 {
    map_lin(x, MIN_RELEASE_TIME, MAX_RELEASE_TIME)
}

static IN_PORTS: &[PortInfo] = &[
    PortInfo::new("gate", PortKind::Float),
    PortInfo::new("reset", PortKind::Bool),
    PortInfo::scaled("attack", cc_attack),
    PortInfo::scaled("decay", cc_decay),
    PortInfo::scaled("sustain", cc_sustain),
    PortInfo::scaled("release", cc_release),
];

static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static ADSR_TYPE: ModuleType = ModuleType {
    mname: "adsr",
    iname: "adsr",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

/// Standalone, patchable wrapper around [`Adsr`].
pub struct AdsrModule {
    base: ModuleBase,
    env: Adsr,
}

impl AdsrModule {
    pub fn new(base: ModuleBase, sample_rate: f64) -> Self {
        AdsrModule {
            base,
            env: Adsr::new(sample_rate),
        }
    }

    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, sample_rate: f64) -> ModuleHandle {
        module_new(parent, &ADSR_TYPE, name, id, |base| AdsrModule::new(base, sample_rate))
    }
}

impl Module for AdsrModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn handle_input(&mut self, port_idx: usize, event: &Event) {
        match port_idx {
            0 => self.env.gate(event.as_float()),
            1 => self.env.reset(event.as_bool()),
            2 => self.env.set_attack(event.as_float()),
            3 => self.env.set_decay(event.as_float()),
            4 => self.env.set_sustain(event.as_float()),
            5 => self.env.set_release(event.as_float()),
            _ => {}
        }
    }

    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        self.env.process(bufs[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_produces_silence() {
        let mut e = Adsr::new(48_000.0);
        assert!(!e.active());
        assert_eq!(e.step(), 0.0);
    }

    #[test]
    fn test_attack_reaches_decay() {
        let mut e = Adsr::new(48_000.0);
        e.set_sustain(0.5);
        e.gate(1.0);
        let mut reached_decay = false;
        for _ in 0..48_000 {
            e.step();
            if e.state() == AdsrState::Decay {
                reached_decay = true;
                break;
            }
        }
        assert!(reached_decay, "envelope never reached Decay");
    }

    #[test]
    fn test_zero_sustain_goes_to_idle_after_decay() {
        let mut e = Adsr::new(48_000.0);
        e.set_sustain(0.0);
        e.gate(1.0);
        let mut saw_idle_after_attack = false;
        for _ in 0..48_000 {
            e.step();
            if e.state() == AdsrState::Idle && e.value() == 0.0 {
                saw_idle_after_attack = true;
                break;
            }
        }
        assert!(saw_idle_after_attack);
    }

    #[test]
    fn test_release_returns_to_idle() {
        let mut e = Adsr::new(48_000.0);
        e.set_sustain(0.5);
        e.gate(1.0);
        for _ in 0..48_000 {
            e.step();
        }
        assert_eq!(e.state(), AdsrState::Sustain);
        e.gate(0.0);
        for _ in 0..48_000 {
            e.step();
            if e.state() == AdsrState::Idle {
                break;
            }
        }
        assert_eq!(e.state(), AdsrState::Idle);
        assert_eq!(e.value(), 0.0);
    }

    #[test]
    fn test_hard_reset_silences_immediately() {
        let mut e = Adsr::new(48_000.0);
        e.gate(1.0);
        for _ in 0..100 {
            e.step();
        }
        assert!(e.value() > 0.0);
        e.reset(true);
        assert_eq!(e.state(), AdsrState::Idle);
        assert_eq!(e.value(), 0.0);
    }

    #[test]
    fn test_soft_reset_ramps_to_idle() {
        let mut e = Adsr::new(48_000.0);
        e.set_sustain(0.8);
        e.gate(1.0);
        for _ in 0..48_000 {
            e.step();
        }
        let v_before = e.value();
        e.reset(false);
        assert_eq!(e.state(), AdsrState::Reset);
        for _ in 0..48_000 {
            e.step();
            if e.state() == AdsrState::Idle {
                break;
            }
        }
        assert_eq!(e.state(), AdsrState::Idle);
        assert!(v_before > 0.0);
    }

    #[test]
    fn test_cc_scale_ranges() {
        assert!((cc_attack(0.0) - MIN_ATTACK_TIME).abs() < 1e-6);
        assert!((cc_attack(1.0) - MAX_ATTACK_TIME).abs() < 1e-6);
        assert!((cc_decay(1.0) - MAX_DECAY_TIME).abs() < 1e-6);
        assert!((cc_release(1.0) - MAX_RELEASE_TIME).abs() < 1e-6);
        assert!((cc_sustain(0.5) - 0.5).abs() < 1e-6);
    }
}
