//! Goom-wave voice, grounded on `voice/goom.c`: a Goom oscillator shaped by
//! an amplitude ADSR and passed through a state-variable lowpass. The
//! original also drives a second ADSR meant to modulate the filter cutoff
//! per-note, but never actually wires its output anywhere — it is stepped
//! every sample (so its own attack/decay/sustain/release timing still
//! consumes CPU and its `active()` state still matters for gate bookkeeping
//! in the original) and then discarded. That dead envelope, and its own
//! attack/decay/sustain/release ports, are kept here for parity rather than
//! silently dropped.

use ggm_core::block::AudioBuf;
use ggm_core::event::Event;
use ggm_core::midi::midi_to_frequency;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;
use ggm_core::util::{clampf, clampf_lo, map_lin};
use ggm_core::BLOCK;

use ggm_dsp::envelope::{Adsr, MAX_DECAY_TIME, MAX_RELEASE_TIME, MIN_ATTACK_TIME, MIN_DECAY_TIME, MIN_RELEASE_TIME};
use ggm_dsp::filter::svf::{Svf, SvfType};
use ggm_dsp::osc::goom::Goom;

#[derive(Debug, Clone, Copy)]
pub struct GoomVoice {
    osc: Goom,
    amp_env: Adsr,
    /// Stepped every sample for parity with the original; never applied.
    lpf_env: Adsr,
    lpf: Svf,
    duty: f32,
    slope: f32,
}

impl GoomVoice {
    pub fn new(sample_rate: f64) -> Self {
        GoomVoice {
            osc: Goom::new(sample_rate),
            amp_env: Adsr::new(sample_rate),
            lpf_env: Adsr::new(sample_rate),
            lpf: Svf::new(SvfType::Hc, sample_rate),
            duty: 0.5,
            slope: 0.5,
        }
    }

    pub fn gate(&mut self, level: f32) {
        self.amp_env.gate(level);
        self.lpf_env.gate(level);
    }

    pub fn reset(&mut self, hard: bool) {
        self.amp_env.reset(hard);
        self.lpf_env.reset(hard);
    }

    pub fn set_note(&mut self, note: f32) {
        self.osc.set_frequency(midi_to_frequency(note));
    }

    pub fn set_frequency(&mut self, freq: f32) {
        self.osc.set_frequency(clampf_lo(freq, 0.0));
    }

    pub fn set_duty(&mut self, duty: f32) {
        self.duty = clampf(duty, 0.0, 1.0);
        self.osc.set_shape(self.duty, self.slope);
    }

    pub fn set_slope(&mut self, slope: f32) {
        self.slope = clampf(slope, 0.0, 1.0);
        self.osc.set_shape(self.duty, self.slope);
    }

    pub fn set_attack(&mut self, t: f32) {
        self.amp_env.set_attack(t);
    }
    pub fn set_decay(&mut self, t: f32) {
        self.amp_env.set_decay(t);
    }
    pub fn set_sustain(&mut self, s: f32) {
        self.amp_env.set_sustain(s);
    }
    pub fn set_release(&mut self, t: f32) {
        self.amp_env.set_release(t);
    }

    pub fn set_lpf_attack(&mut self, t: f32) {
        self.lpf_env.set_attack(t);
    }
    pub fn set_lpf_decay(&mut self, t: f32) {
        self.lpf_env.set_decay(t);
    }
    pub fn set_lpf_sustain(&mut self, s: f32) {
        self.lpf_env.set_sustain(s);
    }
    pub fn set_lpf_release(&mut self, t: f32) {
        self.lpf_env.set_release(t);
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.lpf.set_cutoff(cutoff);
    }
    pub fn set_resonance(&mut self, resonance: f32) {
        self.lpf.set_resonance(resonance);
    }

    pub fn active(&self) -> bool {
        self.amp_env.active()
    }

    pub fn process(&mut self, out: &mut AudioBuf) -> bool {
        let mut raw = [0.0f32; BLOCK];
        let mut active = false;
        for i in 0..BLOCK {
            let tone = self.osc.sample();
            let env_v = self.amp_env.step();
            self.lpf_env.step();
            active |= self.amp_env.active();
            raw[i] = tone * env_v;
        }
        self.lpf.process(&raw, out);
        active
    }
}

fn cc_attack(x: f32) -> f32 {
    map_lin(x, MIN_ATTACK_TIME, 1.0)
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
    PortInfo::new("note", PortKind::Float),
    PortInfo::new("frequency", PortKind::Float),
    PortInfo::new("duty", PortKind::Float),
    PortInfo::new("slope", PortKind::Float),
    PortInfo::scaled("attack", cc_attack),
    PortInfo::scaled("decay", cc_decay),
    PortInfo::scaled("sustain", cc_sustain),
    PortInfo::scaled("release", cc_release),
    PortInfo::scaled("lpf_attack", cc_attack),
    PortInfo::scaled("lpf_decay", cc_decay),
    PortInfo::scaled("lpf_sustain", cc_sustain),
    PortInfo::scaled("lpf_release", cc_release),
    PortInfo::new("cutoff", PortKind::Float),
    PortInfo::new("resonance", PortKind::Float),
];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static GOOM_VOICE_TYPE: ModuleType = ModuleType {
    mname: "voice/goom",
    iname: "voice",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct GoomVoiceModule {
    base: ModuleBase,
    voice: GoomVoice,
}

impl GoomVoiceModule {
    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, sample_rate: f64) -> ModuleHandle {
        module_new(parent, &GOOM_VOICE_TYPE, name, id, |base| GoomVoiceModule {
            base,
            voice: GoomVoice::new(sample_rate),
        })
    }
}

impl Module for GoomVoiceModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }
    fn handle_input(&mut self, port_idx: usize, event: &Event) {
        match port_idx {
            0 => self.voice.gate(event.as_float()),
            1 => self.voice.reset(event.as_bool()),
            2 => self.voice.set_note(event.as_float()),
            3 => self.voice.set_frequency(event.as_float()),
            4 => self.voice.set_duty(event.as_float()),
            5 => self.voice.set_slope(event.as_float()),
            6 => self.voice.set_attack(event.as_float()),
            7 => self.voice.set_decay(event.as_float()),
            8 => self.voice.set_sustain(event.as_float()),
            9 => self.voice.set_release(event.as_float()),
            10 => self.voice.set_lpf_attack(event.as_float()),
            11 => self.voice.set_lpf_decay(event.as_float()),
            12 => self.voice.set_lpf_sustain(event.as_float()),
            13 => self.voice.set_lpf_release(event.as_float()),
            14 => self.voice.set_cutoff(event.as_float()),
            15 => self.voice.set_resonance(event.as_float()),
            _ => {}
        }
    }
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        self.voice.process(bufs[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_voice_is_silent() {
        let mut v = GoomVoice::new(48_000.0);
        v.set_note(57.0);
        let mut out = [1.0f32; BLOCK];
        let active = v.process(&mut out);
        assert!(!active);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_gate_produces_bounded_output() {
        let mut v = GoomVoice::new(48_000.0);
        v.set_note(57.0);
        v.set_sustain(0.8);
        v.set_cutoff(2000.0);
        v.gate(1.0);
        let mut out = [0.0f32; BLOCK];
        for _ in 0..40 {
            v.process(&mut out);
        }
        assert!(out.iter().all(|s| s.is_finite()));
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_lpf_envelope_does_not_affect_output_but_still_runs() {
        let mut v = GoomVoice::new(48_000.0);
        v.set_note(57.0);
        v.set_sustain(0.8);
        v.set_lpf_attack(0.5);
        v.set_lpf_release(0.5);
        v.gate(1.0);
        let mut with_lpf_env = [0.0f32; BLOCK];
        for _ in 0..20 {
            v.process(&mut with_lpf_env);
        }

        let mut v2 = GoomVoice::new(48_000.0);
        v2.set_note(57.0);
        v2.set_sustain(0.8);
        v2.gate(1.0);
        let mut without = [0.0f32; BLOCK];
        for _ in 0..20 {
            v2.process(&mut without);
        }

        assert_eq!(with_lpf_env, without);
    }
}
