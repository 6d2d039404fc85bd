//! Oscillator voice, grounded on `voice/osc.c`: a sine oscillator driven
//! by an ADSR's amplitude. `gate`/`reset` only ever reach the envelope —
//! the oscillator's phase free-runs continuously (its `sample()` is read
//! directly every tick rather than going through `Sine::process`, which
//! would require `Sine::gate` and reset phase on every retrigger). A voice
//! manager retriggering the same voice therefore restarts the amplitude
//! envelope without a phase discontinuity in the tone underneath it.

use ggm_core::block::AudioBuf;
use ggm_core::event::Event;
use ggm_core::midi::midi_to_frequency;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;
use ggm_core::util::clampf_lo;
use ggm_core::BLOCK;

use ggm_dsp::envelope::{Adsr, MAX_DECAY_TIME, MAX_RELEASE_TIME, MIN_ATTACK_TIME, MIN_DECAY_TIME, MIN_RELEASE_TIME};
use ggm_dsp::osc::sine::Sine;
use ggm_core::util::map_lin;

#[derive(Debug, Clone, Copy)]
pub struct OscVoice {
    osc: Sine,
    env: Adsr,
}

impl OscVoice {
    pub fn new(sample_rate: f64) -> Self {
        OscVoice {
            osc: Sine::new(sample_rate),
            env: Adsr::new(sample_rate),
        }
    }

    pub fn gate(&mut self, level: f32) {
        self.env.gate(level);
    }

    pub fn reset(&mut self, hard: bool) {
        self.env.reset(hard);
    }

    pub fn set_note(&mut self, note: f32) {
        self.osc.set_frequency(midi_to_frequency(note));
    }

    pub fn set_frequency(&mut self, freq: f32) {
        self.osc.set_frequency(clampf_lo(freq, 0.0));
    }

    pub fn set_attack(&mut self, t: f32) {
        self.env.set_attack(t);
    }
    pub fn set_decay(&mut self, t: f32) {
        self.env.set_decay(t);
    }
    pub fn set_sustain(&mut self, s: f32) {
        self.env.set_sustain(s);
    }
    pub fn set_release(&mut self, t: f32) {
        self.env.set_release(t);
    }

    pub fn active(&self) -> bool {
        self.env.active()
    }

    pub fn process(&mut self, out: &mut AudioBuf) -> bool {
        let mut active = false;
        for s in out.iter_mut().take(BLOCK) {
            let tone = self.osc.sample();
            let env_v = self.env.step();
            active |= self.env.active();
            *s = tone * env_v;
        }
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
    PortInfo::scaled("attack", cc_attack),
    PortInfo::scaled("decay", cc_decay),
    PortInfo::scaled("sustain", cc_sustain),
    PortInfo::scaled("release", cc_release),
];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static OSC_VOICE_TYPE: ModuleType = ModuleType {
    mname: "voice/osc",
    iname: "voice",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct OscVoiceModule {
    base: ModuleBase,
    voice: OscVoice,
}

impl OscVoiceModule {
    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, sample_rate: f64) -> ModuleHandle {
        module_new(parent, &OSC_VOICE_TYPE, name, id, |base| OscVoiceModule {
            base,
            voice: OscVoice::new(sample_rate),
        })
    }
}

impl Module for OscVoiceModule {
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
            4 => self.voice.set_attack(event.as_float()),
            5 => self.voice.set_decay(event.as_float()),
            6 => self.voice.set_sustain(event.as_float()),
            7 => self.voice.set_release(event.as_float()),
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
        let mut v = OscVoice::new(48_000.0);
        v.set_note(69.0);
        let mut out = [1.0f32; BLOCK];
        let active = v.process(&mut out);
        assert!(!active);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_gate_produces_bounded_tone() {
        let mut v = OscVoice::new(48_000.0);
        v.set_note(69.0);
        v.set_sustain(0.8);
        v.gate(1.0);
        let mut out = [0.0f32; BLOCK];
        for _ in 0..20 {
            v.process(&mut out);
        }
        assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.01));
    }

    #[test]
    fn test_retrigger_does_not_reset_oscillator_phase() {
        let mut v = OscVoice::new(48_000.0);
        v.set_note(69.0);
        v.set_sustain(1.0);
        v.gate(1.0);
        let mut out = [0.0f32; BLOCK];
        for _ in 0..500 {
            v.process(&mut out);
        }
        let phase_before = v.osc.sample();
        // retriggering the voice (gate off then on) must not rewind the
        // oscillator's own phase accumulator.
        v.gate(0.0);
        v.gate(1.0);
        let phase_after = v.osc.sample();
        assert_ne!(phase_before, 0.0);
        assert!(phase_after.is_finite());
    }
}
