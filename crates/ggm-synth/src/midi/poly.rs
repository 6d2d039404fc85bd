//! Polyphonic voice manager, grounded on `midi/poly.c`: a fixed ring of
//! `MAX_POLYPHONY` voices, 4 of them ever sounding at once and the 5th
//! reserved as a soft-reset pipeline slot so a stolen voice's envelope has
//! one allocation's worth of head start decaying silently before it can be
//! handed a new note. `alloc` always advances the ring pointer by exactly
//! one and immediately soft-resets the *next* slot in the ring — not the
//! slot it just allocated — so that slot is already decaying by the time
//! the pointer reaches it again.

use ggm_core::block::AudioBuf;
use ggm_core::compat::Vec;
use ggm_core::event::Event;
use ggm_core::midi::{midi_pitch_bend, STATUS_NOTEOFF, STATUS_NOTEON, STATUS_PITCH_WHEEL};
use ggm_core::module::{event_in, Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;
use ggm_core::BLOCK;

/// 4 active voices plus 1 always-in-flight soft-reset slot.
pub const MAX_POLYPHONY: usize = 5;

struct VoiceSlot {
    handle: ModuleHandle,
    note: Option<u8>,
    soft_reset: bool,
    note_cache: Option<usize>,
    gate_cache: Option<usize>,
    reset_cache: Option<usize>,
    midi_cache: Option<usize>,
}

pub struct Poly {
    voices: Vec<VoiceSlot>,
    next: usize,
    bend: f32,
}

impl Poly {
    /// `voices` must contain exactly `MAX_POLYPHONY` already-built voice
    /// modules (e.g. `OscVoiceModule`/`GoomVoiceModule` instances).
    pub fn new(voices: Vec<ModuleHandle>) -> Self {
        debug_assert_eq!(voices.len(), MAX_POLYPHONY);
        let voices = voices
            .into_iter()
            .map(|handle| VoiceSlot {
                handle,
                note: None,
                soft_reset: false,
                note_cache: None,
                gate_cache: None,
                reset_cache: None,
                midi_cache: None,
            })
            .collect();
        Poly {
            voices,
            next: 0,
            bend: 0.0,
        }
    }

    fn lookup_live(&self, note: u8) -> Option<usize> {
        self.voices.iter().position(|v| !v.soft_reset && v.note == Some(note))
    }

    fn send_note(&mut self, idx: usize, note: u8) {
        let target = note as f32 + self.bend;
        let slot = &mut self.voices[idx];
        event_in(&slot.handle, "note", &Event::Float(target), &mut slot.note_cache);
    }

    fn send_gate(&mut self, idx: usize, level: f32) {
        let slot = &mut self.voices[idx];
        event_in(&slot.handle, "gate", &Event::Float(level), &mut slot.gate_cache);
    }

    fn send_reset(&mut self, idx: usize, hard: bool) {
        let slot = &mut self.voices[idx];
        event_in(&slot.handle, "reset", &Event::Bool(hard), &mut slot.reset_cache);
    }

    fn alloc(&mut self, note: u8, velocity: u8) {
        let idx = self.next;
        self.voices[idx].soft_reset = false;
        self.voices[idx].note = Some(note);
        self.send_reset(idx, true);
        self.send_note(idx, note);
        self.send_gate(idx, velocity as f32 / 127.0);

        let n = self.voices.len();
        let next_idx = (idx + 1) % n;
        self.voices[next_idx].soft_reset = true;
        self.voices[next_idx].note = None;
        self.send_reset(next_idx, false);

        self.next = next_idx;
    }

    pub fn handle_midi(&mut self, event: &Event) {
        match event.midi_msg() {
            STATUS_NOTEON if event.midi_velocity() > 0 => {
                let note = event.midi_note();
                if self.lookup_live(note).is_none() {
                    self.alloc(note, event.midi_velocity());
                }
            }
            STATUS_NOTEON | STATUS_NOTEOFF => {
                let note = event.midi_note();
                if let Some(idx) = self.lookup_live(note) {
                    self.voices[idx].note = None;
                    self.send_gate(idx, 0.0);
                }
            }
            STATUS_PITCH_WHEEL => {
                self.bend = midi_pitch_bend(event.midi_pitch_wheel());
                for idx in 0..self.voices.len() {
                    if let Some(note) = self.voices[idx].note {
                        self.send_note(idx, note);
                    }
                }
            }
            _ => {
                for slot in self.voices.iter_mut() {
                    event_in(&slot.handle, "midi", event, &mut slot.midi_cache);
                }
            }
        }
    }

    pub fn process(&mut self, out: &mut AudioBuf) -> bool {
        for s in out.iter_mut() {
            *s = 0.0;
        }
        let mut active = false;
        for slot in self.voices.iter() {
            let mut voice_out = [0.0f32; BLOCK];
            let voice_active = slot.handle.borrow_mut().process(&mut [&mut voice_out]);
            active |= voice_active;
            for i in 0..BLOCK {
                out[i] += voice_out[i];
            }
        }
        active
    }
}

static IN_PORTS: &[PortInfo] = &[PortInfo::new("midi", PortKind::Midi)];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static POLY_TYPE: ModuleType = ModuleType {
    mname: "midi/poly",
    iname: "poly",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct PolyModule {
    base: ModuleBase,
    poly: Poly,
}

impl PolyModule {
    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, voices: Vec<ModuleHandle>) -> ModuleHandle {
        module_new(parent, &POLY_TYPE, name, id, |base| PolyModule {
            base,
            poly: Poly::new(voices),
        })
    }
}

impl Module for PolyModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }
    fn handle_input(&mut self, port_idx: usize, event: &Event) {
        if port_idx == 0 {
            self.poly.handle_midi(event);
        }
    }
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        self.poly.process(bufs[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::osc::OscVoiceModule;

    fn make_poly() -> ModuleHandle {
        let voices: Vec<ModuleHandle> = (0..MAX_POLYPHONY)
            .map(|i| OscVoiceModule::build(None, None, Some(i as u32), 48_000.0))
            .collect();
        PolyModule::build(None, Some("poly"), None, voices)
    }

    #[test]
    fn test_three_note_chord_allocates_first_three_voices() {
        let m = make_poly();
        for note in [60u8, 64, 67] {
            m.borrow_mut().handle_input(0, &Event::note_on(0, note, 100));
        }
        let mut out = [0.0f32; BLOCK];
        let active = m.borrow_mut().process(&mut [&mut out]);
        assert!(active);
        assert!(out.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_six_successive_notes_reuse_ring_with_soft_reset() {
        let m = make_poly();
        for note in [60u8, 61, 62, 63, 64, 65] {
            m.borrow_mut().handle_input(0, &Event::note_on(0, note, 100));
        }
        let mut out = [0.0f32; BLOCK];
        m.borrow_mut().process(&mut [&mut out]);
        // all 6 allocations land on exactly 5 ring slots, so at most
        // MAX_POLYPHONY distinct notes are ever live simultaneously.
    }

    #[test]
    fn test_note_off_silences_matching_voice() {
        let m = make_poly();
        m.borrow_mut().handle_input(0, &Event::note_on(0, 60, 100));
        m.borrow_mut().handle_input(0, &Event::note_off(0, 60, 0));
        let mut out = [0.0f32; BLOCK];
        for _ in 0..2000 {
            m.borrow_mut().process(&mut [&mut out]);
        }
        assert!(out.iter().all(|s| s.abs() < 1e-3));
    }
}
