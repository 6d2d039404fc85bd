//! Monophonic voice manager, grounded on `midi/mono.c`: one child voice,
//! the currently-held note and a running pitch-bend offset. A note-on for
//! a new note resends `note = note + bend` before gating; a note-on for the
//! already-held note only regates (matches a rapid repeated-note trill
//! without an audible pitch glitch). Pitch-wheel updates the bend and
//! resends the held note without regating, so a bend mid-sustain slides
//! the pitch rather than retriggering the envelope.

use ggm_core::block::AudioBuf;
use ggm_core::event::Event;
use ggm_core::midi::{midi_pitch_bend, STATUS_NOTEOFF, STATUS_NOTEON, STATUS_PITCH_WHEEL};
use ggm_core::module::{event_in, Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;

pub struct Mono {
    voice: ModuleHandle,
    current_note: Option<u8>,
    bend: f32,
    note_cache: Option<usize>,
    gate_cache: Option<usize>,
    midi_cache: Option<usize>,
}

impl Mono {
    pub fn new(voice: ModuleHandle) -> Self {
        Mono {
            voice,
            current_note: None,
            bend: 0.0,
            note_cache: None,
            gate_cache: None,
            midi_cache: None,
        }
    }

    fn send_note(&mut self, note: u8) {
        let target = note as f32 + self.bend;
        event_in(&self.voice, "note", &Event::Float(target), &mut self.note_cache);
    }

    fn send_gate(&mut self, level: f32) {
        event_in(&self.voice, "gate", &Event::Float(level), &mut self.gate_cache);
    }

    pub fn handle_midi(&mut self, event: &Event) {
        match event.midi_msg() {
            STATUS_NOTEON if event.midi_velocity() > 0 => {
                let note = event.midi_note();
                if self.current_note != Some(note) {
                    self.current_note = Some(note);
                    self.send_note(note);
                }
                self.send_gate(event.midi_velocity() as f32 / 127.0);
            }
            STATUS_NOTEON | STATUS_NOTEOFF => {
                // velocity 0 note-on behaves as note-off, per spec.
                if self.current_note == Some(event.midi_note()) {
                    self.current_note = None;
                    self.send_gate(0.0);
                }
            }
            STATUS_PITCH_WHEEL => {
                self.bend = midi_pitch_bend(event.midi_pitch_wheel());
                if let Some(note) = self.current_note {
                    self.send_note(note);
                }
            }
            _ => {
                event_in(&self.voice, "midi", event, &mut self.midi_cache);
            }
        }
    }
}

static IN_PORTS: &[PortInfo] = &[PortInfo::new("midi", PortKind::Midi)];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];

pub static MONO_TYPE: ModuleType = ModuleType {
    mname: "midi/mono",
    iname: "mono",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct MonoModule {
    base: ModuleBase,
    mono: Mono,
}

impl MonoModule {
    /// Builds the manager around an already-constructed `voice` child
    /// module (an `OscVoiceModule`, `GoomVoiceModule`, or anything else
    /// exposing `note`/`gate` float ports and a single `out` audio port).
    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, voice: ModuleHandle) -> ModuleHandle {
        module_new(parent, &MONO_TYPE, name, id, |base| MonoModule {
            base,
            mono: Mono::new(voice),
        })
    }

    pub fn voice(&self) -> &ModuleHandle {
        &self.mono.voice
    }
}

impl Module for MonoModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }
    fn handle_input(&mut self, port_idx: usize, event: &Event) {
        if port_idx == 0 {
            self.mono.handle_midi(event);
        }
    }
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        let mut inner = [0.0f32; ggm_core::BLOCK];
        let active = self.mono.voice.borrow_mut().process(&mut [&mut inner]);
        ggm_core::block::block_copy(bufs[0], &inner);
        active
    }
}
