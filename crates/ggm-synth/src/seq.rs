//! Byte-code step sequencer, grounded on `seq.c`/`seq.h`: a tiny bytecode
//! interpreter driving timed MIDI note on/off events. `process` never
//! touches an audio buffer — it only advances a Bresenham-style tick
//! accumulator and queues events for [`Module::drain_events`] to hand to
//! whoever owns this module's handle. The owner (`patch::metro::MetroModule`)
//! forwards these onto the synth's deferred event queue rather than
//! dispatching them straight into the "midi" connection within the same
//! block — see spec.md §4.1/§4.3.
//!
//! Opcode and control values are not specified in numeric form anywhere
//! this was grounded on reaching this crate; the values below (`OP_NOP = 0`
//! .. `OP_REST = 3`, `CTRL_STOP = 0` .. `CTRL_RESET = 2`) are this crate's
//! own choice, recorded in the design notes rather than treated as received
//! fact.

use ggm_core::compat::Vec;
use ggm_core::event::Event;
use ggm_core::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_new;
use ggm_core::util::clampf;
use ggm_core::BLOCK;

pub const OP_NOP: u8 = 0;
pub const OP_LOOP: u8 = 1;
pub const OP_NOTE: u8 = 2;
pub const OP_REST: u8 = 3;

pub const CTRL_STOP: i32 = 0;
pub const CTRL_START: i32 = 1;
pub const CTRL_RESET: i32 = 2;

pub const TICKS_PER_BEAT: u32 = 16;
pub const MIN_BEATS_PER_MIN: f32 = 35.0;
pub const MAX_BEATS_PER_MIN: f32 = 350.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ActiveOp {
    Idle,
    Note { chan: u8, note: u8, vel: u8, remaining: u32 },
    Rest { remaining: u32 },
}

pub struct Seq {
    program: Vec<u8>,
    pc: usize,
    active: ActiveOp,
    running: bool,
    bpm: f32,
    sample_rate: f64,
    error: f64,
    pending: Vec<(usize, Event)>,
}

impl Seq {
    pub fn new(sample_rate: f64, program: Vec<u8>) -> Self {
        Seq {
            program,
            pc: 0,
            active: ActiveOp::Idle,
            running: false,
            bpm: 120.0,
            sample_rate,
            error: 0.0,
            pending: Vec::new(),
        }
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = clampf(bpm, MIN_BEATS_PER_MIN, MAX_BEATS_PER_MIN);
    }

    pub fn set_ctrl(&mut self, ctrl: i32) {
        match ctrl {
            CTRL_STOP => self.running = false,
            CTRL_START => self.running = true,
            CTRL_RESET => {
                self.running = false;
                self.pc = 0;
                self.active = ActiveOp::Idle;
                self.error = 0.0;
            }
            _ => {}
        }
    }

    fn secs_per_tick(&self) -> f64 {
        60.0 / (self.bpm as f64 * TICKS_PER_BEAT as f64)
    }

    fn secs_per_block(&self) -> f64 {
        BLOCK as f64 / self.sample_rate
    }

    /// Scans forward from `pc` until a `NOTE`/`REST` op begins counting
    /// down or the program runs out. Bounded to `program.len() + 1` steps
    /// so a pathological program with no `NOTE`/`REST` anywhere (just
    /// `LOOP`/`NOP`) can't spin here forever — it simply stops.
    fn start_next_op(&mut self) {
        let bound = self.program.len() + 1;
        for _ in 0..bound {
            if self.pc >= self.program.len() {
                self.running = false;
                return;
            }
            match self.program[self.pc] {
                OP_NOP => self.pc += 1,
                OP_LOOP => self.pc = 0,
                OP_NOTE => {
                    if self.pc + 5 > self.program.len() {
                        self.running = false;
                        return;
                    }
                    let chan = self.program[self.pc + 1];
                    let note = self.program[self.pc + 2];
                    let vel = self.program[self.pc + 3];
                    let dur = self.program[self.pc + 4] as u32;
                    self.pending.push((0, Event::note_on(chan, note, vel)));
                    if dur == 0 {
                        self.pending.push((0, Event::note_off(chan, note, vel)));
                        self.pc += 5;
                    } else {
                        self.active = ActiveOp::Note { chan, note, vel, remaining: dur };
                        return;
                    }
                }
                OP_REST => {
                    if self.pc + 2 > self.program.len() {
                        self.running = false;
                        return;
                    }
                    let dur = self.program[self.pc + 1] as u32;
                    if dur == 0 {
                        self.pc += 2;
                    } else {
                        self.active = ActiveOp::Rest { remaining: dur };
                        return;
                    }
                }
                _ => self.pc += 1,
            }
        }
        self.running = false;
    }

    fn tick(&mut self) {
        match self.active {
            ActiveOp::Idle => self.start_next_op(),
            ActiveOp::Note { chan, note, vel, remaining } => {
                let remaining = remaining - 1;
                if remaining == 0 {
                    self.pending.push((0, Event::note_off(chan, note, vel)));
                    self.pc += 5;
                    self.active = ActiveOp::Idle;
                } else {
                    self.active = ActiveOp::Note { chan, note, vel, remaining };
                }
            }
            ActiveOp::Rest { remaining } => {
                let remaining = remaining - 1;
                if remaining == 0 {
                    self.pc += 2;
                    self.active = ActiveOp::Idle;
                } else {
                    self.active = ActiveOp::Rest { remaining };
                }
            }
        }
    }

    /// Advances the tick accumulator by one block's worth of time. Returns
    /// whether the sequencer is still running afterward.
    pub fn advance_block(&mut self) -> bool {
        if self.running {
            self.error += self.secs_per_block();
            while self.error > self.secs_per_tick() {
                self.error -= self.secs_per_tick();
                self.tick();
                if !self.running {
                    break;
                }
            }
        }
        self.running
    }

    pub fn drain(&mut self) -> Vec<(usize, Event)> {
        core::mem::take(&mut self.pending)
    }
}

static IN_PORTS: &[PortInfo] = &[PortInfo::new("ctrl", PortKind::Int), PortInfo::new("bpm", PortKind::Float)];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("midi", PortKind::Midi)];

pub static SEQ_TYPE: ModuleType = ModuleType {
    mname: "seq",
    iname: "seq",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct SeqModule {
    base: ModuleBase,
    seq: Seq,
}

impl SeqModule {
    pub fn build(parent: Option<ModuleHandle>, name: Option<&str>, id: Option<u32>, sample_rate: f64, program: Vec<u8>) -> ModuleHandle {
        module_new(parent, &SEQ_TYPE, name, id, |base| SeqModule {
            base,
            seq: Seq::new(sample_rate, program),
        })
    }
}

impl Module for SeqModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }
    fn handle_input(&mut self, port_idx: usize, event: &Event) {
        match port_idx {
            0 => self.seq.set_ctrl(event.as_int()),
            1 => self.seq.set_bpm(event.as_float()),
            _ => {}
        }
    }
    fn process(&mut self, _bufs: &mut [&mut ggm_core::block::AudioBuf]) -> bool {
        self.seq.advance_block();
        false
    }
    fn drain_events(&mut self) -> Vec<(usize, Event)> {
        self.seq.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metro_program() -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&[OP_NOTE, 0, 69, 100, 4]);
        p.extend_from_slice(&[OP_REST, 12]);
        p.extend_from_slice(&[OP_NOTE, 0, 60, 100, 4]);
        p.extend_from_slice(&[OP_REST, 12]);
        p.extend_from_slice(&[OP_NOTE, 0, 60, 100, 4]);
        p.extend_from_slice(&[OP_REST, 12]);
        p.extend_from_slice(&[OP_NOTE, 0, 60, 100, 4]);
        p.extend_from_slice(&[OP_REST, 12]);
        p.push(OP_LOOP);
        p
    }

    #[test]
    fn test_rest_state_stopped_emits_nothing() {
        let mut s = Seq::new(48_000.0, metro_program());
        s.set_bpm(120.0);
        for _ in 0..100 {
            s.advance_block();
        }
        assert!(s.drain().is_empty());
    }

    #[test]
    fn test_started_metronome_emits_alternating_notes() {
        let mut s = Seq::new(48_000.0, metro_program());
        s.set_bpm(120.0);
        s.set_ctrl(CTRL_START);
        let mut all_events = Vec::new();
        // 4 seconds of 128-sample blocks at 48kHz.
        let blocks = (4.0 * 48_000.0 / BLOCK as f64) as usize;
        for _ in 0..blocks {
            s.advance_block();
            all_events.extend(s.drain());
        }
        let note_ons = all_events.iter().filter(|(_, e)| e.midi_msg() == ggm_core::midi::STATUS_NOTEON).count();
        let note_offs = all_events.iter().filter(|(_, e)| e.midi_msg() == ggm_core::midi::STATUS_NOTEOFF).count();
        assert_eq!(note_ons, note_offs);
        assert!(note_ons >= 4, "expected the loop to cycle at least once, got {note_ons} note-ons");
        let notes: Vec<u8> = all_events
            .iter()
            .filter(|(_, e)| e.midi_msg() == ggm_core::midi::STATUS_NOTEON)
            .map(|(_, e)| e.midi_note())
            .collect();
        assert!(notes.contains(&69));
        assert!(notes.contains(&60));
    }

    #[test]
    fn test_reset_rewinds_program_counter() {
        let mut s = Seq::new(48_000.0, metro_program());
        s.set_bpm(120.0);
        s.set_ctrl(CTRL_START);
        for _ in 0..50 {
            s.advance_block();
            s.drain();
        }
        assert_ne!(s.pc, 0);
        s.set_ctrl(CTRL_RESET);
        assert_eq!(s.pc, 0);
        assert!(!s.running);
    }

    #[test]
    fn test_bpm_is_clamped_to_valid_range() {
        let mut s = Seq::new(48_000.0, metro_program());
        s.set_bpm(1000.0);
        assert_eq!(s.bpm, MAX_BEATS_PER_MIN);
        s.set_bpm(1.0);
        assert_eq!(s.bpm, MIN_BEATS_PER_MIN);
    }

    #[test]
    fn test_loop_free_program_stops_after_running_out() {
        let program = vec![OP_NOTE, 0, 60, 100, 1, OP_REST, 1];
        let mut s = Seq::new(48_000.0, program);
        s.set_bpm(120.0);
        s.set_ctrl(CTRL_START);
        for _ in 0..1000 {
            s.advance_block();
        }
        assert!(!s.running);
    }
}
