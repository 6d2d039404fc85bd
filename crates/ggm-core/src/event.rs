//! Typed events and the inter-block event queue.
//!
//! Ported from `ggm/src/inc/event.h` (the `event` tagged union) and
//! `ggm/src/core/synth.c` (`synth_event_rd`/`synth_event_wr`, the
//! power-of-two masked circular buffer).

use crate::module::ModuleHandle;
use crate::NUM_EVENTS;

/// A typed control-plane message delivered to a port. Value-typed and
/// copied when queued; a port's kind is an invariant — a `Float`-kind port
/// only ever receives `Event::Float`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Float(f32),
    Int(i32),
    Bool(bool),
    Midi { status: u8, arg0: u8, arg1: u8 },
}

impl Event {
    pub fn as_float(&self) -> f32 {
        match self {
            Event::Float(v) => *v,
            _ => 0.0,
        }
    }

    pub fn as_int(&self) -> i32 {
        match self {
            Event::Int(v) => *v,
            _ => 0,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Event::Bool(v) => *v,
            _ => false,
        }
    }

    pub fn midi_channel(&self) -> u8 {
        match self {
            Event::Midi { status, .. } => status & 0x0f,
            _ => 0,
        }
    }

    pub fn midi_note(&self) -> u8 {
        match self {
            Event::Midi { arg0, .. } => *arg0,
            _ => 0,
        }
    }

    pub fn midi_velocity(&self) -> u8 {
        match self {
            Event::Midi { arg1, .. } => *arg1,
            _ => 0,
        }
    }

    pub fn midi_cc_num(&self) -> u8 {
        self.midi_note()
    }

    pub fn midi_cc_value(&self) -> u8 {
        self.midi_velocity()
    }

    /// Normalized `[0,1]` view of the second MIDI data byte (CC value or
    /// velocity).
    pub fn midi_cc_float(&self) -> f32 {
        (self.midi_velocity() & 0x7f) as f32 * (1.0 / 127.0)
    }

    /// The 14-bit pitch-wheel value packed from `arg0` (LSB) / `arg1` (MSB).
    pub fn midi_pitch_wheel(&self) -> u16 {
        match self {
            Event::Midi { arg0, arg1, .. } => ((*arg1 as u16) << 7) | (*arg0 as u16),
            _ => 0,
        }
    }

    /// The message nibble: for channel messages this is `status & 0xf0`;
    /// system-common/realtime status bytes (`>= 0xf0`) are returned as-is.
    pub fn midi_msg(&self) -> u8 {
        match self {
            Event::Midi { status, .. } => {
                if (*status & 0xf0) == 0xf0 {
                    *status
                } else {
                    status & 0xf0
                }
            }
            _ => 0,
        }
    }

    pub fn is_midi_cc(&self) -> bool {
        matches!(self, Event::Midi { status, .. } if (status & 0xf0) == crate::midi::STATUS_CONTROL_CHANGE)
    }

    pub fn is_midi_channel(&self, ch: u8) -> bool {
        matches!(self, Event::Midi { status, .. } if (status & 0x0f) == ch)
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Event {
        Event::Midi {
            status: crate::midi::STATUS_NOTEON | (channel & 0x0f),
            arg0: note & 0x7f,
            arg1: velocity & 0x7f,
        }
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Event {
        Event::Midi {
            status: crate::midi::STATUS_NOTEOFF | (channel & 0x0f),
            arg0: note & 0x7f,
            arg1: velocity & 0x7f,
        }
    }
}

/// A queued event: the module/port it was emitted from, plus the event
/// value. Stored so that post-block drain can call `event_out` on the
/// exact same (module, output-port) pair that `event_push` recorded.
pub struct QueuedEvent {
    pub source: ModuleHandle,
    pub port_idx: usize,
    pub event: Event,
}

/// Fixed-capacity single-producer single-consumer circular buffer of
/// queued events. Capacity is `NUM_EVENTS`, a power of two; a write when
/// full is reported to the caller rather than silently dropped or
/// overwriting the oldest entry.
pub struct EventQueue {
    // `NUM_EVENTS` slots; `None` once drained. `Vec` used only because a
    // `[Option<QueuedEvent>; NUM_EVENTS]` array requires `QueuedEvent:
    // Copy`, which it is not (it owns an `Rc`); capacity is fixed at
    // construction and never resized, preserving the "fixed-capacity ring"
    // invariant even though the backing store is heap-allocated once.
    slots: crate::compat::Vec<Option<QueuedEvent>>,
    rd: usize,
    wr: usize,
    mask: usize,
}

impl EventQueue {
    pub fn new() -> Self {
        debug_assert!(NUM_EVENTS.is_power_of_two());
        let mut slots = crate::compat::Vec::with_capacity(NUM_EVENTS);
        slots.resize_with(NUM_EVENTS, || None);
        EventQueue {
            slots,
            rd: 0,
            wr: 0,
            mask: NUM_EVENTS - 1,
        }
    }

    fn is_full(&self) -> bool {
        ((self.wr + 1) & self.mask) == (self.rd & self.mask)
    }

    pub fn is_empty(&self) -> bool {
        self.rd == self.wr
    }

    /// Attempts to enqueue an event. Returns `false` (and logs a warning)
    /// if the queue is full — the event is dropped, matching spec.md's
    /// "queue overflow" error category.
    pub fn push(&mut self, source: ModuleHandle, port_idx: usize, event: Event) -> bool {
        if self.is_full() {
            log::warn!("event queue overflow");
            return false;
        }
        let idx = self.wr & self.mask;
        self.slots[idx] = Some(QueuedEvent {
            source,
            port_idx,
            event,
        });
        self.wr = (self.wr + 1) & self.mask;
        true
    }

    /// Pops the oldest queued event, if any.
    pub fn pop(&mut self) -> Option<QueuedEvent> {
        if self.is_empty() {
            return None;
        }
        let idx = self.rd & self.mask;
        let ev = self.slots[idx].take();
        self.rd = (self.rd + 1) & self.mask;
        ev
    }

    pub fn capacity(&self) -> usize {
        NUM_EVENTS
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
