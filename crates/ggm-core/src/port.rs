//! Port descriptors and output-destination lists, ported from
//! `ggm/src/inc/port.h` and `ggm/src/core/port.c`.
//!
//! The original represents a module's port table as a `NULL`-terminated C
//! array; here a `&'static [PortInfo]` slice already carries its own
//! length, so no sentinel entry is needed — `port_count` and friends below
//! are plain slice operations instead of scan-to-sentinel loops.

use crate::event::Event;
use crate::module::ModuleHandle;

/// The four control-rate kinds plus `Audio`, the one block-rate kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Audio,
    Float,
    Int,
    Bool,
    Midi,
}

/// A function converting an inbound MIDI event into the event kind a port
/// actually expects, e.g. turning a Note On's velocity into a `Float` in
/// `[0,1]`. `None` means the port accepts `Event::Midi` as-is.
pub type MidiConvertFn = fn(&Event) -> Event;

/// Static port descriptor. One array of these per module type, per
/// direction (in/out); `&'static` because every module instance of the
/// same type shares the same table.
#[derive(Clone, Copy)]
pub struct PortInfo {
    pub name: &'static str,
    pub kind: PortKind,
    /// Only meaningful for `Midi`-kind *input* ports: how to convert an
    /// inbound MIDI CC/note event into the value the port consumer expects.
    pub midi_fn: Option<MidiConvertFn>,
    /// Only meaningful for `Float`-kind ports bound to a MIDI-CC map entry:
    /// how to rescale a normalized `[0,1]` CC value before it becomes this
    /// port's `Event::Float`, e.g. the ADSR's per-parameter time ranges in
    /// spec.md §4.5 (linear map to `[min_time, max_time]`). `None` means the
    /// generic `value/127` scaling the synth's MIDI-CC dispatch applies by
    /// default (spec.md scenario 3: a plain `[0,1]` port needs no override).
    pub cc_scale: Option<fn(f32) -> f32>,
}

impl PortInfo {
    pub const fn new(name: &'static str, kind: PortKind) -> Self {
        PortInfo {
            name,
            kind,
            midi_fn: None,
            cc_scale: None,
        }
    }

    pub const fn midi(name: &'static str, midi_fn: MidiConvertFn) -> Self {
        PortInfo {
            name,
            kind: PortKind::Midi,
            midi_fn: Some(midi_fn),
            cc_scale: None,
        }
    }

    /// A `Float`-kind port with a non-default MIDI-CC rescale function.
    pub const fn scaled(name: &'static str, cc_scale: fn(f32) -> f32) -> Self {
        PortInfo {
            name,
            kind: PortKind::Float,
            midi_fn: None,
            cc_scale: Some(cc_scale),
        }
    }
}

/// Returns the index of the port named `name` in `ports`, if any.
pub fn port_find(ports: &[PortInfo], name: &str) -> Option<usize> {
    ports.iter().position(|p| p.name == name)
}

/// Returns how many ports in `ports` are of kind `kind`.
pub fn port_count_of_kind(ports: &[PortInfo], kind: PortKind) -> usize {
    ports.iter().filter(|p| p.kind == kind).count()
}

/// Returns the index (within `ports`, not within same-kind ports) of the
/// `n`th port of kind `kind`, if it exists.
pub fn port_nth_of_kind(ports: &[PortInfo], kind: PortKind, n: usize) -> Option<usize> {
    ports
        .iter()
        .enumerate()
        .filter(|(_, p)| p.kind == kind)
        .nth(n)
        .map(|(i, _)| i)
}

/// One connection from an output port: either straight into a destination
/// module's input port, or forwarded out through one of the destination
/// module's *own* output ports (used by composite modules that expose an
/// inner module's output as if it were their own).
///
/// `Vec<OutputDst>` replaces the C singly-linked `struct port_dst *` list;
/// `NUM_PORT_FWD` (8) is preserved only as a debug-assertion on how many
/// entries a single output may accumulate, matching the original's static
/// bound — a real overflow here would indicate a patching bug, not a
/// runtime condition to recover from.
#[derive(Clone)]
pub enum OutputDst {
    Port {
        dest: ModuleHandle,
        port_idx: usize,
    },
    Forward {
        dest: ModuleHandle,
        out_idx: usize,
    },
}

impl OutputDst {
    pub fn dest(&self) -> &ModuleHandle {
        match self {
            OutputDst::Port { dest, .. } => dest,
            OutputDst::Forward { dest, .. } => dest,
        }
    }
}
