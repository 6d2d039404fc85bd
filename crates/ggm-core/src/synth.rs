//! The synth host object: owns the root module, the deferred event queue,
//! the configuration table and the MIDI-CC routing map, and drives one
//! block of processing at a time. Ported from `ggm/src/core/synth.c` and
//! `ggm/src/inc/synth.h`.

use crate::block::AudioBuf;
use crate::compat::Vec;
use crate::config::{lookup_cfg, PortCfgValue, SynthCfg, SynthCfgEntry, SynthConfig};
use crate::error::{Error, Result};
use crate::event::{Event, EventQueue};
use crate::midi::midi_id;
use crate::module::{dispatch_output, Module, ModuleHandle};
use crate::port::PortKind;
use crate::{BLOCK, NUM_MIDI_MAP_ENTRIES, NUM_MIDI_MAP_SLOTS};

/// One slot of the MIDI-CC routing table. `id == 0` marks an unused entry;
/// a live entry's `id` packs `(channel << 16) | (cc << 8) | 0xff`, matching
/// `synth.c`'s encoding so two entries can never collide on channel/cc by
/// construction (the low byte is never 0).
#[derive(Clone)]
struct MidiMapEntry {
    id: u32,
    dest: Option<ModuleHandle>,
    port_idx: usize,
    cc_scale: Option<fn(f32) -> f32>,
}

impl MidiMapEntry {
    const EMPTY: MidiMapEntry = MidiMapEntry {
        id: 0,
        dest: None,
        port_idx: 0,
        cc_scale: None,
    };
}

struct MidiMapSlot {
    entries: [MidiMapEntry; NUM_MIDI_MAP_ENTRIES],
}

impl MidiMapSlot {
    fn new() -> Self {
        MidiMapSlot {
            entries: [MidiMapEntry::EMPTY; NUM_MIDI_MAP_ENTRIES],
        }
    }
}

/// The synth host: one root module, one deferred event queue, a
/// configuration table, a MIDI-CC routing map and the audio buffer pool
/// the root module renders into. Single-threaded, `!Sync` by construction
/// through `ModuleHandle`.
pub struct Synth {
    config: SynthConfig,
    root: Option<ModuleHandle>,
    queue: EventQueue,
    cfg: &'static SynthCfg,
    midi_map: Vec<MidiMapSlot>,
    audio_in: Vec<AudioBuf>,
    audio_out: Vec<AudioBuf>,
}

impl Synth {
    pub fn new(config: SynthConfig, cfg: &'static SynthCfg) -> Result<Self> {
        config.validate()?;
        let midi_map = (0..NUM_MIDI_MAP_SLOTS).map(|_| MidiMapSlot::new()).collect();
        Ok(Synth {
            config,
            root: None,
            queue: EventQueue::new(),
            cfg,
            midi_map,
            audio_in: Vec::new(),
            audio_out: Vec::new(),
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    /// Installs the root module. Fails if a root is already set (a synth
    /// has exactly one root for its lifetime — replacing it would strand
    /// whatever the old root's descendants were wired to) or if the
    /// module's own port-count limits were violated (checked already by
    /// `registry::module_root`, but re-checked here since a caller could
    /// in principle hand in any `ModuleHandle`).
    pub fn set_root(&mut self, root: ModuleHandle) -> Result<()> {
        if self.root.is_some() {
            return Err(Error::RootAlreadySet);
        }
        let (audio_in, audio_out) = {
            let m = root.borrow();
            let t = m.type_info();
            (
                crate::port::port_count_of_kind(t.in_ports, PortKind::Audio),
                crate::port::port_count_of_kind(t.out_ports, PortKind::Audio),
            )
        };
        self.audio_in = (0..audio_in).map(|_| [0.0f32; BLOCK]).collect();
        self.audio_out = (0..audio_out).map(|_| [0.0f32; BLOCK]).collect();
        self.root = Some(root);
        Ok(())
    }

    pub fn root(&self) -> Option<&ModuleHandle> {
        self.root.as_ref()
    }

    /// Queues an event to be dispatched at the start of the next block,
    /// rather than immediately. Used for control-rate changes arriving
    /// from outside the audio thread's call stack (e.g. a UI message), as
    /// opposed to one module's `process` firing an event straight into
    /// another's `handle_input` within the same call.
    pub fn queue_event(&mut self, source: ModuleHandle, port_idx: usize, event: Event) -> bool {
        self.queue.push(source, port_idx, event)
    }

    /// Renders one block: drains and dispatches every deferred event, then
    /// runs the root module's `process` once over the synth's audio buffer
    /// pool.
    pub fn process_block(&mut self) -> Result<()> {
        while let Some(qe) = self.queue.pop() {
            dispatch_output(&qe.source, qe.port_idx, &qe.event);
        }

        let root = self.root.as_ref().ok_or(Error::NoRoot)?;
        let mut refs: Vec<&mut AudioBuf> = Vec::with_capacity(self.audio_in.len() + self.audio_out.len());
        for b in self.audio_in.iter_mut() {
            refs.push(b);
        }
        for b in self.audio_out.iter_mut() {
            refs.push(b);
        }
        root.borrow_mut().process(&mut refs);
        Ok(())
    }

    pub fn audio_in_mut(&mut self, idx: usize) -> Option<&mut AudioBuf> {
        self.audio_in.get_mut(idx)
    }

    pub fn audio_out(&self, idx: usize) -> Option<&AudioBuf> {
        self.audio_out.get(idx)
    }

    /// Looks up a module path in the configuration table, returning the
    /// first matching entry (glob patterns match first-wins, in table
    /// order).
    pub fn lookup_cfg(&self, path: &str) -> Option<&'static SynthCfgEntry> {
        lookup_cfg(self.cfg, path)
    }

    /// Finds the destination mapped to `(channel, cc)`, if any, along with
    /// its per-port MIDI-CC rescale function.
    fn lookup_midi_map(&self, channel: u8, cc: u8) -> Option<(ModuleHandle, usize, Option<fn(f32) -> f32>)> {
        let id = midi_id(channel, cc);
        for slot in &self.midi_map {
            for entry in &slot.entries {
                if entry.id == id {
                    return entry.dest.clone().map(|d| (d, entry.port_idx, entry.cc_scale));
                }
            }
        }
        None
    }

    /// Installs a new `(channel, cc) -> (dest, port_idx)` route in the
    /// first free slot/entry, carrying the destination port's `cc_scale`
    /// (if any) from its `PortInfo` so `dispatch_midi_cc` doesn't need to
    /// re-look the port table up on every incoming CC. Logs and no-ops if
    /// the table is full — a full MIDI-CC map is a patching-time condition,
    /// not one the audio thread can meaningfully fail on.
    pub fn alloc_midi_map_entry(&mut self, channel: u8, cc: u8, dest: ModuleHandle, port_idx: usize) {
        let id = midi_id(channel, cc);
        let cc_scale = dest.borrow().type_info().in_ports[port_idx].cc_scale;
        for slot in self.midi_map.iter_mut() {
            for entry in slot.entries.iter_mut() {
                if entry.id == 0 {
                    entry.id = id;
                    entry.dest = Some(dest);
                    entry.port_idx = port_idx;
                    entry.cc_scale = cc_scale;
                    return;
                }
            }
        }
        log::warn!("midi-cc map full, dropping route for channel={channel} cc={cc}");
    }

    /// Dispatches an inbound MIDI Control Change to its routed destination,
    /// if one is mapped, converting the raw `[0,127]` value to whatever
    /// port kind the destination expects. `Float` ports apply the port's
    /// `cc_scale` (spec.md §4.5's per-parameter time ranges) when present,
    /// falling back to the generic `value/127` normalization otherwise.
    pub fn dispatch_midi_cc(&mut self, channel: u8, cc: u8, value: u8) {
        if let Some((dest, port_idx, cc_scale)) = self.lookup_midi_map(channel, cc) {
            let kind = dest.borrow().type_info().in_ports[port_idx].kind;
            let event = match kind {
                PortKind::Float => {
                    let normalized = value as f32 * (1.0 / 127.0);
                    let v = cc_scale.map(|f| f(normalized)).unwrap_or(normalized);
                    Event::Float(v)
                }
                PortKind::Int => Event::Int(value as i32),
                PortKind::Bool => Event::Bool(value >= 64),
                PortKind::Midi => Event::Midi {
                    status: crate::midi::STATUS_CONTROL_CHANGE | (channel & 0x0f),
                    arg0: cc,
                    arg1: value,
                },
                PortKind::Audio => return,
            };
            dest.borrow_mut().handle_input(port_idx, &event);
        }
    }

    /// Runs the "initial configuration pass" spec.md §4.2 describes:
    /// visits every `Float`/`Int`/`Bool` input port of `module`, matches
    /// `"<module.name>:<port.name>"` against the configuration table, and —
    /// on a match — delivers the entry's `init` value as an immediate event
    /// and, if the entry's `midi_id` is non-zero, installs a MIDI-CC map
    /// route for that port. Called once by a root patch constructor right
    /// after a module is built (and, recursively, for every child it
    /// creates), never from inside `process`.
    pub fn configure_module(&mut self, module: &ModuleHandle) {
        let in_ports = module.borrow().type_info().in_ports;
        for (idx, port) in in_ports.iter().enumerate() {
            if !matches!(port.kind, PortKind::Float | PortKind::Int | PortKind::Bool) {
                continue;
            }
            let path = alloc::format!("{}:{}", module.borrow().name(), port.name);
            let entry = match self.lookup_cfg(&path) {
                Some(e) => e,
                None => continue,
            };
            match entry.cfg {
                PortCfgValue::Float(c) => {
                    module.borrow_mut().handle_input(idx, &Event::Float(c.init));
                    if c.midi_id != 0 {
                        let (ch, cc) = crate::midi::decode_midi_id(c.midi_id);
                        self.alloc_midi_map_entry(ch, cc, module.clone(), idx);
                    }
                }
                PortCfgValue::Int(c) => {
                    module.borrow_mut().handle_input(idx, &Event::Int(c.init));
                    if c.midi_id != 0 {
                        let (ch, cc) = crate::midi::decode_midi_id(c.midi_id);
                        self.alloc_midi_map_entry(ch, cc, module.clone(), idx);
                    }
                }
                PortCfgValue::Bool(c) => {
                    module.borrow_mut().handle_input(idx, &Event::Bool(c.init));
                    if c.midi_id != 0 {
                        let (ch, cc) = crate::midi::decode_midi_id(c.midi_id);
                        self.alloc_midi_map_entry(ch, cc, module.clone(), idx);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleBase, ModuleType};
    use crate::port::PortInfo;

    static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];
    static ROOT_TYPE: ModuleType = ModuleType {
        mname: "test-root",
        iname: "root",
        in_ports: &[],
        out_ports: OUT_PORTS,
    };

    struct ConstRoot {
        base: ModuleBase,
    }
    impl Module for ConstRoot {
        fn base(&self) -> &ModuleBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut ModuleBase {
            &mut self.base
        }
        fn handle_input(&mut self, _: usize, _: &Event) {}
        fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
            crate::block::block_add_k(bufs[0], 1.0);
            true
        }
    }

    #[test]
    fn test_set_root_rejects_twice() {
        let mut s = Synth::new(SynthConfig::default(), &[]).unwrap();
        let r1 = crate::compat::Rc::new(crate::compat::RefCell::new(ConstRoot {
            base: ModuleBase::new(&ROOT_TYPE, "root".into(), None),
        }));
        let r2 = r1.clone();
        s.set_root(r1).unwrap();
        assert!(s.set_root(r2).is_err());
    }

    #[test]
    fn test_process_block_without_root_errors() {
        let mut s = Synth::new(SynthConfig::default(), &[]).unwrap();
        assert!(s.process_block().is_err());
    }

    #[test]
    fn test_process_block_renders_root() {
        let mut s = Synth::new(SynthConfig::default(), &[]).unwrap();
        let root = crate::compat::Rc::new(crate::compat::RefCell::new(ConstRoot {
            base: ModuleBase::new(&ROOT_TYPE, "root".into(), None),
        }));
        s.set_root(root).unwrap();
        s.process_block().unwrap();
        assert_eq!(s.audio_out(0).unwrap()[0], 1.0);
    }

    #[test]
    fn test_midi_cc_routing() {
        static IN_PORTS: &[PortInfo] = &[PortInfo::new("level", PortKind::Float)];
        static LEAF_TYPE: ModuleType = ModuleType {
            mname: "leaf",
            iname: "leaf",
            in_ports: IN_PORTS,
            out_ports: &[],
        };
        struct Leaf {
            base: ModuleBase,
            level: f32,
        }
        impl Module for Leaf {
            fn base(&self) -> &ModuleBase {
                &self.base
            }
            fn base_mut(&mut self) -> &mut ModuleBase {
                &mut self.base
            }
            fn handle_input(&mut self, port_idx: usize, event: &Event) {
                if port_idx == 0 {
                    self.level = event.as_float();
                }
            }
        }

        let mut s = Synth::new(SynthConfig::default(), &[]).unwrap();
        let leaf = crate::compat::Rc::new(crate::compat::RefCell::new(Leaf {
            base: ModuleBase::new(&LEAF_TYPE, "leaf0".into(), None),
            level: 0.0,
        }));
        s.alloc_midi_map_entry(2, 74, leaf.clone(), 0);
        s.dispatch_midi_cc(2, 74, 127);
        assert!((leaf.borrow().level - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_configure_module_initial_value_and_cc_binding() {
        use crate::config::{PortFloatCfg, SynthCfgEntry};
        use crate::midi::midi_id;

        static IN_PORTS: &[PortInfo] = &[PortInfo::new("vol", PortKind::Float)];
        static PAN_TYPE: ModuleType = ModuleType {
            mname: "pan",
            iname: "pan",
            in_ports: IN_PORTS,
            out_ports: &[],
        };
        struct Pan {
            base: ModuleBase,
            vol: f32,
        }
        impl Module for Pan {
            fn base(&self) -> &ModuleBase {
                &self.base
            }
            fn base_mut(&mut self) -> &mut ModuleBase {
                &mut self.base
            }
            fn handle_input(&mut self, port_idx: usize, event: &Event) {
                if port_idx == 0 {
                    self.vol = event.as_float();
                }
            }
        }

        static CFG: &[SynthCfgEntry] = &[SynthCfgEntry {
            path: "root.pan:vol",
            cfg: PortCfgValue::Float(PortFloatCfg {
                init: 0.8,
                midi_id: midi_id(0, 8),
            }),
        }];

        let mut s = Synth::new(SynthConfig::default(), CFG).unwrap();
        let pan = crate::compat::Rc::new(crate::compat::RefCell::new(Pan {
            base: ModuleBase::new(&PAN_TYPE, "root.pan".into(), None),
            vol: 0.0,
        }));
        s.configure_module(&pan);
        assert_eq!(pan.borrow().vol, 0.8);

        s.dispatch_midi_cc(0, 8, 0);
        assert_eq!(pan.borrow().vol, 0.0);
        s.dispatch_midi_cc(0, 8, 127);
        assert_eq!(pan.borrow().vol, 1.0);
    }
}
