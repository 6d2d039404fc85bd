//! The module trait and its shared base state, ported from
//! `ggm/src/inc/module.h` and `ggm/src/core/module.c`.
//!
//! The C module is a `struct module` embedding a `void *state` plus a
//! function-pointer vtable (`struct module_type`). Rust already has a
//! vtable-bearing pointer for this shape — a trait object — so the split
//! becomes: `ModuleBase` holds the fields every module needs regardless of
//! kind (name, parent, output destination lists), and `dyn Module` replaces
//! the vtable. Shared ownership (a module may be any number of other
//! modules' output destination, and the synth holds the root) replaces the
//! C side's manual reference-free "owner deletes children" discipline with
//! `Rc<RefCell<_>>`.

use crate::block::AudioBuf;
use crate::compat::{Rc, RefCell, String, Vec, Weak};
use crate::event::Event;
use crate::port::{port_find, OutputDst, PortInfo, PortKind};
use crate::synth::Synth;

/// Shared handle to a module instance. `!Send + !Sync` by construction
/// (`Rc`/`RefCell` are neither) — the engine is single-threaded by design,
/// per the concurrency model.
pub type ModuleHandle = Rc<RefCell<dyn Module>>;

/// Compile-time descriptor for a module type: its name, the prefix used to
/// construct default instance names, and its port tables. One `static
/// ModuleType` per module kind, analogous to the C `struct module_type`
/// minus the function pointers (construction is generic, see
/// `registry::module_new`; dispatch is simply a trait method call).
pub struct ModuleType {
    /// Name used for registry lookup and path construction, e.g. `"adsr"`.
    pub mname: &'static str,
    /// Prefix used when a caller asks for an anonymous instance name, e.g.
    /// `"adsr"` producing `"adsr7"` for id 7.
    pub iname: &'static str,
    pub in_ports: &'static [PortInfo],
    pub out_ports: &'static [PortInfo],
}

/// Fields common to every module instance.
pub struct ModuleBase {
    pub type_info: &'static ModuleType,
    /// `Some(n)` for an id-suffixed instance name (`"adsr7"`), `None` for
    /// an explicitly-named one (`"env"`) — see `registry::build_name`.
    pub id: Option<u32>,
    pub name: String,
    pub parent: Option<ModuleHandle>,
    /// Pointer to the owning synth (`m->top` in `module.c`), `Weak` because
    /// the synth owns the root module by a strong `Rc` — a strong
    /// back-reference here would make every instance in the tree a
    /// reference cycle. Populated at construction time by
    /// `registry::module_new`/`module_root`; a module built with no parent
    /// and no synth of its own (the common case for a patch builder's
    /// not-yet-parented children) starts with `None` here and may have it
    /// back-filled once its owner has a synth to give it.
    pub synth: Option<Weak<RefCell<Synth>>>,
    /// One `Vec<OutputDst>` per output port, indexed the same as
    /// `type_info.out_ports`.
    pub dst: Vec<Vec<OutputDst>>,
}

impl ModuleBase {
    pub fn new(type_info: &'static ModuleType, name: String, parent: Option<ModuleHandle>) -> Self {
        let dst = (0..type_info.out_ports.len()).map(|_| Vec::new()).collect();
        ModuleBase {
            type_info,
            id: None,
            name,
            parent,
            synth: None,
            dst,
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_synth(mut self, synth: Option<Weak<RefCell<Synth>>>) -> Self {
        self.synth = synth;
        self
    }
}

/// The behavior every module in the graph implements. Default methods
/// forward to `base()`/`base_mut()` so concrete modules only have to store
/// a `ModuleBase` field and implement the two methods that carry their
/// actual behavior.
pub trait Module {
    fn base(&self) -> &ModuleBase;
    fn base_mut(&mut self) -> &mut ModuleBase;

    /// Handles an inbound event on input port `port_idx`. Called both for
    /// immediate input (direct connections processed the instant an
    /// upstream output fires) and for events drained from the synth's
    /// deferred queue.
    fn handle_input(&mut self, port_idx: usize, event: &Event);

    /// Renders one block into `bufs` (audio input buffers followed by
    /// audio output buffers, in port-table order) and returns whether any
    /// output buffer was modified. Pure event modules (the sequencer, MIDI
    /// routing shims) never override this — the default renders nothing.
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        let _ = bufs;
        false
    }

    /// Returns (and clears) any events queued on this module's own output
    /// ports during the last `process` call — `event_push_name` in the
    /// original, used by the sequencer to emit timed MIDI note on/off
    /// events. A module has no self-referential handle to dispatch through
    /// on its own, so whoever holds this module's `ModuleHandle` drains
    /// these after calling `process` and hands them to the owning synth's
    /// deferred queue (`Synth::queue_event`) rather than dispatching them
    /// straight into sibling modules within the same block — see spec.md
    /// §4.1/§4.3 on event-visibility ordering. The default is empty: only
    /// the sequencer overrides this.
    fn drain_events(&mut self) -> crate::compat::Vec<(usize, Event)> {
        crate::compat::Vec::new()
    }

    fn type_info(&self) -> &'static ModuleType {
        self.base().type_info
    }

    fn name(&self) -> String {
        self.base().name.clone()
    }

    fn parent(&self) -> Option<ModuleHandle> {
        self.base().parent.clone()
    }
}

/// Fires an immediate event to every destination of output port
/// `out_idx` on `module`, recursing through `Forward` destinations.
/// Snapshots the destination list's length at entry so a handler that
/// patches new connections mid-dispatch cannot cause this call to visit
/// them (matching `port.c`'s single-pass iteration).
pub fn dispatch_output(module: &ModuleHandle, out_idx: usize, event: &Event) {
    let dsts: Vec<OutputDst> = {
        let m = module.borrow();
        match m.base().dst.get(out_idx) {
            Some(v) => v.clone(),
            None => return,
        }
    };
    for dst in dsts.iter() {
        match dst {
            OutputDst::Port { dest, port_idx } => {
                dest.borrow_mut().handle_input(*port_idx, event);
            }
            OutputDst::Forward { dest, out_idx } => {
                dispatch_output(dest, *out_idx, event);
            }
        }
    }
}

/// Connects `src`'s output port `src_port` to `dest`'s input port
/// `dest_port`, ported from `port_connect` in `ggm/src/core/port.c`. A
/// patch-time error (unknown port name, kind mismatch, or either port
/// being `Audio`-kind) is logged and the connection is simply not made —
/// spec.md §7 classifies this as a "patch error", never a panic or
/// propagated exception.
pub fn connect(src: &ModuleHandle, src_port: &str, dest: &ModuleHandle, dest_port: &str) -> bool {
    let src_idx = match port_find(src.borrow().type_info().out_ports, src_port) {
        Some(i) => i,
        None => {
            log::warn!("connect: no output port '{src_port}' on {}", src.borrow().name());
            return false;
        }
    };
    let dest_idx = match port_find(dest.borrow().type_info().in_ports, dest_port) {
        Some(i) => i,
        None => {
            log::warn!("connect: no input port '{dest_port}' on {}", dest.borrow().name());
            return false;
        }
    };
    let src_kind = src.borrow().type_info().out_ports[src_idx].kind;
    let dest_kind = dest.borrow().type_info().in_ports[dest_idx].kind;
    if src_kind == PortKind::Audio || dest_kind == PortKind::Audio {
        log::warn!("connect: audio ports never wire through event dispatch");
        return false;
    }
    if src_kind != dest_kind {
        log::warn!("connect: kind mismatch ({src_port}:{src_kind:?} -> {dest_port}:{dest_kind:?})");
        return false;
    }
    src.borrow_mut().base_mut().dst[src_idx].push(OutputDst::Port {
        dest: dest.clone(),
        port_idx: dest_idx,
    });
    true
}

/// Forwards `src`'s output port `src_port` to `dest`'s *output* port
/// `dest_out_port`, ported from `port_forward` in `port.c`. Same kind/audio
/// contract as [`connect`], plus the destination output-port index must be
/// below `NUM_PORT_FWD` — the fixed-size forward-thunk family the original
/// implements as 8 free functions and this crate implements as a single
/// `OutputDst::Forward` variant carrying the index.
pub fn forward(src: &ModuleHandle, src_port: &str, dest: &ModuleHandle, dest_out_port: &str) -> bool {
    let src_idx = match port_find(src.borrow().type_info().out_ports, src_port) {
        Some(i) => i,
        None => {
            log::warn!("forward: no output port '{src_port}' on {}", src.borrow().name());
            return false;
        }
    };
    let dest_idx = match port_find(dest.borrow().type_info().out_ports, dest_out_port) {
        Some(i) => i,
        None => {
            log::warn!("forward: no output port '{dest_out_port}' on {}", dest.borrow().name());
            return false;
        }
    };
    if dest_idx >= crate::NUM_PORT_FWD {
        log::warn!("forward: destination output index {dest_idx} exceeds forwarder limit {}", crate::NUM_PORT_FWD);
        return false;
    }
    let src_kind = src.borrow().type_info().out_ports[src_idx].kind;
    let dest_kind = dest.borrow().type_info().out_ports[dest_idx].kind;
    if src_kind == PortKind::Audio || dest_kind == PortKind::Audio {
        log::warn!("forward: audio ports never wire through event dispatch");
        return false;
    }
    if src_kind != dest_kind {
        log::warn!("forward: kind mismatch ({src_port}:{src_kind:?} -> {dest_out_port}:{dest_kind:?})");
        return false;
    }
    src.borrow_mut().base_mut().dst[src_idx].push(OutputDst::Forward {
        dest: dest.clone(),
        out_idx: dest_idx,
    });
    true
}

/// Delivers `event` to `dest`'s input port `port_name` immediately
/// (`event_in` in `port.c`). `cache` is an optional caller-owned slot: a
/// `None` is filled with the resolved port index on first use so repeated
/// calls from the same call site (e.g. a per-instance cached handler) skip
/// the name scan entirely, matching the caching policy in spec.md §4.1.
pub fn event_in(dest: &ModuleHandle, port_name: &str, event: &Event, cache: &mut Option<usize>) {
    let idx = match *cache {
        Some(i) => i,
        None => match port_find(dest.borrow().type_info().in_ports, port_name) {
            Some(i) => {
                *cache = Some(i);
                i
            }
            None => {
                log::warn!("event_in: no input port '{port_name}' on {}", dest.borrow().name());
                return;
            }
        },
    };
    dest.borrow_mut().handle_input(idx, event);
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use crate::port::PortKind;

    static TEST_IN: &[PortInfo] = &[];
    static TEST_OUT: &[PortInfo] = &[PortInfo::new("out", PortKind::Float)];
    static TEST_TYPE: ModuleType = ModuleType {
        mname: "test",
        iname: "test",
        in_ports: TEST_IN,
        out_ports: TEST_OUT,
    };

    struct TestModule {
        base: ModuleBase,
    }

    impl Module for TestModule {
        fn base(&self) -> &ModuleBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut ModuleBase {
            &mut self.base
        }
        fn handle_input(&mut self, _port_idx: usize, _event: &Event) {}
    }

    pub fn make_test_module() -> ModuleHandle {
        Rc::new(RefCell::new(TestModule {
            base: ModuleBase::new(&TEST_TYPE, "test0".into(), None),
        }))
    }
}
