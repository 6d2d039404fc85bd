//! Module-type lookup and instance construction, ported from
//! `ggm/src/core/module.c` (`module_find`, `module_new`, the instance-name
//! construction rules) and `ggm/src/core/synth.c` (`synth_set_root`'s
//! port-count validation).
//!
//! The registry table itself (`REGISTRY`, the full list of known module
//! types) cannot live in this crate: `ggm-core` sits below `ggm-dsp` and
//! `ggm-synth` in the dependency graph and has no visibility into the
//! concrete module types they define. Only the crate that can see every
//! module type can assemble the table, so `ggm-synth` owns the `static
//! REGISTRY: &[&ModuleType]`; this module provides the generic lookup and
//! construction machinery that table is used with.

use crate::compat::{Rc, RefCell, String};
use crate::error::{Error, Result};
use crate::module::{Module, ModuleBase, ModuleHandle, ModuleType};
use crate::port::PortKind;
use crate::synth::Synth;

/// Finds a module type by its registry name (`"adsr"`, `"svf"`, ...).
pub fn module_find<'a>(registry: &[&'a ModuleType], name: &str) -> Option<&'a ModuleType> {
    registry.iter().copied().find(|t| t.mname == name)
}

/// Builds an instance's dotted path name.
///
/// - An explicit name is used as the leaf verbatim.
/// - Otherwise the leaf is the type's instance prefix followed by its id
///   (`"osc3"`).
/// - A module with a parent gets its parent's full name prepended with
///   `.`, so a voice's ADSR inside the third polyphony slot reads
///   `"root.poly.voice3.adsr"` — exactly the paths `util::glob_match` is
///   matched against by the configuration table and MIDI-CC map.
pub fn build_instance_name(
    parent: Option<&ModuleHandle>,
    type_info: &ModuleType,
    explicit_name: Option<&str>,
    id: Option<u32>,
) -> String {
    let leaf = match explicit_name {
        Some(n) => String::from(n),
        None => format!("{}{}", type_info.iname, id.unwrap_or(0)),
    };
    match parent {
        Some(p) => format!("{}.{}", p.borrow().name(), leaf),
        None => leaf,
    }
}

/// Constructs a non-root module instance and wraps it in a `ModuleHandle`.
/// `build` receives the freshly-named `ModuleBase` and returns the
/// concrete module value; this is the idiomatic stand-in for the C
/// `alloc(va_list)` callback — Rust has no portable varargs, so each
/// concrete module's own constructor function takes its own typed
/// arguments and this helper only handles the part that is the same for
/// every module: naming, parenting and output-list allocation.
///
/// The owning synth back-reference (`ModuleBase::synth`) is inherited from
/// `parent`, matching `module_create`'s `m->top = parent->top` in
/// `module.c` — a module built with no parent (the common case for the
/// composite children a patch builder assembles before it has a root
/// handle to parent them under) starts with no synth reference and relies
/// on its owner to back-fill one with [`ModuleBase::with_synth`] once a
/// synth exists.
pub fn module_new<M, F>(
    parent: Option<ModuleHandle>,
    type_info: &'static ModuleType,
    explicit_name: Option<&str>,
    id: Option<u32>,
    build: F,
) -> ModuleHandle
where
    M: Module + 'static,
    F: FnOnce(ModuleBase) -> M,
{
    let name = build_instance_name(parent.as_ref(), type_info, explicit_name, id);
    let synth = parent.as_ref().and_then(|p| p.borrow().base().synth.clone());
    let mut base = ModuleBase::new(type_info, name, parent).with_synth(synth);
    if let Some(n) = id {
        base = base.with_id(n);
    }
    Rc::new(RefCell::new(build(base)))
}

/// Constructs the root module, validating that its external port counts
/// fit within what the driver boundary supports
/// (`MAX_AUDIO_IN`/`MAX_AUDIO_OUT`/`MAX_MIDI_IN`/`MAX_MIDI_OUT`), and wiring
/// its `ModuleBase::synth` back-reference to `synth` (`synth_set_root`'s
/// side of `m->top` in `synth.c` — the root is the one module every build
/// always has a synth for, since a host must construct the synth before it
/// has anything to hand `set_root`).
pub fn module_root<M, F>(type_info: &'static ModuleType, synth: &Rc<RefCell<Synth>>, build: F) -> Result<ModuleHandle>
where
    M: Module + 'static,
    F: FnOnce(ModuleBase) -> M,
{
    let audio_in = crate::port::port_count_of_kind(type_info.in_ports, PortKind::Audio);
    let audio_out = crate::port::port_count_of_kind(type_info.out_ports, PortKind::Audio);
    let midi_in = crate::port::port_count_of_kind(type_info.in_ports, PortKind::Midi);
    let midi_out = crate::port::port_count_of_kind(type_info.out_ports, PortKind::Midi);

    if audio_in > crate::MAX_AUDIO_IN
        || audio_out > crate::MAX_AUDIO_OUT
        || midi_in > crate::MAX_MIDI_IN
        || midi_out > crate::MAX_MIDI_OUT
    {
        return Err(Error::RootPortLimitExceeded {
            audio_in,
            audio_out,
            midi_in,
            midi_out,
        });
    }

    let name = build_instance_name(None, type_info, Some("root"), None);
    let base = ModuleBase::new(type_info, name, None).with_synth(Some(Rc::downgrade(synth)));
    Ok(Rc::new(RefCell::new(build(base))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortInfo;

    static IN_PORTS: &[PortInfo] = &[PortInfo::new("in", PortKind::Audio)];
    static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out", PortKind::Audio)];
    static LEAF_TYPE: ModuleType = ModuleType {
        mname: "leaf",
        iname: "leaf",
        in_ports: IN_PORTS,
        out_ports: OUT_PORTS,
    };

    struct Leaf {
        base: ModuleBase,
    }
    impl Module for Leaf {
        fn base(&self) -> &ModuleBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut ModuleBase {
            &mut self.base
        }
        fn handle_input(&mut self, _: usize, _: &crate::event::Event) {}
    }

    #[test]
    fn test_module_find() {
        let reg: &[&ModuleType] = &[&LEAF_TYPE];
        assert!(module_find(reg, "leaf").is_some());
        assert!(module_find(reg, "nope").is_none());
    }

    #[test]
    fn test_instance_naming_nested() {
        let parent = module_new(None, &LEAF_TYPE, Some("poly"), None, |base| Leaf { base });
        let child = module_new(Some(parent.clone()), &LEAF_TYPE, None, Some(3), |base| Leaf {
            base,
        });
        assert_eq!(child.borrow().name(), "poly.leaf3");
    }

    #[test]
    fn test_root_rejects_too_many_audio_outs() {
        static BIG_OUT: &[PortInfo] = &[
            PortInfo::new("o0", PortKind::Audio),
            PortInfo::new("o1", PortKind::Audio),
            PortInfo::new("o2", PortKind::Audio),
        ];
        static BIG_TYPE: ModuleType = ModuleType {
            mname: "big",
            iname: "big",
            in_ports: &[],
            out_ports: BIG_OUT,
        };
        let synth = Rc::new(RefCell::new(Synth::new(crate::config::SynthConfig::default(), &[]).unwrap()));
        let result = module_root(&BIG_TYPE, &synth, |base| Leaf { base });
        assert!(result.is_err());
    }
}
