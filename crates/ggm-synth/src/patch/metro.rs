//! `root/metro`: a sequencer driving a monophonic voice through a pan
//! mixer, grounded in spec.md §8 scenario 1 ("Metronome at 120 bpm") —
//! a root patch that is audible end-to-end rather than just a bare
//! sequencer emitting events nobody renders. The sequencer's "midi" output
//! is wired straight to the voice manager's "midi" input at build time for
//! *immediate* delivery of events the voice manager itself raises, but the
//! sequencer's own note on/off events are deferred through the owning
//! synth's event queue (see `process` below) rather than dispatched within
//! the same block they were generated in.

use ggm_core::block::AudioBuf;
use ggm_core::compat::{Rc, RefCell, Vec, Weak};
use ggm_core::error::Result;
use ggm_core::event::Event;
use ggm_core::module::{connect, Module, ModuleBase, ModuleHandle, ModuleType};
use ggm_core::port::{PortInfo, PortKind};
use ggm_core::registry::module_root;
use ggm_core::synth::Synth;

use crate::midi::mono::MonoModule;
use crate::mix::pan::PanModule;
use crate::seq::SeqModule;
use crate::voice::osc::OscVoiceModule;

static IN_PORTS: &[PortInfo] = &[PortInfo::new("ctrl", PortKind::Int), PortInfo::new("bpm", PortKind::Float)];
static OUT_PORTS: &[PortInfo] = &[PortInfo::new("out_l", PortKind::Audio), PortInfo::new("out_r", PortKind::Audio)];

pub static METRO_TYPE: ModuleType = ModuleType {
    mname: "root/metro",
    iname: "metro",
    in_ports: IN_PORTS,
    out_ports: OUT_PORTS,
};

pub struct MetroModule {
    base: ModuleBase,
    seq: ModuleHandle,
    mono: ModuleHandle,
    pan: ModuleHandle,
}

impl MetroModule {
    pub fn build(synth: &Rc<RefCell<Synth>>, sample_rate: f64, program: Vec<u8>) -> Result<ModuleHandle> {
        let seq = SeqModule::build(None, Some("seq"), None, sample_rate, program);
        let voice = OscVoiceModule::build(None, Some("voice"), None, sample_rate);
        let mono = MonoModule::build(None, Some("mono"), None, voice);
        connect(&seq, "midi", &mono, "midi");
        let pan = PanModule::build(None, Some("pan"), None);

        // `seq`/`mono`/`pan` are built with no parent (the root handle
        // doesn't exist yet), so `module_new` can't inherit a synth
        // reference for them the way it does for a real child — back-fill
        // the one reference that actually matters: the sequencer's, which
        // `process` below needs to queue its note events.
        seq.borrow_mut().base_mut().synth = Some(Rc::downgrade(synth));

        module_root(&METRO_TYPE, synth, |base| MetroModule { base, seq, mono, pan })
    }
}

impl Module for MetroModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }
    fn handle_input(&mut self, port_idx: usize, event: &Event) {
        // `ctrl`/`bpm` line up 1:1 with the sequencer's own port indices.
        self.seq.borrow_mut().handle_input(port_idx, event);
    }
    fn process(&mut self, bufs: &mut [&mut AudioBuf]) -> bool {
        self.seq.borrow_mut().process(&mut []);

        // The sequencer's note on/off events go on the synth's deferred
        // queue instead of straight to `mono` — delivered at the start of
        // the *next* block, never visible within this one (spec.md §4.1/
        // §4.3: peers never observe a sibling's mid-block state changes).
        let pending = self.seq.borrow_mut().drain_events();
        if !pending.is_empty() {
            if let Some(synth) = self.base.synth.as_ref().and_then(Weak::upgrade) {
                let mut synth = synth.borrow_mut();
                for (port_idx, event) in pending {
                    synth.queue_event(self.seq.clone(), port_idx, event);
                }
            }
        }

        let mut voice_out = [0.0f32; ggm_core::BLOCK];
        let active = self.mono.borrow_mut().process(&mut [&mut voice_out]);

        let (l, r) = bufs.split_at_mut(1);
        let l0 = &mut *l[0];
        let r0 = &mut *r[0];
        if active {
            self.pan.borrow_mut().process(&mut [&mut voice_out, l0, r0]);
        } else {
            ggm_core::block::block_zero(l0);
            ggm_core::block::block_zero(r0);
        }

        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seq::{OP_LOOP, OP_NOTE, OP_REST};
    use crate::seq::CTRL_START;
    use ggm_core::config::SynthConfig;

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

    fn test_synth() -> Rc<RefCell<Synth>> {
        Rc::new(RefCell::new(Synth::new(SynthConfig::default(), &[]).unwrap()))
    }

    #[test]
    fn test_metro_root_builds_within_audio_port_limits() {
        let synth = test_synth();
        let root = MetroModule::build(&synth, 48_000.0, metro_program());
        assert!(root.is_ok());
    }

    #[test]
    fn test_metro_root_renders_audible_clicks() {
        let synth = test_synth();
        let root = MetroModule::build(&synth, 48_000.0, metro_program()).unwrap();
        root.borrow_mut().handle_input(0, &Event::Int(CTRL_START));
        synth.borrow_mut().set_root(root).unwrap();
        let mut any_active = false;
        for _ in 0..2000 {
            synth.borrow_mut().process_block().unwrap();
            any_active |= synth.borrow().audio_out(0).unwrap().iter().any(|&s| s != 0.0);
        }
        assert!(any_active);
    }

    /// A note the sequencer queues during one `process` call must never
    /// reach `mono` within that same call — only `Synth::process_block`'s
    /// queue drain (at the *start* of the following block) delivers it.
    /// Calling `process` directly, bypassing the synth driver entirely,
    /// must therefore never gate `mono` no matter how many times it's
    /// called — this would have failed before this patch, when the
    /// sequencer's events were dispatched immediately within `process`
    /// itself.
    #[test]
    fn test_sequencer_notes_never_reach_mono_without_a_queue_drain() {
        let synth = test_synth();
        let root = MetroModule::build(&synth, 48_000.0, metro_program()).unwrap();
        root.borrow_mut().handle_input(0, &Event::Int(CTRL_START));
        let mut l = [0.0f32; ggm_core::BLOCK];
        let mut r = [0.0f32; ggm_core::BLOCK];
        for _ in 0..2000 {
            let active = root.borrow_mut().process(&mut [&mut l, &mut r]);
            assert!(!active);
        }
        assert!(l.iter().all(|&s| s == 0.0));
        assert!(r.iter().all(|&s| s == 0.0));
    }
}
