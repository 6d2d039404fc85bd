//! The module-type registry, per `ggm_core::registry`'s own doc comment:
//! only this crate — sitting above both `ggm-core` and `ggm-dsp` in the
//! dependency graph — can see every concrete module type, so only it can
//! assemble the table. Mirrors `ggm/src/core/module.c`'s static
//! `module_types[]` array.

use ggm_core::module::ModuleType;

use ggm_dsp::envelope::ADSR_TYPE;
use ggm_dsp::filter::biquad::BIQUAD_TYPE;
use ggm_dsp::filter::svf::SVF_TYPE;
use ggm_dsp::osc::goom::GOOM_TYPE;
use ggm_dsp::osc::ks::KS_TYPE;
use ggm_dsp::osc::lfo::LFO_TYPE;
use ggm_dsp::osc::noise::NOISE_TYPE;
use ggm_dsp::osc::sine::SINE_TYPE;

use crate::delay::DELAY_TYPE;
use crate::midi::mono::MONO_TYPE;
use crate::midi::poly::POLY_TYPE;
use crate::mix::pan::PAN_TYPE;
use crate::patch::metro::METRO_TYPE;
use crate::patch::poly::POLY_PATCH_TYPE;
use crate::pm::breath::BREATH_TYPE;
use crate::seq::SEQ_TYPE;
use crate::voice::goom::GOOM_VOICE_TYPE;
use crate::voice::osc::OSC_VOICE_TYPE;

/// Every module type this crate and `ggm-dsp` know how to build, looked up
/// by name via `ggm_core::registry::module_find`. The `smf` stub carries no
/// `ModuleType` — it has no port table and is never instantiated through
/// this registry (see [`crate::smf`]).
pub static REGISTRY: &[&ModuleType] = &[
    &ADSR_TYPE,
    &SVF_TYPE,
    &BIQUAD_TYPE,
    &SINE_TYPE,
    &GOOM_TYPE,
    &KS_TYPE,
    &NOISE_TYPE,
    &LFO_TYPE,
    &DELAY_TYPE,
    &MONO_TYPE,
    &POLY_TYPE,
    &PAN_TYPE,
    &BREATH_TYPE,
    &SEQ_TYPE,
    &OSC_VOICE_TYPE,
    &GOOM_VOICE_TYPE,
    &METRO_TYPE,
    &POLY_PATCH_TYPE,
];

#[cfg(test)]
mod tests {
    use super::*;
    use ggm_core::registry::module_find;

    #[test]
    fn test_registry_has_no_duplicate_names() {
        let mut names: ggm_core::compat::Vec<&str> = REGISTRY.iter().map(|t| t.mname).collect();
        names.sort_unstable();
        let mut deduped = names.clone();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len(), "duplicate module type name in REGISTRY");
    }

    #[test]
    fn test_module_find_locates_every_registered_type() {
        for t in REGISTRY {
            assert!(module_find(REGISTRY, t.mname).is_some());
        }
    }
}
