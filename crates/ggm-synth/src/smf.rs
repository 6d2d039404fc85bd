//! Standard MIDI File playback, a Non-goal: the registry slot exists
//! (mirroring `seq/smf.c`'s module-table entry) but this crate implements
//! no SMF parsing or playback behavior.

/// Marker type occupying the `smf` registry slot. Carries no state and
/// exposes no methods — any behavior here would be invented, not ported.
#[non_exhaustive]
pub struct Smf;
