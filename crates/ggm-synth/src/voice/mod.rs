//! Single-voice composites: an oscillator (or Goom wave) paired with its
//! own envelope(s), the unit a polyphonic or monophonic voice manager
//! allocates one of per note.

pub mod goom;
pub mod osc;
