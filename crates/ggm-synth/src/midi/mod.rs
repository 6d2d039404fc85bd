//! MIDI-driven voice managers.

pub mod mono;
pub mod poly;
