//! MIDI status byte constants, note/frequency/pitch-bend conversions, and
//! message-length classification at the host boundary.
//!
//! Ported from `ggm/src/inc/event.h` (status byte table) and
//! `ggm/src/core/midi.c` (`midi_to_frequency`, `midi_pitch_bend`).

/* Channel messages (low nibble is channel 0-15). */
pub const STATUS_NOTEOFF: u8 = 8 << 4;
pub const STATUS_NOTEON: u8 = 9 << 4;
pub const STATUS_POLYPHONIC_AFTERTOUCH: u8 = 10 << 4;
pub const STATUS_CONTROL_CHANGE: u8 = 11 << 4;
pub const STATUS_PROGRAM_CHANGE: u8 = 12 << 4;
pub const STATUS_CHANNEL_AFTERTOUCH: u8 = 13 << 4;
pub const STATUS_PITCH_WHEEL: u8 = 14 << 4;

/* System common messages. */
pub const STATUS_SYSEX_START: u8 = 0xf0;
pub const STATUS_QUARTER_FRAME: u8 = 0xf1;
pub const STATUS_SONG_POINTER: u8 = 0xf2;
pub const STATUS_SONG_SELECT: u8 = 0xf3;
pub const STATUS_TUNE_REQUEST: u8 = 0xf6;
pub const STATUS_SYSEX_END: u8 = 0xf7;

/* System realtime messages. */
pub const STATUS_TIMING_CLOCK: u8 = 0xf8;
pub const STATUS_START: u8 = 0xfa;
pub const STATUS_CONTINUE: u8 = 0xfb;
pub const STATUS_STOP: u8 = 0xfc;
pub const STATUS_ACTIVE_SENSING: u8 = 0xfe;
pub const STATUS_RESET: u8 = 0xff;

/* Delimiters. */
pub const STATUS_COMMON: u8 = 0xf0;
pub const STATUS_REALTIME: u8 = 0xf8;

/// Packs a channel/CC pair into the 24-bit MIDI-CC map id spec.md §6
/// defines: `(channel << 16) | (cc << 8) | 0xff`. The trailing `0xff`
/// marker guarantees `id != 0` for every valid `(channel, cc)` pair, so `0`
/// can unambiguously mean "unset" (only channels 0-15 and CCs 0-127 are
/// valid; callers outside that range get a non-canonical id that will
/// simply never match an incoming CC).
pub const fn midi_id(channel: u8, cc: u8) -> u32 {
    ((channel as u32) << 16) | ((cc as u32) << 8) | 0xff
}

/// Inverse of [`midi_id`]: recovers `(channel, cc)` from a packed id.
pub fn decode_midi_id(id: u32) -> (u8, u8) {
    (((id >> 16) & 0xff) as u8, ((id >> 8) & 0xff) as u8)
}

/// `440 * 2^((note-69)/12)`. Exact round-trip: `midi_to_frequency(69.0) ==
/// 440.0`.
pub fn midi_to_frequency(note: f32) -> f32 {
    440.0 * crate::lut::pow2((note - 69.0) / 12.0)
}

/// Converts a 14-bit pitch-wheel value (`0..=16383`, centre `8192`) to a
/// signed semitone offset in `[-2, 2)`.
pub fn midi_pitch_bend(val: u16) -> f32 {
    (val as f32 - 8192.0) * (2.0 / 8192.0)
}

/// Returns the MIDI message's total length in bytes (including the status
/// byte), or `None` if `status` is not a recognized message. System
/// realtime messages are always 1 byte except Song Position (2) and Song
/// Select/MTC Quarter Frame are system-common, not realtime, and are listed
/// explicitly below. Program Change and Channel Aftertouch are 2 bytes; all
/// other channel and system-common messages are 3 bytes save the
/// exceptions enumerated in the spec.
pub fn midi_message_len(status: u8) -> Option<u8> {
    if status >= STATUS_REALTIME {
        // 0xf8..=0xff: all single-byte realtime messages.
        return Some(1);
    }
    match status {
        STATUS_TUNE_REQUEST | STATUS_SYSEX_END => Some(1),
        STATUS_QUARTER_FRAME | STATUS_SONG_SELECT => Some(2),
        STATUS_SONG_POINTER => Some(3),
        STATUS_SYSEX_START => None, // variable length, not handled at this boundary
        s if (s & 0xf0) == STATUS_PROGRAM_CHANGE || (s & 0xf0) == STATUS_CHANNEL_AFTERTOUCH => {
            Some(2)
        }
        s if (s & 0xf0) >= STATUS_NOTEOFF && (s & 0xf0) <= STATUS_PITCH_WHEEL => Some(3),
        _ => None,
    }
}

/// Returns `true` if `status` (masked to its message nibble) is a Control
/// Change message.
pub fn is_control_change(status: u8) -> bool {
    (status & 0xf0) == STATUS_CONTROL_CHANGE
}

/// Extracts the channel number (0-15) from a channel-message status byte.
pub fn channel_of(status: u8) -> u8 {
    status & 0x0f
}

/// Human-readable description of a raw MIDI triple, mirroring `midi_str()`
/// in `event.c`. Intended for debug tracing only (allocates).
#[cfg(feature = "std")]
pub fn describe(status: u8, arg0: u8, arg1: u8) -> crate::compat::String {
    use crate::compat::ToString;
    let msg = status & 0xf0;
    let ch = status & 0x0f;
    if status < STATUS_COMMON {
        match msg {
            STATUS_NOTEOFF => alloc::format!("note-off ch={ch} note={arg0} vel={arg1}"),
            STATUS_NOTEON => alloc::format!("note-on ch={ch} note={arg0} vel={arg1}"),
            STATUS_POLYPHONIC_AFTERTOUCH => {
                alloc::format!("poly-aftertouch ch={ch} note={arg0} pressure={arg1}")
            }
            STATUS_CONTROL_CHANGE => alloc::format!("cc ch={ch} num={arg0} val={arg1}"),
            STATUS_PROGRAM_CHANGE => alloc::format!("program-change ch={ch} program={arg0}"),
            STATUS_CHANNEL_AFTERTOUCH => alloc::format!("channel-aftertouch ch={ch} pressure={arg0}"),
            STATUS_PITCH_WHEEL => {
                let val = ((arg1 as u16) << 7) | (arg0 as u16);
                alloc::format!("pitch-wheel ch={ch} val={val}")
            }
            _ => "unknown channel message".to_string(),
        }
    } else {
        match status {
            STATUS_TIMING_CLOCK => "timing-clock".to_string(),
            STATUS_START => "start".to_string(),
            STATUS_CONTINUE => "continue".to_string(),
            STATUS_STOP => "stop".to_string(),
            STATUS_ACTIVE_SENSING => "active-sensing".to_string(),
            STATUS_RESET => "system-reset".to_string(),
            STATUS_TUNE_REQUEST => "tune-request".to_string(),
            _ => "unknown system message".to_string(),
        }
    }
}
