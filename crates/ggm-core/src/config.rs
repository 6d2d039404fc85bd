//! Synth configuration and the compile-time per-port configuration table.
//!
//! `SynthConfig` carries the one runtime parameter this crate allows a host
//! to choose: the sample rate, fixed once at synth construction (spec
//! Non-goal: no runtime sample-rate change). Grounded on
//! `tutti-core::config::TuttiConfig`'s shape (a single validated field with
//! a `Default` impl and a `validate()` method).
//!
//! The configuration *table* (`SynthCfg`) is the compile-time `{path,
//! per-port config}` list a root patch installs once, at construction, to
//! give its ports initial values and MIDI-CC bindings.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Top-level synth configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SynthConfig {
    /// Sample rate in Hz. Fixed for the lifetime of the `Synth`.
    pub sample_rate: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            sample_rate: crate::DEFAULT_SAMPLE_RATE,
        }
    }
}

impl SynthConfig {
    /// Validates the configuration. Sample rate must be in a sane audio
    /// range; values outside it almost certainly indicate a host
    /// misconfiguration rather than an intentional, if unusual, rate.
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate >= 8_000.0 && self.sample_rate <= 384_000.0) {
            return Err(Error::InvalidSampleRate(self.sample_rate));
        }
        Ok(())
    }
}

/// Per-port configuration for a `Float`-kind port: an initial value and an
/// optional MIDI-CC binding (`0` means unbound).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortFloatCfg {
    pub init: f32,
    pub midi_id: u32,
}

/// Per-port configuration for an `Int`-kind port.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortIntCfg {
    pub init: i32,
    pub midi_id: u32,
}

/// Per-port configuration for a `Bool`-kind port.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortBoolCfg {
    pub init: bool,
    pub midi_id: u32,
}

/// The value carried by one per-port configuration entry.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PortCfgValue {
    Float(PortFloatCfg),
    Int(PortIntCfg),
    Bool(PortBoolCfg),
}

/// One entry of a synth configuration table: a glob path pattern matched
/// against `"<module.name>:<port.name>"`, paired with the config value to
/// apply on first match.
#[derive(Debug, Clone, Copy)]
pub struct SynthCfgEntry {
    pub path: &'static str,
    pub cfg: PortCfgValue,
}

/// A root patch's configuration table: an ordered list of path-pattern /
/// config-value pairs, first match wins. Root patches build this as a
/// `&'static [SynthCfgEntry]` literal.
pub type SynthCfg = [SynthCfgEntry];

/// Looks up the first entry in `cfg` whose path pattern matches `path`.
pub fn lookup_cfg<'a>(cfg: &'a SynthCfg, path: &str) -> Option<&'a SynthCfgEntry> {
    cfg.iter().find(|entry| crate::util::glob_match(entry.path, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = SynthConfig::default();
        assert_eq!(cfg.sample_rate, 48_000.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_sample_rate() {
        let cfg = SynthConfig { sample_rate: 0.0 };
        assert!(cfg.validate().is_err());
        let cfg = SynthConfig { sample_rate: 1_000_000.0 };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_lookup_cfg_first_match_wins() {
        let table = [
            SynthCfgEntry {
                path: "root.pan:vol",
                cfg: PortCfgValue::Float(PortFloatCfg { init: 0.8, midi_id: 0 }),
            },
            SynthCfgEntry {
                path: "root.pan:*",
                cfg: PortCfgValue::Float(PortFloatCfg { init: 0.1, midi_id: 0 }),
            },
        ];
        let found = lookup_cfg(&table, "root.pan:vol").unwrap();
        match found.cfg {
            PortCfgValue::Float(f) => assert_eq!(f.init, 0.8),
            _ => panic!("wrong variant"),
        }
    }
}
