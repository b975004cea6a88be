//! Engine configuration.
//!
//! Everything that used to be decided by checking the interpreter version at
//! individual call sites is resolved here once, then handed to the
//! compositor and the show-style engine.

use serde::{Deserialize, Serialize};

use crate::defs::{
    DISSOLVE_SEEDS_EARLY, DISSOLVE_SEEDS_MID, DIVISIONS_EARLY, DIVISIONS_MID, SHOW_STYLE_COUNT,
};

/// Interpreter generation whose constant tables are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Era {
    /// Before the mid-era rewrite of the transition code.
    Early,
    /// Mid-era and later.
    #[default]
    Mid,
}

/// What to do with loop/cel numbers outside the view's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CelClampPolicy {
    /// Too high wraps to 0 and is written back to the object; negative
    /// becomes `count - 1` locally and the object keeps its raw value.
    #[default]
    WrapHighKeepNegative,
    /// Anything out of range becomes `count - 1` and is written back.
    ClampToLast,
}

/// User-facing configuration, deserializable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of the internal pixel buffer and of the display.
    pub screen_width: i32,
    pub screen_height: i32,
    /// Coordinate system scripts position things in.
    pub script_width: i32,
    pub script_height: i32,
    /// How many frames a lifecycle transition stays visible to the diff.
    pub screen_count: u8,
    /// Wasted pixels tolerated when fusing show-list rectangles.
    pub overdraw_threshold: i32,
    /// Sleep between frames to hold ~60 fps.
    pub throttle: bool,
    /// View used by the game's own performance self-test; while a screen
    /// item with this view is on screen, frame throttling is suspended.
    pub benchmark_view: Option<i32>,
    pub era: Era,
    pub clamp_policy: CelClampPolicy,
    /// Sleep after each forced transition frame.
    pub transition_throttle_ms: u32,
    /// Alternate picture-versus-sprite redraw ordering. No known game turns
    /// this on; it is kept so such a target can.
    pub high_res_pictures: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            screen_width: 320,
            screen_height: 200,
            script_width: 320,
            script_height: 200,
            screen_count: 1,
            overdraw_threshold: 0,
            throttle: true,
            benchmark_view: None,
            era: Era::Mid,
            clamp_policy: CelClampPolicy::WrapHighKeepNegative,
            transition_throttle_ms: 33,
            high_res_pictures: false,
        }
    }
}

impl EngineConfig {
    pub fn tables(&self) -> TransitionTables {
        TransitionTables::for_era(self.era)
    }
}

/// Constant tables selected by [`Era`].
#[derive(Debug, Clone, Copy)]
pub struct TransitionTables {
    pub era: Era,
    pub default_divisions: &'static [i16; SHOW_STYLE_COUNT],
    dissolve_seeds: &'static [u32],
}

impl TransitionTables {
    pub fn for_era(era: Era) -> Self {
        match era {
            Era::Early => Self {
                era,
                default_divisions: &DIVISIONS_EARLY,
                dissolve_seeds: &DISSOLVE_SEEDS_EARLY,
            },
            Era::Mid => Self {
                era,
                default_divisions: &DIVISIONS_MID,
                dissolve_seeds: &DISSOLVE_SEEDS_MID,
            },
        }
    }

    /// Tap mask for an LFSR that has to enumerate `0..pixel_count`.
    ///
    /// Indexed by the bit width of `pixel_count - 1`; the early table starts
    /// at two bits. Widths past the end of a table use its widest entry.
    pub fn dissolve_seed(&self, pixel_count: u32) -> u32 {
        let bits = bit_width(pixel_count.saturating_sub(1)) as usize;
        let index = match self.era {
            Era::Early => bits.saturating_sub(2),
            Era::Mid => bits.max(2),
        };
        let last = self.dissolve_seeds.len() - 1;
        self.dissolve_seeds[index.min(last)]
    }
}

/// Number of bits needed to represent `value`.
pub fn bit_width(value: u32) -> u32 {
    u32::BITS - value.leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_from_empty_json() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.screen_width, 320);
        assert_eq!(cfg.era, Era::Mid);
        assert_eq!(cfg.transition_throttle_ms, 33);
    }

    #[test]
    fn config_reads_era() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{ "era": "early", "throttle": false }"#).unwrap();
        assert_eq!(cfg.era, Era::Early);
        assert!(!cfg.throttle);
        assert_eq!(cfg.tables().default_divisions[5], 10);
    }

    #[test]
    fn dissolve_seed_lookup() {
        assert_eq!(bit_width(0), 0);
        assert_eq!(bit_width(7), 3);
        assert_eq!(bit_width(8), 4);

        let mid = TransitionTables::for_era(Era::Mid);
        let early = TransitionTables::for_era(Era::Early);
        // 8 pixels -> indices 0..=7 -> three bits
        assert_eq!(mid.dissolve_seed(8), 6);
        assert_eq!(early.dissolve_seed(8), 6);
        // 64000 pixels -> 16 bits
        assert_eq!(mid.dissolve_seed(64_000), 46080);
        assert_eq!(early.dissolve_seed(64_000), 46080);
        // beyond the early table
        assert_eq!(early.dissolve_seed(1 << 19), 46080);
        assert_eq!(mid.dissolve_seed(1 << 19), 466944);
    }
}
