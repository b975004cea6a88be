//! Per-era constant tables for show styles.
//!
//! Game content was timed against these exact numbers; they are indexed by
//! the numeric show-style type (see `engine::transitions::ShowStyleType`).

/// Number of show-style types, `None` included.
pub const SHOW_STYLE_COUNT: usize = 17;

/// Default step counts, early interpreters.
pub const DIVISIONS_EARLY: [i16; SHOW_STYLE_COUNT] = [
    1, // none
    20, 20, // horizontal shutter out / in
    20, 20, // vertical shutter out / in
    10, 10, 10, 10, // wipe left / right / up / down
    20, 20, // iris out / in
    6, 10, // morph placeholders
    101, 101, // fade out / in
    2, 2, // dissolve (no morph), dissolve
];

/// Default step counts, mid-era and later interpreters.
pub const DIVISIONS_MID: [i16; SHOW_STYLE_COUNT] = [
    1, //
    20, 20, //
    20, 20, //
    16, 16, 16, 16, //
    20, 20, //
    7, 16, //
    101, 101, //
    16, 16, //
];

/// LFSR tap masks for the pixel dissolve, early interpreters.
///
/// Entry `i` drives a register wide enough for `i + 2` bits.
pub const DISSOLVE_SEEDS_EARLY: [u32; 15] = [
    3, 6, 12, 20, 48, 96, 184, 272, 576, 1280, 3232, 6912, 13568, 24576, 46080,
];

/// LFSR tap masks for the pixel dissolve, mid-era and later.
///
/// Indexed directly by register width in bits.
pub const DISSOLVE_SEEDS_MID: [u32; 20] = [
    0, 0, 3, 6, 12, 20, 48, 96, 184, 272, 576, 1280, 3232, 6912, 13568, 24576, 46080, 73728,
    132096, 466944,
];
