pub mod flags;
pub mod tables;

pub use flags::ScaleSignals;
pub use tables::{
    DISSOLVE_SEEDS_EARLY, DISSOLVE_SEEDS_MID, DIVISIONS_EARLY, DIVISIONS_MID, SHOW_STYLE_COUNT,
};
