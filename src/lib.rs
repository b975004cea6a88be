//! Plane compositor for a 2-D adventure interpreter.
//!
//! Scripts describe the screen as prioritised planes holding screen items.
//! Each frame the compositor diffs that scene against what it showed last
//! time, redraws only what changed into an index-colour buffer and blits
//! the changed rectangles. Show styles and scrolls animate planes in and
//! out on top of the same machinery.

pub mod cel;
pub mod config;
pub mod defs;
pub mod engine;
pub mod geometry;
pub mod renderer;
pub mod vm;

#[cfg(test)]
mod testing;

pub use config::EngineConfig;
pub use engine::{GfxError, Graphics, Services};
