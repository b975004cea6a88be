//! Pixel side of the compositor.
//!
//! *The compositor never talks to a window or a palette chip directly.*
//! It draws into a [`Buffer`] and reaches everything outside the process
//! through three injected services:
//!
//! * [`PaletteService`] – fades, palette submission and remap lookups.
//! * [`Display`]        – receives changed rectangles of the buffer.
//! * [`Clock`]          – time source for frame and transition throttling.
//!
//! Each trait is also implemented for `Rc<RefCell<T>>` so a front-end can
//! keep a handle on a service after handing it to the engine.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::geometry::Rect;

pub mod buffer;
pub mod palette;

pub use buffer::{Buffer, CelBlit};
pub use palette::{Palette, Rgb, SoftPalette};

/// Pixel format handed to windowing back-ends (0x00RRGGBB).
pub type Rgba = u32;

/// Palette collaborator.
pub trait PaletteService {
    /// Fade colours `from..=to` to `percent` of their intensity.
    fn set_fade(&mut self, percent: i16, from: u8, to: u8);
    /// Replace the source palette.
    fn submit(&mut self, palette: &Palette);
    /// Apply pending palette work for the coming frame; `true` when the
    /// remap tables changed, which forces remapped items to redraw.
    fn update_for_frame(&mut self) -> bool;
    /// Push the current palette to the hardware.
    fn update_hardware(&mut self, suppress_blit: bool);
    /// Number of active remaps. Non-zero widens update invalidation.
    fn remap_count(&self) -> usize;
    /// Remapped result of drawing `color` over `under`, or `None` when
    /// `color` is not a remap colour.
    fn remap(&self, color: u8, under: u8) -> Option<u8>;
}

/// Hardware blit sink.
pub trait Display {
    fn copy_rect_to_screen(&mut self, buffer: &[u8], pitch: usize, x: i32, y: i32, w: i32, h: i32);
    fn update_screen(&mut self);
    /// The rectangles of the next blit batch, so a cursor can get out of
    /// the way.
    fn begin_paint(&mut self, _rects: &[Rect]) {}
    fn done_painting(&mut self) {}
}

/// Millisecond time source.
pub trait Clock {
    fn millis(&self) -> u64;
    fn sleep(&mut self, ms: u64);

    /// 60 Hz ticks since the clock started.
    fn ticks(&self) -> u64 {
        self.millis() * 60 / 1000
    }
}

/// Wall clock backed by [`Instant`].
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/*──────────────────────── shared handles ────────────────────────*/

impl<T: PaletteService + ?Sized> PaletteService for Rc<RefCell<T>> {
    fn set_fade(&mut self, percent: i16, from: u8, to: u8) {
        self.borrow_mut().set_fade(percent, from, to)
    }
    fn submit(&mut self, palette: &Palette) {
        self.borrow_mut().submit(palette)
    }
    fn update_for_frame(&mut self) -> bool {
        self.borrow_mut().update_for_frame()
    }
    fn update_hardware(&mut self, suppress_blit: bool) {
        self.borrow_mut().update_hardware(suppress_blit)
    }
    fn remap_count(&self) -> usize {
        self.borrow().remap_count()
    }
    fn remap(&self, color: u8, under: u8) -> Option<u8> {
        self.borrow().remap(color, under)
    }
}

impl<T: Display + ?Sized> Display for Rc<RefCell<T>> {
    fn copy_rect_to_screen(&mut self, buffer: &[u8], pitch: usize, x: i32, y: i32, w: i32, h: i32) {
        self.borrow_mut().copy_rect_to_screen(buffer, pitch, x, y, w, h)
    }
    fn update_screen(&mut self) {
        self.borrow_mut().update_screen()
    }
    fn begin_paint(&mut self, rects: &[Rect]) {
        self.borrow_mut().begin_paint(rects)
    }
    fn done_painting(&mut self) {
        self.borrow_mut().done_painting()
    }
}

impl<T: Clock + ?Sized> Clock for Rc<RefCell<T>> {
    fn millis(&self) -> u64 {
        self.borrow().millis()
    }
    fn sleep(&mut self, ms: u64) {
        self.borrow_mut().sleep(ms)
    }
}
