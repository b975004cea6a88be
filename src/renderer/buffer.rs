//! Indexed-colour off-screen buffer with a per-pixel priority map.

use crate::cel::{Bitmap, CelMetrics, CelRef, CelSource};
use crate::geometry::Rect;

use super::PaletteService;

/// Priority of a pixel no screen item has claimed yet.
pub const NO_PRIORITY: i16 = i16::MIN;

/// One cel placed on screen.
#[derive(Debug, Clone, Copy)]
pub struct CelBlit {
    pub cel: CelRef,
    pub metrics: CelMetrics,
    /// Where the whole (scaled) cel lands, before clipping.
    pub target: Rect,
    pub mirrored: bool,
    pub priority: i16,
}

pub struct Buffer {
    width: i32,
    height: i32,
    pixels: Vec<u8>,
    priority: Vec<i16>,
}

impl Buffer {
    pub fn new(width: i32, height: i32) -> Self {
        let n = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            pixels: vec![0; n],
            priority: vec![NO_PRIORITY; n],
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn pitch(&self) -> usize {
        self.width as usize
    }

    pub fn screen_rect(&self) -> Rect {
        Rect::sized(self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> u8 {
        self.pixels[self.index(x, y)]
    }

    #[inline]
    pub fn priority_at(&self, x: i32, y: i32) -> i16 {
        self.priority[self.index(x, y)]
    }

    /// Pixels from `(x, y)` to the end of the buffer, for blitting a
    /// rectangle that starts there.
    pub fn slice_from(&self, x: i32, y: i32) -> &[u8] {
        &self.pixels[self.index(x, y)..]
    }

    /// Solid fill; the filled pixels become unclaimed.
    pub fn fill_rect(&mut self, rect: &Rect, color: u8) {
        let mut r = *rect;
        r.clip(&self.screen_rect());
        for y in r.top..r.bottom {
            let row = self.index(r.left, y);
            let len = r.width() as usize;
            self.pixels[row..row + len].fill(color);
            self.priority[row..row + len].fill(NO_PRIORITY);
        }
    }

    /// Forget which priorities own the pixels in `rect`.
    pub fn reset_priority(&mut self, rect: &Rect) {
        let mut r = *rect;
        r.clip(&self.screen_rect());
        for y in r.top..r.bottom {
            let row = self.index(r.left, y);
            self.priority[row..row + r.width() as usize].fill(NO_PRIORITY);
        }
    }

    /// Copy of the pixels under `rect` as a bitmap.
    pub fn capture(&self, rect: &Rect, skip_color: u8) -> Bitmap {
        let mut r = *rect;
        r.clip(&self.screen_rect());
        let mut bitmap = Bitmap::new(r.width(), r.height(), 0, skip_color);
        for y in 0..r.height() {
            for x in 0..r.width() {
                bitmap.set_pixel(x, y, self.pixel(r.left + x, r.top + y));
            }
        }
        bitmap
    }

    /// Draw `blit` inside `clip`.
    ///
    /// A pixel is written when the item's priority is at least the
    /// priority already recorded there. Remap colours are resolved against
    /// the pixel they land on.
    pub fn draw_cel(
        &mut self,
        source: &CelSource<'_>,
        blit: &CelBlit,
        clip: &Rect,
        palette: &dyn PaletteService,
    ) {
        let target = blit.target;
        if target.is_empty() || blit.metrics.width <= 0 || blit.metrics.height <= 0 {
            return;
        }

        let mut area = target;
        area.clip(clip);
        area.clip(&self.screen_rect());
        if area.is_empty() {
            return;
        }

        let (tw, th) = (target.width(), target.height());
        let (cw, ch) = (blit.metrics.width, blit.metrics.height);

        for y in area.top..area.bottom {
            let cy = ((y - target.top) * ch / th).min(ch - 1);
            for x in area.left..area.right {
                let cx = ((x - target.left) * cw / tw).min(cw - 1);
                let Some(mut color) = source.pixel(&blit.cel, &blit.metrics, cx, cy, blit.mirrored)
                else {
                    continue;
                };

                let i = self.index(x, y);
                if blit.priority < self.priority[i] {
                    continue;
                }
                if blit.metrics.remap {
                    if let Some(mapped) = palette.remap(color, self.pixels[i]) {
                        color = mapped;
                    }
                }
                self.pixels[i] = color;
                self.priority[i] = blit.priority;
            }
        }
    }
}
