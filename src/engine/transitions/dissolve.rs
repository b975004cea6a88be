//! Pixel dissolve.
//!
//! A memory bitmap the size of the plane sits on top of it. Pixels are
//! visited in the order of a Galois LFSR restricted to the bitmap's pixel
//! count; entering a scene they are punched out of a snapshot of the old
//! screen, leaving one they are set to the fill colour.

use crate::cel::{Bitmap, BitmapId, CelRef};
use crate::config::TransitionTables;
use crate::engine::GfxError;
use crate::engine::frameout::FrameOut;
use crate::engine::screen_item::ScreenItem;
use crate::geometry::Point;
use crate::vm::ObjectId;

const SKIP_COLOR: u8 = 255;
const START_SEED: u32 = 53427;

#[derive(Debug, Clone)]
pub struct Dissolve {
    plane: ObjectId,
    item: ObjectId,
    bitmap: BitmapId,
    width: u32,
    pixel_count: u32,
    mask: u32,
    pixel: u32,
    first_pixel: u32,
    per_step: u32,
    fill: u8,
    done: bool,
}

impl Dissolve {
    pub fn configure(
        frame: &mut FrameOut,
        tables: &TransitionTables,
        plane: ObjectId,
        divisions: i32,
        color: u8,
        priority: i16,
        fade_up: bool,
    ) -> Result<Self, GfxError> {
        let p = frame.planes().find(plane).ok_or(GfxError::PlaneNotFound(plane))?;
        let (screen_rect, plane_rect) = (p.screen_rect, p.plane_rect);
        let width = screen_rect.width().max(1);
        let height = screen_rect.height().max(1);

        let bitmap = if fade_up && !screen_rect.is_empty() {
            frame.buffer().capture(&screen_rect, SKIP_COLOR)
        } else {
            Bitmap::new(width, height, SKIP_COLOR, SKIP_COLOR)
        };
        let bitmap = frame.bitmaps_mut().alloc(bitmap);

        let object = frame.ids_mut().next_synthetic();
        let creation_id = frame.ids_mut().next_creation();
        let mut item = ScreenItem::new(
            object,
            plane,
            CelRef::Mem(bitmap),
            Point::new(screen_rect.left - plane_rect.left, screen_rect.top - plane_rect.top),
            creation_id,
            frame.screen_count(),
        );
        item.priority = priority;
        item.fixed_priority = true;
        frame.add_screen_item(item)?;

        let pixel_count = (width * height) as u32;
        let first_pixel = match START_SEED % pixel_count {
            0 => 1,
            n => n,
        };
        Ok(Self {
            plane,
            item: object,
            bitmap,
            width: width as u32,
            pixel_count,
            mask: tables.dissolve_seed(pixel_count),
            pixel: first_pixel,
            first_pixel,
            per_step: (pixel_count + divisions as u32) / divisions.max(1) as u32,
            fill: if fade_up { SKIP_COLOR } else { color },
            done: false,
        })
    }

    /// Convert one step's worth of pixels. Returns `true` once every pixel
    /// has been converted.
    pub fn step(&mut self, frame: &mut FrameOut, last_step: bool) -> bool {
        if self.done {
            return true;
        }
        let Some(bitmap) = frame.bitmaps_mut().get_mut(self.bitmap) else {
            log::error!("dissolve bitmap {:?} missing", self.bitmap);
            self.done = true;
            return true;
        };

        if self.pixel_count <= 2 {
            self.done = true;
        } else {
            for _ in 0..self.per_step {
                let (x, y) = (self.pixel % self.width, self.pixel / self.width);
                bitmap.set_pixel(x as i32, y as i32, self.fill);
                match next_pixel(self.pixel, self.mask, self.pixel_count) {
                    Some(next) if next != self.first_pixel => self.pixel = next,
                    _ => {
                        self.done = true;
                        break;
                    }
                }
            }
        }

        if self.done || last_step {
            bitmap.pixels.fill(self.fill);
            self.done = true;
        }

        let screen_count = frame.screen_count();
        if let Some(item) = frame.planes_mut().find_mut(self.plane).and_then(|p| p.find_item_mut(self.item)) {
            if item.created == 0 {
                item.updated = screen_count;
            }
        }
        self.done
    }

    /// Delete the overlay item and free its bitmap.
    pub fn release(&mut self, frame: &mut FrameOut) {
        if let Err(e) = frame.delete_screen_item(self.plane, self.item) {
            log::debug!("dissolve overlay already gone: {e}");
        }
        frame.bitmaps_mut().free(self.bitmap);
    }

    pub fn item(&self) -> ObjectId {
        self.item
    }

    pub fn bitmap(&self) -> BitmapId {
        self.bitmap
    }
}

/// Next LFSR value below `count`, or `None` if the register escaped the
/// range for longer than a full period.
fn next_pixel(mut seq: u32, mask: u32, count: u32) -> Option<u32> {
    let limit = (count.max(mask) as u64 + 1).next_power_of_two() * 2;
    for _ in 0..limit {
        seq = if seq & 1 != 0 { (seq >> 1) ^ mask } else { seq >> 1 };
        if seq < count {
            return Some(seq);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Era;
    use std::collections::HashSet;

    #[test]
    fn sequence_visits_every_nonzero_pixel_once() {
        for era in [Era::Early, Era::Mid] {
            let tables = TransitionTables::for_era(era);
            let count = 64 * 40;
            let mask = tables.dissolve_seed(count);
            let first = START_SEED % count;
            let mut seen = HashSet::new();
            let mut seq = first;
            loop {
                assert!(seen.insert(seq), "{seq} visited twice");
                seq = next_pixel(seq, mask, count).unwrap();
                if seq == first {
                    break;
                }
            }
            assert_eq!(seen.len() as u32, count - 1, "{era:?}");
            assert!(!seen.contains(&0));
        }
    }
}
