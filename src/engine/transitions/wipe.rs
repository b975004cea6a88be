//! Wipes, shutters and irises.
//!
//! The plane is cut into solid-colour blocks, `edges` of them per step.
//! Entering a scene the blocks start on screen and are taken away in
//! reveal order; leaving one they are put back in the reverse order.

use crate::cel::CelRef;
use crate::engine::GfxError;
use crate::engine::frameout::FrameOut;
use crate::engine::screen_item::ScreenItem;
use crate::geometry::{Point, Rect};
use crate::vm::ObjectId;

use super::ShowStyleType;

#[derive(Debug, Clone)]
struct Block {
    object: ObjectId,
    rect: Rect,
    shown: bool,
}

/// Block items of one wipe entry.
#[derive(Debug, Clone)]
pub struct Blocks {
    plane: ObjectId,
    edges: usize,
    color: u8,
    priority: i16,
    slots: Vec<Block>,
}

impl Blocks {
    /// Lay out the blocks over the plane's game area. When `fade_up` they
    /// are put on screen right away.
    pub fn configure(
        frame: &mut FrameOut,
        plane: ObjectId,
        kind: ShowStyleType,
        divisions: i32,
        color: u8,
        priority: i16,
        fade_up: bool,
    ) -> Result<Self, GfxError> {
        let game = frame.planes().find(plane).ok_or(GfxError::PlaneNotFound(plane))?.game_rect;
        let area = Rect::sized(game.width(), game.height());
        let (edges, rects) = block_rects(kind, area, divisions);

        let slots = rects
            .into_iter()
            .map(|rect| Block {
                object: frame.ids_mut().next_synthetic(),
                rect,
                shown: false,
            })
            .collect();
        let mut blocks = Self {
            plane,
            edges,
            color,
            priority,
            slots,
        };

        if fade_up {
            for i in 0..blocks.slots.len() {
                blocks.show(frame, i)?;
            }
        }
        Ok(blocks)
    }

    /// Take away (entering) or put back (leaving) the blocks of `step`.
    pub fn step(&mut self, frame: &mut FrameOut, step: i32, divisions: i32, fade_up: bool) -> Result<(), GfxError> {
        let group = if fade_up { step } else { divisions - step - 1 };
        let base = group.max(0) as usize * self.edges;
        for i in base..(base + self.edges).min(self.slots.len()) {
            if fade_up {
                self.hide(frame, i)?;
            } else {
                self.show(frame, i)?;
            }
        }
        Ok(())
    }

    /// Remove every block still on screen.
    pub fn release(&mut self, frame: &mut FrameOut) {
        for i in 0..self.slots.len() {
            if let Err(e) = self.hide(frame, i) {
                log::warn!("wipe block {}: {e}", self.slots[i].object);
            }
        }
    }

    /// Blocks currently on screen.
    pub fn shown(&self) -> usize {
        self.slots.iter().filter(|b| b.shown).count()
    }

    fn show(&mut self, frame: &mut FrameOut, index: usize) -> Result<(), GfxError> {
        let block = &mut self.slots[index];
        if block.shown || block.rect.is_empty() {
            return Ok(());
        }
        let creation_id = frame.ids_mut().next_creation();
        let mut item = ScreenItem::new(
            block.object,
            self.plane,
            CelRef::Color {
                color: self.color,
                width: block.rect.width(),
                height: block.rect.height(),
            },
            Point::new(block.rect.left, block.rect.top),
            creation_id,
            frame.screen_count(),
        );
        item.priority = self.priority;
        item.fixed_priority = true;
        frame.add_screen_item(item)?;
        block.shown = true;
        Ok(())
    }

    fn hide(&mut self, frame: &mut FrameOut, index: usize) -> Result<(), GfxError> {
        let block = &mut self.slots[index];
        if !block.shown {
            return Ok(());
        }
        block.shown = false;
        frame.delete_screen_item(self.plane, block.object)
    }
}

/// Blocks covering `area` in reveal order, `edges` per step.
pub fn block_rects(kind: ShowStyleType, area: Rect, divisions: i32) -> (usize, Vec<Rect>) {
    let div = divisions.max(1);
    let (w, h) = (area.width(), area.height());
    let at = |len: i32, k: i32| len * k / div;

    match kind {
        ShowStyleType::WipeRight => (
            1,
            (0..div).map(|k| Rect::new(at(w, k), 0, at(w, k + 1), h)).collect(),
        ),
        ShowStyleType::WipeLeft => (
            1,
            (0..div).map(|k| Rect::new(w - at(w, k + 1), 0, w - at(w, k), h)).collect(),
        ),
        ShowStyleType::WipeDown => (
            1,
            (0..div).map(|k| Rect::new(0, at(h, k), w, at(h, k + 1))).collect(),
        ),
        ShowStyleType::WipeUp => (
            1,
            (0..div).map(|k| Rect::new(0, h - at(h, k + 1), w, h - at(h, k))).collect(),
        ),
        ShowStyleType::HShutterOut | ShowStyleType::HShutterIn => {
            let c = w / 2;
            let out = |k: i32| {
                [
                    Rect::new(c - at(c, k + 1), 0, c - at(c, k), h),
                    Rect::new(c + at(w - c, k), 0, c + at(w - c, k + 1), h),
                ]
            };
            (2, ordered(div, kind == ShowStyleType::HShutterOut, out))
        }
        ShowStyleType::VShutterOut | ShowStyleType::VShutterIn => {
            let c = h / 2;
            let out = |k: i32| {
                [
                    Rect::new(0, c - at(c, k + 1), w, c - at(c, k)),
                    Rect::new(0, c + at(h - c, k), w, c + at(h - c, k + 1)),
                ]
            };
            (2, ordered(div, kind == ShowStyleType::VShutterOut, out))
        }
        ShowStyleType::IrisOut | ShowStyleType::IrisIn => {
            let (hw, hh) = (w / 2, h / 2);
            let inset = |j: i32| Rect::new(at(hw, j), at(hh, j), w - at(w - hw, j), h - at(h - hh, j));
            // ring k counted from the centre
            let ring = |k: i32| {
                let outer = inset(div - k - 1);
                let inner = inset(div - k);
                [
                    Rect::new(outer.left, outer.top, outer.right, inner.top),
                    Rect::new(outer.left, inner.bottom, outer.right, outer.bottom),
                    Rect::new(outer.left, inner.top, inner.left, inner.bottom),
                    Rect::new(inner.right, inner.top, outer.right, inner.bottom),
                ]
            };
            (4, ordered(div, kind == ShowStyleType::IrisOut, ring))
        }
        _ => (1, Vec::new()),
    }
}

/// Flatten per-step groups, centre first when `from_centre`.
fn ordered<const N: usize>(div: i32, from_centre: bool, group: impl Fn(i32) -> [Rect; N]) -> Vec<Rect> {
    let steps: Vec<i32> = if from_centre {
        (0..div).collect()
    } else {
        (0..div).rev().collect()
    };
    steps.into_iter().flat_map(group).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(rects: &[Rect]) -> i32 {
        rects.iter().map(Rect::area).sum()
    }

    #[test]
    fn wipe_right_goes_left_to_right() {
        let (edges, rects) = block_rects(ShowStyleType::WipeRight, Rect::sized(100, 10), 4);
        assert_eq!(edges, 1);
        assert_eq!(rects[0], Rect::new(0, 0, 25, 10));
        assert_eq!(rects[3], Rect::new(75, 0, 100, 10));
    }

    #[test]
    fn wipe_up_starts_at_the_bottom() {
        let (_, rects) = block_rects(ShowStyleType::WipeUp, Rect::sized(10, 30), 3);
        assert_eq!(rects[0], Rect::new(0, 20, 10, 30));
        assert_eq!(rects[2], Rect::new(0, 0, 10, 10));
    }

    #[test]
    fn shutters_cover_the_area_without_overlap() {
        for kind in [
            ShowStyleType::HShutterOut,
            ShowStyleType::HShutterIn,
            ShowStyleType::VShutterOut,
            ShowStyleType::VShutterIn,
        ] {
            let (edges, rects) = block_rects(kind, Rect::sized(101, 51), 7);
            assert_eq!(edges, 2);
            assert_eq!(rects.len(), 14);
            assert_eq!(area(&rects), 101 * 51, "{kind:?}");
        }
    }

    #[test]
    fn shutter_out_opens_at_the_centre() {
        let (_, rects) = block_rects(ShowStyleType::HShutterOut, Rect::sized(100, 10), 5);
        assert_eq!(rects[0], Rect::new(40, 0, 50, 10));
        assert_eq!(rects[1], Rect::new(50, 0, 60, 10));
        let (_, rects) = block_rects(ShowStyleType::HShutterIn, Rect::sized(100, 10), 5);
        assert_eq!(rects[0], Rect::new(0, 0, 10, 10));
        assert_eq!(rects[1], Rect::new(90, 0, 100, 10));
    }

    #[test]
    fn iris_rings_tile_the_area() {
        let (edges, rects) = block_rects(ShowStyleType::IrisOut, Rect::sized(320, 200), 8);
        assert_eq!(edges, 4);
        assert_eq!(rects.len(), 32);
        assert_eq!(area(&rects), 320 * 200);

        // outermost ring comes first when closing in
        let (_, rects) = block_rects(ShowStyleType::IrisIn, Rect::sized(320, 200), 8);
        assert_eq!(rects[0], Rect::new(0, 0, 320, 12));
    }
}
