//! Plane scrolling: a new picture slides in from one side while
//! everything already on the plane slides out the other.

use crate::cel::ResourceId;
use crate::engine::GfxError;
use crate::engine::frameout::FrameOut;
use crate::geometry::Point;
use crate::vm::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub plane: ObjectId,
    pub dx: i32,
    pub dy: i32,
    pub picture: ResourceId,
    pub animate: bool,
    pub mirrored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneScroll {
    pub plane: ObjectId,
    /// Offset of the incoming picture from its final place.
    pub x: i32,
    pub y: i32,
    pub dx: i32,
    pub dy: i32,
    pub old_picture: ResourceId,
    pub new_picture: ResourceId,
    pub animate: bool,
    pub start_tick: u64,
}

#[derive(Debug, Default)]
pub struct Scrolls {
    entries: Vec<PlaneScroll>,
}

impl Scrolls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PlaneScroll] {
        &self.entries
    }

    /// Start a scroll. Non-animated scrolls run to completion here.
    pub fn set_scroll(&mut self, frame: &mut FrameOut, req: ScrollRequest) -> Result<(), GfxError> {
        let invalid = |reason| GfxError::InvalidScroll {
            plane: req.plane,
            reason,
        };
        if self.entries.iter().any(|s| s.plane == req.plane) {
            return Err(invalid("a scroll is already running on this plane"));
        }
        if req.dx != 0 && req.dy != 0 {
            return Err(invalid("scrolling on both axes"));
        }
        if req.dx == 0 && req.dy == 0 {
            return Err(invalid("no movement"));
        }

        let screen_count = frame.screen_count();
        let start_tick = frame.clock().ticks();
        let plane = frame
            .planes()
            .find(req.plane)
            .ok_or(GfxError::PlaneNotFound(req.plane))?;
        let game = plane.game_rect;
        let x = -req.dx.signum() * game.width();
        let y = -req.dy.signum() * game.height();

        let old_picture = {
            let (planes, cels, ids) = frame.pic_context();
            let plane = planes.find_mut(req.plane).ok_or(GfxError::PlaneNotFound(req.plane))?;
            plane.add_pic(req.picture, Point::new(x, y), req.mirrored, cels, ids, screen_count)?
        };
        log::debug!(
            "scroll on {}: picture {old_picture} -> {} by ({}, {})",
            req.plane,
            req.picture,
            req.dx,
            req.dy
        );

        let mut scroll = PlaneScroll {
            plane: req.plane,
            x,
            y,
            dx: req.dx,
            dy: req.dy,
            old_picture,
            new_picture: req.picture,
            animate: req.animate,
            start_tick,
        };

        if req.animate {
            self.entries.insert(0, scroll);
        } else {
            while !step(&mut scroll, frame)? {
                frame.frame_out(true, None);
                frame.transition_throttle();
            }
            frame.frame_out(true, None);
            frame.transition_throttle();
        }
        Ok(())
    }

    /// Advance every animated scroll by one step, dropping finished ones.
    pub fn process(&mut self, frame: &mut FrameOut) -> Result<(), GfxError> {
        let mut i = 0;
        while i < self.entries.len() {
            if step(&mut self.entries[i], frame)? {
                self.entries.remove(i);
            } else {
                i += 1;
            }
        }
        Ok(())
    }
}

/// One scroll step. Returns `true` when the new picture is in place.
fn step(scroll: &mut PlaneScroll, frame: &mut FrameOut) -> Result<bool, GfxError> {
    if scroll.start_tick >= frame.clock().ticks() {
        return Ok(false);
    }

    let mut dx = scroll.dx;
    let mut dy = scroll.dy;
    // never overshoot the resting place
    if (scroll.x + dx) * scroll.x <= 0 {
        dx = -scroll.x;
    }
    if (scroll.y + dy) * scroll.y <= 0 {
        dy = -scroll.y;
    }
    scroll.x += dx;
    scroll.y += dy;

    let screen_count = frame.screen_count();
    let plane = frame
        .planes_mut()
        .find_mut(scroll.plane)
        .ok_or(GfxError::PlaneNotFound(scroll.plane))?;

    let finished = scroll.x == 0 && scroll.y == 0;
    if finished {
        plane.replace_pic(scroll.old_picture, scroll.new_picture, screen_count);
    }
    plane.scroll_screen_items(dx, dy, true, screen_count);
    Ok(finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::plane::PIC_COLORED;
    use crate::testing::{PICTURE, Rig};
    use test_log::test;

    fn rig() -> (Rig, ObjectId) {
        let mut rig = Rig::new();
        let plane = rig.plane_object(1, 0, PIC_COLORED, 0);
        rig.frame.kernel_add_plane(&rig.objects, plane).unwrap();
        rig.frame.frame_out(true, None);
        (rig, plane)
    }

    fn request(plane: ObjectId, dx: i32, dy: i32, animate: bool) -> ScrollRequest {
        ScrollRequest {
            plane,
            dx,
            dy,
            picture: PICTURE,
            animate,
            mirrored: false,
        }
    }

    #[test]
    fn rejects_bad_requests() {
        let (mut rig, plane) = rig();
        let mut scrolls = Scrolls::new();
        for (dx, dy) in [(0, 0), (4, 4)] {
            let err = scrolls.set_scroll(&mut rig.frame, request(plane, dx, dy, true)).unwrap_err();
            assert!(matches!(err, GfxError::InvalidScroll { .. }));
        }
        scrolls.set_scroll(&mut rig.frame, request(plane, 40, 0, true)).unwrap();
        let err = scrolls.set_scroll(&mut rig.frame, request(plane, 40, 0, true)).unwrap_err();
        assert!(matches!(err, GfxError::InvalidScroll { .. }));
        assert_eq!(
            scrolls.set_scroll(&mut rig.frame, request(ObjectId(9), 40, 0, true)),
            Err(GfxError::PlaneNotFound(ObjectId(9)))
        );
    }

    #[test]
    fn animated_scroll_lands_exactly() {
        let (mut rig, plane) = rig();
        let mut scrolls = Scrolls::new();
        scrolls.set_scroll(&mut rig.frame, request(plane, 100, 0, true)).unwrap();
        assert_eq!(scrolls.entries()[0].x, -320);

        // nothing moves within the starting tick
        scrolls.process(&mut rig.frame).unwrap();
        assert_eq!(scrolls.entries()[0].x, -320);

        let mut offsets = Vec::new();
        while !scrolls.is_empty() {
            rig.clock.borrow_mut().advance(17);
            offsets.push(scrolls.entries()[0].x);
            scrolls.process(&mut rig.frame).unwrap();
            rig.frame.frame_out(true, None);
        }
        assert_eq!(offsets, vec![-320, -220, -120, -20]);

        let p = rig.frame.planes().find(plane).unwrap();
        assert_eq!(p.picture_id, PICTURE);
        let pic = p.items.iter().find(|i| i.cel.is_pic()).unwrap();
        assert_eq!(pic.position, Point::new(0, 0));
        assert_eq!(rig.frame.buffer().pixel(0, 0), 3);
    }

    #[test]
    fn instant_scroll_runs_to_completion() {
        let (mut rig, plane) = rig();
        let mut scrolls = Scrolls::new();
        scrolls.set_scroll(&mut rig.frame, request(plane, 0, -50, false)).unwrap();
        assert!(scrolls.is_empty());
        let p = rig.frame.planes().find(plane).unwrap();
        let pic = p.items.iter().find(|i| i.cel.is_pic()).unwrap();
        assert_eq!(pic.position, Point::new(0, 0));
        assert!(!rig.clock.borrow().sleeps.is_empty());
    }
}
