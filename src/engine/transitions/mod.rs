//! Show styles: timed transitions bound to a plane.
//!
//! Each entry steps through `divisions` stages, one every `delay` ticks
//! (or as fast as frames allow when not animated). Fades drive the palette,
//! wipes add or remove colour blocks, dissolves punch pixels out of an
//! overlay bitmap.

mod dissolve;
mod scroll;
mod wipe;

pub use dissolve::Dissolve;
pub use scroll::{PlaneScroll, ScrollRequest, Scrolls};
pub use wipe::{Blocks, block_rects};

use crate::config::{Era, TransitionTables};
use crate::engine::GfxError;
use crate::engine::frameout::FrameOut;
use crate::vm::ObjectId;

#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowStyleType {
    None = 0,
    HShutterOut = 1,
    HShutterIn = 2,
    VShutterOut = 3,
    VShutterIn = 4,
    WipeLeft = 5,
    WipeRight = 6,
    WipeUp = 7,
    WipeDown = 8,
    IrisOut = 9,
    IrisIn = 10,
    Morph11 = 11,
    Morph12 = 12,
    FadeOut = 13,
    FadeIn = 14,
    DissolveNoMorph = 15,
    Dissolve = 16,
}

impl TryFrom<i16> for ShowStyleType {
    type Error = GfxError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        use ShowStyleType::*;
        Ok(match value {
            0 => None,
            1 => HShutterOut,
            2 => HShutterIn,
            3 => VShutterOut,
            4 => VShutterIn,
            5 => WipeLeft,
            6 => WipeRight,
            7 => WipeUp,
            8 => WipeDown,
            9 => IrisOut,
            10 => IrisIn,
            11 => Morph11,
            12 => Morph12,
            13 => FadeOut,
            14 => FadeIn,
            15 => DissolveNoMorph,
            16 => Dissolve,
            other => return Err(GfxError::UnsupportedShowStyle(other)),
        })
    }
}

impl ShowStyleType {
    pub fn is_blocks(self) -> bool {
        (ShowStyleType::HShutterOut as i16..=ShowStyleType::IrisIn as i16).contains(&(self as i16))
    }
}

/// Arguments of a set-show-style call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowStyleRequest {
    pub plane: ObjectId,
    /// Numeric type, validated on use.
    pub kind: i16,
    pub seconds: i16,
    /// Colour to cover the plane with, `-1` to reveal it instead.
    pub back_color: i16,
    /// Priority of wipe blocks and dissolve overlays.
    pub priority: i16,
    pub animate: bool,
    pub frame_out_now: bool,
    /// `(from, to)` palette index pairs for fades; empty fades everything.
    pub fade_ranges: Vec<(u8, u8)>,
    /// Overrides the era's default step count.
    pub divisions: Option<i16>,
}

impl ShowStyleRequest {
    pub fn new(plane: ObjectId, kind: ShowStyleType, seconds: i16) -> Self {
        Self {
            plane,
            kind: kind as i16,
            seconds,
            back_color: -1,
            priority: i16::MAX,
            animate: true,
            frame_out_now: false,
            fade_ranges: Vec::new(),
            divisions: None,
        }
    }
}

#[derive(Debug, Clone)]
enum Effect {
    Fade { ranges: Vec<(u8, u8)> },
    Blocks(Blocks),
    Dissolve(Dissolve),
    Morph,
}

/// One running transition.
#[derive(Debug, Clone)]
pub struct PlaneShowStyle {
    pub plane: ObjectId,
    pub kind: ShowStyleType,
    pub divisions: i16,
    /// Ticks between steps.
    pub delay: u64,
    pub current_step: i16,
    pub next_tick: u64,
    /// Revealing the plane (as opposed to covering it).
    pub fade_up: bool,
    pub color: u8,
    pub animate: bool,
    pub processed: bool,
    /// Game-rect size when configured; early interpreters only reuse an
    /// entry for a plane of the same size.
    pub width: i32,
    pub height: i32,
    effect: Effect,
}

impl PlaneShowStyle {
    pub fn blocks(&self) -> Option<&Blocks> {
        match &self.effect {
            Effect::Blocks(b) => Some(b),
            _ => None,
        }
    }

    pub fn dissolve(&self) -> Option<&Dissolve> {
        match &self.effect {
            Effect::Dissolve(d) => Some(d),
            _ => None,
        }
    }

    fn release(&mut self, frame: &mut FrameOut) {
        match &mut self.effect {
            Effect::Blocks(b) => b.release(frame),
            Effect::Dissolve(d) => d.release(frame),
            Effect::Fade { .. } | Effect::Morph => {}
        }
    }
}

/// The active show styles, at most one per plane.
pub struct ShowStyles {
    tables: TransitionTables,
    entries: Vec<PlaneShowStyle>,
}

impl ShowStyles {
    pub fn new(tables: TransitionTables) -> Self {
        Self {
            tables,
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PlaneShowStyle] {
        &self.entries
    }

    pub fn find(&self, plane: ObjectId) -> Option<&PlaneShowStyle> {
        self.entries.iter().find(|e| e.plane == plane)
    }

    /// Start, restart or cancel the transition of a plane.
    pub fn set_show_style(&mut self, frame: &mut FrameOut, req: ShowStyleRequest) -> Result<(), GfxError> {
        let kind = ShowStyleType::try_from(req.kind)?;
        let game = frame
            .planes()
            .find(req.plane)
            .ok_or(GfxError::PlaneNotFound(req.plane))?
            .game_rect;

        let divisions = req
            .divisions
            .filter(|d| *d > 0)
            .unwrap_or(self.tables.default_divisions[kind as usize]);
        let delay = (req.seconds as i32 * 60 + divisions as i32 - 1) / divisions as i32;
        if kind != ShowStyleType::None && delay <= 0 {
            return Err(GfxError::NoDuration);
        }

        let (mut fade_up, mut color) = match req.back_color {
            -1 => (true, 0),
            c => (false, c as u8),
        };

        let mut reused = None;
        if let Some(idx) = self.entries.iter().position(|e| e.plane == req.plane) {
            let entry = &self.entries[idx];
            let same_size = self.tables.era != Era::Early || (entry.width == game.width() && entry.height == game.height());
            // a second style on the same plane always reveals
            fade_up = true;
            if same_size && entry.divisions == divisions {
                reused = Some(idx);
            } else {
                color = entry.color;
                let mut old = self.entries.remove(idx);
                old.release(frame);
                log::debug!("show style on {} replaced", req.plane);
            }
        }

        if kind == ShowStyleType::None {
            if let Some(idx) = reused {
                let mut old = self.entries.remove(idx);
                old.release(frame);
                log::debug!("show style on {} cancelled", req.plane);
            }
            if req.frame_out_now {
                frame.frame_out(true, None);
            }
            return Ok(());
        }

        if let Some(idx) = reused {
            self.entries[idx].release(frame);
        }

        let effect = match kind {
            k if k.is_blocks() => Effect::Blocks(Blocks::configure(
                frame,
                req.plane,
                k,
                divisions as i32,
                color,
                req.priority,
                fade_up,
            )?),
            ShowStyleType::DissolveNoMorph | ShowStyleType::Dissolve => Effect::Dissolve(Dissolve::configure(
                frame,
                &self.tables,
                req.plane,
                divisions as i32,
                color,
                req.priority,
                fade_up,
            )?),
            ShowStyleType::FadeOut | ShowStyleType::FadeIn => Effect::Fade {
                ranges: req.fade_ranges.clone(),
            },
            _ => Effect::Morph,
        };

        let entry = PlaneShowStyle {
            plane: req.plane,
            kind,
            divisions,
            delay: delay as u64,
            current_step: 0,
            next_tick: frame.clock().ticks(),
            fade_up,
            color,
            animate: req.animate,
            processed: false,
            width: game.width(),
            height: game.height(),
            effect,
        };
        log::debug!(
            "show style {:?} on {}: {} steps of {} ticks, {}",
            kind,
            req.plane,
            divisions,
            delay,
            if fade_up { "revealing" } else { "covering" }
        );

        match reused {
            Some(idx) => self.entries[idx] = entry,
            None => self.entries.push(entry),
        }

        if req.frame_out_now {
            frame.frame_out(true, None);
        }
        Ok(())
    }

    /// Step every due entry and put the result on screen.
    ///
    /// Non-animated entries are run back to back, one forced frame per
    /// pass, until every entry has stepped as far as it can.
    pub fn process(&mut self, frame: &mut FrameOut) -> Result<(), GfxError> {
        let mut forced = false;

        loop {
            let now = frame.clock().ticks();
            let mut continue_processing = false;
            let mut do_frame_out = false;

            let mut i = 0;
            while i < self.entries.len() {
                if !self.entries[i].animate {
                    do_frame_out = true;
                }
                let finished = step_entry(&mut self.entries[i], frame, now)?;
                if !finished {
                    continue_processing = true;
                }
                if finished && self.entries[i].processed {
                    let mut done = self.entries.remove(i);
                    done.release(frame);
                    log::debug!("show style {:?} on {} finished", done.kind, done.plane);
                } else {
                    i += 1;
                }
            }

            if do_frame_out {
                frame.frame_out(true, None);
                frame.transition_throttle();
                forced = true;
            }
            if !(continue_processing && do_frame_out) {
                break;
            }
        }

        if !forced {
            frame.frame_out(true, None);
        }
        Ok(())
    }
}

/// Advance one entry. Returns `true` once it has run all its steps.
fn step_entry(entry: &mut PlaneShowStyle, frame: &mut FrameOut, now: u64) -> Result<bool, GfxError> {
    if entry.next_tick >= now && entry.animate {
        return Ok(false);
    }

    let divisions = entry.divisions;
    match &mut entry.effect {
        Effect::Morph => {
            frame.palette_morph_frame_out();
            entry.processed = true;
            return Ok(true);
        }
        Effect::Fade { ranges } => {
            let reveal = entry.kind == ShowStyleType::FadeIn;
            if entry.current_step < divisions {
                let level = if reveal {
                    entry.current_step
                } else {
                    divisions - entry.current_step - 1
                };
                let percent = (level as i32 * 100 / (divisions as i32 - 1).max(1)) as i16;
                let palette = frame.palette_mut();
                if ranges.is_empty() {
                    palette.set_fade(percent, 0, 255);
                } else {
                    for &(from, to) in ranges.iter() {
                        palette.set_fade(percent, from, to);
                    }
                }
                entry.current_step += 1;
                entry.next_tick += entry.delay;
            }
            let finished = entry.current_step >= divisions;
            if finished && reveal {
                entry.processed = true;
            }
            return Ok(finished);
        }
        Effect::Blocks(blocks) => {
            if entry.current_step < divisions {
                blocks.step(frame, entry.current_step as i32, divisions as i32, entry.fade_up)?;
                entry.current_step += 1;
                entry.next_tick += entry.delay;
            }
        }
        Effect::Dissolve(dissolve) => {
            if entry.current_step < divisions {
                let done = dissolve.step(frame, entry.current_step + 1 >= divisions);
                entry.current_step = if done { divisions } else { entry.current_step + 1 };
                entry.next_tick += entry.delay;
            }
        }
    }

    let finished = entry.current_step >= divisions;
    if finished && entry.fade_up {
        entry.processed = true;
    }
    Ok(finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::plane::PIC_COLORED;
    use crate::geometry::Rect;
    use crate::testing::Rig;
    use test_log::test;

    fn rig() -> (Rig, ObjectId, ShowStyles) {
        let mut rig = Rig::new();
        let plane = rig.plane_object(1, 0, PIC_COLORED, 0);
        rig.frame.kernel_add_plane(&rig.objects, plane).unwrap();
        rig.frame.frame_out(true, None);
        let styles = ShowStyles::new(rig.frame.config().tables());
        (rig, plane, styles)
    }

    fn percents(rig: &Rig) -> Vec<i16> {
        rig.palette.borrow().fades.iter().map(|f| f.0).collect()
    }

    #[test]
    fn fade_in_percent_sequence_and_completion() {
        let (mut rig, plane, mut styles) = rig();
        let mut req = ShowStyleRequest::new(plane, ShowStyleType::FadeIn, 1);
        req.divisions = Some(5);
        styles.set_show_style(&mut rig.frame, req).unwrap();
        assert_eq!(styles.entries()[0].delay, 12);

        for _ in 0..4 {
            rig.clock.borrow_mut().advance(200);
            styles.process(&mut rig.frame).unwrap();
        }
        assert_eq!(styles.entries()[0].current_step, 4);
        assert!(!styles.entries()[0].processed);

        rig.clock.borrow_mut().advance(200);
        styles.process(&mut rig.frame).unwrap();
        assert!(styles.is_empty(), "processed when the step count is reached");
        assert_eq!(percents(&rig), vec![0, 25, 50, 75, 100]);
    }

    #[test]
    fn fade_percents_truncate() {
        let (mut rig, plane, mut styles) = rig();
        let mut req = ShowStyleRequest::new(plane, ShowStyleType::FadeIn, 1);
        req.divisions = Some(4);
        req.animate = false;
        styles.set_show_style(&mut rig.frame, req).unwrap();
        styles.process(&mut rig.frame).unwrap();
        assert_eq!(percents(&rig), vec![0, 33, 66, 100]);
        assert!(styles.is_empty());
    }

    #[test]
    fn fade_out_runs_backwards_and_stays() {
        let (mut rig, plane, mut styles) = rig();
        let mut req = ShowStyleRequest::new(plane, ShowStyleType::FadeOut, 1);
        req.divisions = Some(4);
        req.animate = false;
        req.fade_ranges = vec![(0, 15), (32, 47)];
        styles.set_show_style(&mut rig.frame, req).unwrap();
        styles.process(&mut rig.frame).unwrap();

        let fades = rig.palette.borrow().fades.clone();
        assert_eq!(fades.len(), 8);
        assert_eq!(fades[0], (100, 0, 15));
        assert_eq!(fades[1], (100, 32, 47));
        assert_eq!(fades[7], (0, 32, 47));
        let entry = &styles.entries()[0];
        assert_eq!(entry.current_step, 4);
        assert!(!entry.processed);
    }

    #[test]
    fn zero_duration_is_rejected_before_anything_changes() {
        let (mut rig, plane, mut styles) = rig();
        let mut req = ShowStyleRequest::new(plane, ShowStyleType::WipeLeft, 0);
        assert_eq!(styles.set_show_style(&mut rig.frame, req.clone()), Err(GfxError::NoDuration));
        assert!(styles.is_empty());
        assert_eq!(rig.frame.planes().find(plane).unwrap().items.live(), 0);

        req.kind = 17;
        req.seconds = 1;
        assert_eq!(
            styles.set_show_style(&mut rig.frame, req),
            Err(GfxError::UnsupportedShowStyle(17))
        );
    }

    #[test]
    fn wipe_reveal_removes_blocks() {
        let (mut rig, plane, mut styles) = rig();
        let mut req = ShowStyleRequest::new(plane, ShowStyleType::WipeRight, 1);
        req.divisions = Some(4);
        req.animate = false;
        styles.set_show_style(&mut rig.frame, req).unwrap();

        assert_eq!(styles.entries()[0].blocks().unwrap().shown(), 4);
        assert_eq!(rig.frame.planes().find(plane).unwrap().items.live(), 4);

        styles.process(&mut rig.frame).unwrap();
        assert!(styles.is_empty());
        assert_eq!(rig.frame.planes().find(plane).unwrap().items.live(), 0);
    }

    #[test]
    fn wipe_cover_fills_the_plane() {
        let (mut rig, plane, mut styles) = rig();
        let mut req = ShowStyleRequest::new(plane, ShowStyleType::IrisIn, 1);
        req.divisions = Some(5);
        req.back_color = 7;
        req.animate = false;
        styles.set_show_style(&mut rig.frame, req).unwrap();
        assert_eq!(styles.entries()[0].blocks().unwrap().shown(), 0);

        styles.process(&mut rig.frame).unwrap();
        let entry = &styles.entries()[0];
        assert!(!entry.processed);
        let (_, rects) = block_rects(ShowStyleType::IrisIn, Rect::sized(320, 200), 5);
        let solid = rects.iter().filter(|r| !r.is_empty()).count();
        assert_eq!(entry.blocks().unwrap().shown(), solid);
        for (x, y) in [(0, 0), (160, 100), (319, 199), (5, 150)] {
            assert_eq!(rig.frame.buffer().pixel(x, y), 7, "({x}, {y})");
        }

        // the next style on the plane reveals and takes the blocks away
        let mut req = ShowStyleRequest::new(plane, ShowStyleType::None, 0);
        req.frame_out_now = true;
        styles.set_show_style(&mut rig.frame, req).unwrap();
        assert!(styles.is_empty());
        rig.frame.frame_out(true, None);
        assert_eq!(rig.frame.planes().find(plane).unwrap().items.live(), 0);
        assert_eq!(rig.frame.buffer().pixel(160, 100), 0);
    }

    #[test]
    fn restyling_a_plane_reuses_a_compatible_entry() {
        let (mut rig, plane, mut styles) = rig();
        let mut req = ShowStyleRequest::new(plane, ShowStyleType::WipeDown, 1);
        req.divisions = Some(4);
        req.back_color = 7;
        req.animate = false;
        styles.set_show_style(&mut rig.frame, req.clone()).unwrap();
        styles.process(&mut rig.frame).unwrap();
        assert_eq!(styles.entries()[0].current_step, 4);

        styles.set_show_style(&mut rig.frame, req).unwrap();
        let entry = &styles.entries()[0];
        assert_eq!(styles.entries().len(), 1);
        assert_eq!(entry.current_step, 0);
        assert!(entry.fade_up);
        assert_eq!(entry.blocks().unwrap().shown(), 4);
    }

    #[test]
    fn dissolve_reveal_frees_its_bitmap() {
        let (mut rig, plane, mut styles) = rig();
        let mut req = ShowStyleRequest::new(plane, ShowStyleType::Dissolve, 1);
        req.animate = false;
        styles.set_show_style(&mut rig.frame, req).unwrap();
        assert_eq!(rig.frame.bitmaps().live(), 1);

        styles.process(&mut rig.frame).unwrap();
        assert!(styles.is_empty());
        assert_eq!(rig.frame.bitmaps().live(), 0);
        rig.frame.frame_out(true, None);
        assert_eq!(rig.frame.planes().find(plane).unwrap().items.live(), 0);
    }

    #[test]
    fn dissolve_cover_ends_fully_coloured() {
        let (mut rig, plane, mut styles) = rig();
        let mut req = ShowStyleRequest::new(plane, ShowStyleType::DissolveNoMorph, 1);
        req.back_color = 9;
        req.animate = false;
        styles.set_show_style(&mut rig.frame, req).unwrap();
        styles.process(&mut rig.frame).unwrap();

        assert_eq!(styles.entries().len(), 1);
        for (x, y) in [(0, 0), (1, 0), (160, 100), (319, 199)] {
            assert_eq!(rig.frame.buffer().pixel(x, y), 9, "({x}, {y})");
        }
    }

    #[test]
    fn forced_frames_stop_once_animated_entries_finish() {
        let (mut rig, fading, mut styles) = rig();
        let covered = rig.plane_object(2, 1, PIC_COLORED, 0);
        rig.frame.kernel_add_plane(&rig.objects, covered).unwrap();
        rig.frame.frame_out(true, None);

        let mut fade = ShowStyleRequest::new(fading, ShowStyleType::FadeIn, 1);
        fade.divisions = Some(5);
        styles.set_show_style(&mut rig.frame, fade).unwrap();

        let mut wipe = ShowStyleRequest::new(covered, ShowStyleType::WipeDown, 1);
        wipe.divisions = Some(4);
        wipe.back_color = 7;
        wipe.animate = false;
        styles.set_show_style(&mut rig.frame, wipe).unwrap();

        styles.process(&mut rig.frame).unwrap();

        // the fade ran to the end on throttled frames; the cover stays
        assert_eq!(percents(&rig), vec![0, 25, 50, 75, 100]);
        assert_eq!(styles.entries().len(), 1);
        assert_eq!(styles.entries()[0].plane, covered);
        assert_eq!(styles.entries()[0].current_step, 4);
        assert!(rig.clock.borrow().sleeps.len() < 100);
    }

    #[test]
    fn early_era_divisions() {
        let mut rig = Rig::with_config(EngineConfig {
            era: Era::Early,
            throttle: false,
            ..EngineConfig::default()
        });
        let plane = rig.plane_object(1, 0, PIC_COLORED, 0);
        rig.frame.kernel_add_plane(&rig.objects, plane).unwrap();
        let mut styles = ShowStyles::new(rig.frame.config().tables());
        styles
            .set_show_style(&mut rig.frame, ShowStyleRequest::new(plane, ShowStyleType::WipeLeft, 2))
            .unwrap();
        let entry = &styles.entries()[0];
        assert_eq!(entry.divisions, 10);
        assert_eq!(entry.delay, 12);
    }
}
