use crate::config::EngineConfig;
use crate::engine::GfxError;
use crate::engine::frameout::{FrameOut, Services};
use crate::engine::transitions::{ScrollRequest, Scrolls, ShowStyleRequest, ShowStyles};
use crate::vm::{ObjectId, ObjectStore};

/// The kernel-facing graphics subsystem: compositor plus the transition
/// engines that drive it.
pub struct Graphics {
    frame: FrameOut,
    show_styles: ShowStyles,
    scrolls: Scrolls,
}

impl Graphics {
    pub fn new(config: EngineConfig, services: Services) -> Self {
        let tables = config.tables();
        Self {
            frame: FrameOut::new(config, services),
            show_styles: ShowStyles::new(tables),
            scrolls: Scrolls::new(),
        }
    }

    pub fn frame(&self) -> &FrameOut {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut FrameOut {
        &mut self.frame
    }

    pub fn show_styles(&self) -> &ShowStyles {
        &self.show_styles
    }

    pub fn scrolls(&self) -> &Scrolls {
        &self.scrolls
    }

    /*──────────────────────── kernel calls ────────────────────────*/

    pub fn kernel_add_plane(&mut self, objects: &dyn ObjectStore, object: ObjectId) -> Result<(), GfxError> {
        self.frame.kernel_add_plane(objects, object)
    }

    pub fn kernel_update_plane(&mut self, objects: &dyn ObjectStore, object: ObjectId) -> Result<(), GfxError> {
        self.frame.kernel_update_plane(objects, object)
    }

    pub fn kernel_delete_plane(&mut self, object: ObjectId) -> Result<(), GfxError> {
        self.frame.kernel_delete_plane(object)
    }

    pub fn kernel_add_screen_item(&mut self, objects: &mut dyn ObjectStore, object: ObjectId) -> Result<(), GfxError> {
        self.frame.kernel_add_screen_item(objects, object)
    }

    pub fn kernel_update_screen_item(&mut self, objects: &mut dyn ObjectStore, object: ObjectId) -> Result<(), GfxError> {
        self.frame.kernel_update_screen_item(objects, object)
    }

    pub fn kernel_delete_screen_item(&mut self, objects: &dyn ObjectStore, object: ObjectId) -> Result<(), GfxError> {
        self.frame.kernel_delete_screen_item(objects, object)
    }

    pub fn kernel_set_show_style(&mut self, req: ShowStyleRequest) -> Result<(), GfxError> {
        self.show_styles.set_show_style(&mut self.frame, req)
    }

    pub fn kernel_set_scroll(&mut self, req: ScrollRequest) -> Result<(), GfxError> {
        self.scrolls.set_scroll(&mut self.frame, req)
    }

    /// One game frame: run pending transitions (which do their own frame
    /// output) or scrolls, then throttle.
    pub fn kernel_frame_out(&mut self, show_bits: bool) -> Result<(), GfxError> {
        if !self.show_styles.is_empty() {
            self.show_styles.process(&mut self.frame)?;
        } else {
            if !self.scrolls.is_empty() {
                self.scrolls.process(&mut self.frame)?;
            }
            self.frame.frame_out(show_bits, None);
        }
        self.frame.throttle();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::plane::PIC_COLORED;
    use crate::engine::transitions::ShowStyleType;
    use crate::testing::{RecordingDisplay, RecordingPalette, ManualClock, cel_bank};
    use crate::vm::{MemoryObjectStore, Selector};
    use std::cell::RefCell;
    use std::rc::Rc;
    use test_log::test;

    struct Setup {
        gfx: Graphics,
        objects: MemoryObjectStore,
        clock: Rc<RefCell<ManualClock>>,
        palette: Rc<RefCell<RecordingPalette>>,
    }

    fn setup(throttle: bool) -> Setup {
        let clock = Rc::new(RefCell::new(ManualClock::default()));
        let palette = Rc::new(RefCell::new(RecordingPalette::default()));
        let gfx = Graphics::new(
            EngineConfig {
                throttle,
                ..EngineConfig::default()
            },
            Services {
                cels: Box::new(cel_bank()),
                palette: Box::new(palette.clone()),
                display: Box::new(RecordingDisplay::default()),
                clock: Box::new(clock.clone()),
            },
        );
        let mut objects = MemoryObjectStore::new();
        objects.set(
            ObjectId(1),
            &[
                (Selector::Picture, PIC_COLORED),
                (Selector::InRight, 319),
                (Selector::InBottom, 199),
            ],
        );
        Setup {
            gfx,
            objects,
            clock,
            palette,
        }
    }

    #[test]
    fn frames_are_throttled_to_sixty_hertz() {
        let mut s = setup(true);
        s.gfx.kernel_add_plane(&s.objects, ObjectId(1)).unwrap();
        for _ in 0..4 {
            s.gfx.kernel_frame_out(true).unwrap();
        }
        assert_eq!(s.clock.borrow().sleeps, vec![17, 16, 17]);
    }

    #[test]
    fn show_style_replaces_the_plain_frame() {
        let mut s = setup(false);
        s.gfx.kernel_add_plane(&s.objects, ObjectId(1)).unwrap();
        s.gfx.kernel_frame_out(true).unwrap();

        let mut req = ShowStyleRequest::new(ObjectId(1), ShowStyleType::FadeIn, 1);
        req.divisions = Some(3);
        s.gfx.kernel_set_show_style(req).unwrap();
        assert!(!s.gfx.show_styles().is_empty());

        for _ in 0..3 {
            s.clock.borrow_mut().advance(400);
            s.gfx.kernel_frame_out(true).unwrap();
        }
        assert!(s.gfx.show_styles().is_empty());
        let percents: Vec<i16> = s.palette.borrow().fades.iter().map(|f| f.0).collect();
        assert_eq!(percents, vec![0, 50, 100]);
    }
}
