//! Test doubles for the injected services.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::cel::{CelBank, CelImage, PicCel};
use crate::config::EngineConfig;
use crate::engine::{FrameOut, Services};
use crate::geometry::{Point, Rect};
use crate::renderer::{Clock, Display, Palette, PaletteService};
use crate::vm::{MemoryObjectStore, ObjectId, Selector};

/// Clock that only moves when told to; sleeping advances it.
#[derive(Debug, Default)]
pub struct ManualClock {
    pub now: u64,
    pub sleeps: Vec<u64>,
}

impl ManualClock {
    pub fn advance(&mut self, ms: u64) {
        self.now += ms;
    }
}

impl Clock for ManualClock {
    fn millis(&self) -> u64 {
        self.now
    }

    fn sleep(&mut self, ms: u64) {
        self.sleeps.push(ms);
        self.now += ms;
    }
}

/// Display that remembers what it was sent.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    /// `(x, y, w, h)` of every copied rectangle.
    pub blits: Vec<Rect>,
    pub painted: Vec<Vec<Rect>>,
    pub updates: usize,
}

impl Display for RecordingDisplay {
    fn copy_rect_to_screen(&mut self, buffer: &[u8], pitch: usize, x: i32, y: i32, w: i32, h: i32) {
        assert!(buffer.len() >= (h as usize - 1) * pitch + w as usize);
        self.blits.push(Rect::new(x, y, x + w, y + h));
    }

    fn update_screen(&mut self) {
        self.updates += 1;
    }

    fn begin_paint(&mut self, rects: &[Rect]) {
        self.painted.push(rects.to_vec());
    }
}

/// Palette that logs fades and answers remaps from a table.
#[derive(Debug, Default)]
pub struct RecordingPalette {
    /// `(percent, from, to)` of every `set_fade`.
    pub fades: Vec<(i16, u8, u8)>,
    pub remaps: HashMap<u8, u8>,
    pub remap_changed: bool,
    pub hardware_updates: usize,
}

impl PaletteService for RecordingPalette {
    fn set_fade(&mut self, percent: i16, from: u8, to: u8) {
        self.fades.push((percent, from, to));
    }

    fn submit(&mut self, _palette: &Palette) {}

    fn update_for_frame(&mut self) -> bool {
        std::mem::take(&mut self.remap_changed)
    }

    fn update_hardware(&mut self, _suppress_blit: bool) {
        self.hardware_updates += 1;
    }

    fn remap_count(&self) -> usize {
        self.remaps.len()
    }

    fn remap(&self, color: u8, _under: u8) -> Option<u8> {
        self.remaps.get(&color).copied()
    }
}

pub const VIEW: i32 = 100;
pub const REMAP_VIEW: i32 = 101;
pub const PICTURE: i32 = 200;

/// View 100: loop 0 holds a 10x10 cel of colour 5 and a 4x4 of colour 6.
/// View 101: one 10x10 cel of remap colour 20.
/// Picture 200: one full-screen cel of colour 3.
pub fn cel_bank() -> CelBank {
    let mut bank = CelBank::new();
    bank.insert_view(VIEW, vec![vec![CelImage::solid(10, 10, 5), CelImage::solid(4, 4, 6)]]);
    bank.insert_view(
        REMAP_VIEW,
        vec![vec![CelImage {
            remap: true,
            ..CelImage::solid(10, 10, 20)
        }]],
    );
    bank.insert_picture(
        PICTURE,
        vec![(
            PicCel {
                priority: 0,
                relative_position: Point::default(),
            },
            CelImage::solid(320, 200, 3),
        )],
    );
    bank
}

/// Compositor wired to recording services, throttling off.
pub struct Rig {
    pub frame: FrameOut,
    pub objects: MemoryObjectStore,
    pub display: Rc<RefCell<RecordingDisplay>>,
    pub palette: Rc<RefCell<RecordingPalette>>,
    pub clock: Rc<RefCell<ManualClock>>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(EngineConfig {
            throttle: false,
            ..EngineConfig::default()
        })
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let display = Rc::new(RefCell::new(RecordingDisplay::default()));
        let palette = Rc::new(RefCell::new(RecordingPalette::default()));
        let clock = Rc::new(RefCell::new(ManualClock::default()));
        let frame = FrameOut::new(
            config,
            Services {
                cels: Box::new(cel_bank()),
                palette: Box::new(palette.clone()),
                display: Box::new(display.clone()),
                clock: Box::new(clock.clone()),
            },
        );
        Self {
            frame,
            objects: MemoryObjectStore::new(),
            display,
            palette,
            clock,
        }
    }

    /// Full-screen plane object with the given picture id.
    pub fn plane_object(&mut self, id: u32, priority: i32, picture: i32, back: i32) -> ObjectId {
        let object = ObjectId(id);
        self.objects.set(
            object,
            &[
                (Selector::Priority, priority),
                (Selector::Picture, picture),
                (Selector::Back, back),
                (Selector::InLeft, 0),
                (Selector::InTop, 0),
                (Selector::InRight, 319),
                (Selector::InBottom, 199),
            ],
        );
        object
    }

    /// View-100 item at `(x, y)` on `plane`.
    pub fn item_object(&mut self, id: u32, plane: ObjectId, x: i32, y: i32, cel: i32) -> ObjectId {
        let object = ObjectId(id);
        self.objects.set(
            object,
            &[
                (Selector::Plane, plane.0 as i32),
                (Selector::X, x),
                (Selector::Y, y),
                (Selector::View, VIEW),
                (Selector::Loop, 0),
                (Selector::Cel, cel),
            ],
        );
        object
    }
}
