// Cel lookup: the compositor addresses sprite frames by reference and never
// sees resource files. Decoders implement `CelProvider`; `CelBank` is an
// in-memory implementation used by tools and tests.

use std::collections::HashMap;

use crate::geometry::{Point, Rect, SlotList};

/// Resource number of a view or picture.
pub type ResourceId = i32;

/// Handle of an engine-owned bitmap in a [`BitmapStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitmapId(pub u32);

/// What a screen item draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CelRef {
    View {
        view: ResourceId,
        loop_no: i32,
        cel_no: i32,
    },
    Pic {
        picture: ResourceId,
        cel_no: i32,
    },
    /// Engine-owned bitmap, already at screen resolution.
    Mem(BitmapId),
    /// Solid block of one colour.
    Color { color: u8, width: i32, height: i32 },
}

impl CelRef {
    pub fn is_pic(&self) -> bool {
        matches!(self, CelRef::Pic { .. })
    }

    /// Memory cels are not rescaled from script to screen space.
    pub fn is_screen_resolution(&self) -> bool {
        matches!(self, CelRef::Mem(_))
    }
}

/// Size and drawing attributes of a cel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CelMetrics {
    pub width: i32,
    pub height: i32,
    /// Hot spot, relative to the cel's top-left corner.
    pub origin: Point,
    /// Colour index that is never drawn.
    pub skip_color: u8,
    pub mirrored: bool,
    /// Cel contains remap colours and must be redrawn when remapping changes.
    pub remap: bool,
}

/// One cel of a picture resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PicCel {
    pub priority: i16,
    pub relative_position: Point,
}

/// Access to decoded view and picture resources.
pub trait CelProvider {
    fn loop_count(&self, view: ResourceId) -> Option<i32>;
    fn cel_count(&self, view: ResourceId, loop_no: i32) -> Option<i32>;
    fn picture_cels(&self, picture: ResourceId) -> Option<Vec<PicCel>>;
    /// Metrics of a view or picture cel.
    fn metrics(&self, cel: &CelRef) -> Option<CelMetrics>;
    /// Colour at cel-local `(x, y)`; `mirrored` flips the column.
    fn read_pixel(&self, cel: &CelRef, x: i32, y: i32, mirrored: bool) -> u8;
}

/// Raw indexed-colour image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: i32,
    pub height: i32,
    pub origin: Point,
    pub skip_color: u8,
    pub remap: bool,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: i32, height: i32, fill: u8, skip_color: u8) -> Self {
        Self {
            width,
            height,
            origin: Point::default(),
            skip_color,
            remap: false,
            pixels: vec![fill; (width.max(0) * height.max(0)) as usize],
        }
    }

    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> u8 {
        self.pixels[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: u8) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    pub fn rect(&self) -> Rect {
        Rect::sized(self.width, self.height)
    }

    fn metrics(&self) -> CelMetrics {
        CelMetrics {
            width: self.width,
            height: self.height,
            origin: self.origin,
            skip_color: self.skip_color,
            mirrored: false,
            remap: self.remap,
        }
    }
}

/// Bitmaps the engine allocates for itself (dissolve snapshots).
#[derive(Debug, Default)]
pub struct BitmapStore {
    slots: SlotList<Bitmap>,
}

impl BitmapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, bitmap: Bitmap) -> BitmapId {
        // Reuse the first hole so ids stay small across many transitions.
        if let Some(i) = (0..self.slots.len()).find(|&i| self.slots.get(i).is_none()) {
            self.slots.set(i, bitmap);
            return BitmapId(i as u32);
        }
        BitmapId(self.slots.add(bitmap) as u32)
    }

    pub fn free(&mut self, id: BitmapId) -> Option<Bitmap> {
        self.slots.erase_at(id.0 as usize)
    }

    pub fn get(&self, id: BitmapId) -> Option<&Bitmap> {
        self.slots.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: BitmapId) -> Option<&mut Bitmap> {
        self.slots.get_mut(id.0 as usize)
    }

    pub fn live(&self) -> usize {
        self.slots.live()
    }
}

/// Resolves any [`CelRef`] against both the resource provider and the
/// engine's own bitmaps.
#[derive(Clone, Copy)]
pub struct CelSource<'a> {
    pub provider: &'a dyn CelProvider,
    pub bitmaps: &'a BitmapStore,
}

impl<'a> CelSource<'a> {
    pub fn new(provider: &'a dyn CelProvider, bitmaps: &'a BitmapStore) -> Self {
        Self { provider, bitmaps }
    }

    pub fn metrics(&self, cel: &CelRef) -> Option<CelMetrics> {
        match cel {
            CelRef::View { .. } | CelRef::Pic { .. } => self.provider.metrics(cel),
            CelRef::Mem(id) => self.bitmaps.get(*id).map(Bitmap::metrics),
            CelRef::Color { width, height, .. } => Some(CelMetrics {
                width: *width,
                height: *height,
                origin: Point::default(),
                // a colour block never skips
                skip_color: 0,
                mirrored: false,
                remap: false,
            }),
        }
    }

    /// Colour at cel-local `(x, y)`, `None` for the skip colour.
    pub fn pixel(&self, cel: &CelRef, metrics: &CelMetrics, x: i32, y: i32, mirrored: bool) -> Option<u8> {
        let color = match cel {
            CelRef::View { .. } | CelRef::Pic { .. } => self.provider.read_pixel(cel, x, y, mirrored),
            CelRef::Mem(id) => {
                let bitmap = self.bitmaps.get(*id)?;
                let x = if mirrored { bitmap.width - 1 - x } else { x };
                bitmap.pixel(x, y)
            }
            CelRef::Color { color, .. } => return Some(*color),
        };
        (color != metrics.skip_color).then_some(color)
    }
}

/// Decoded cel held by a [`CelBank`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CelImage {
    pub width: i32,
    pub height: i32,
    pub origin: Point,
    pub skip_color: u8,
    pub remap: bool,
    pub pixels: Vec<u8>,
}

impl CelImage {
    /// Opaque rectangle of one colour with its origin at the top-left.
    pub fn solid(width: i32, height: i32, color: u8) -> Self {
        Self {
            width,
            height,
            origin: Point::default(),
            skip_color: 255,
            remap: false,
            pixels: vec![color; (width * height) as usize],
        }
    }

    fn metrics(&self) -> CelMetrics {
        CelMetrics {
            width: self.width,
            height: self.height,
            origin: self.origin,
            skip_color: self.skip_color,
            mirrored: false,
            remap: self.remap,
        }
    }
}

/// In-memory cel repository.
///
/// * Views are `loops × cels` grids of images.
/// * Pictures are ordered lists of cels with a priority and offset each.
#[derive(Debug, Default)]
pub struct CelBank {
    views: HashMap<ResourceId, Vec<Vec<CelImage>>>,
    pictures: HashMap<ResourceId, Vec<(PicCel, CelImage)>>,
}

impl CelBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_view(&mut self, view: ResourceId, loops: Vec<Vec<CelImage>>) {
        self.views.insert(view, loops);
    }

    pub fn insert_picture(&mut self, picture: ResourceId, cels: Vec<(PicCel, CelImage)>) {
        self.pictures.insert(picture, cels);
    }

    fn image(&self, cel: &CelRef) -> Option<&CelImage> {
        match *cel {
            CelRef::View {
                view,
                loop_no,
                cel_no,
            } => self
                .views
                .get(&view)?
                .get(usize::try_from(loop_no).ok()?)?
                .get(usize::try_from(cel_no).ok()?),
            CelRef::Pic { picture, cel_no } => self
                .pictures
                .get(&picture)?
                .get(usize::try_from(cel_no).ok()?)
                .map(|(_, img)| img),
            _ => None,
        }
    }
}

impl CelProvider for CelBank {
    fn loop_count(&self, view: ResourceId) -> Option<i32> {
        self.views.get(&view).map(|loops| loops.len() as i32)
    }

    fn cel_count(&self, view: ResourceId, loop_no: i32) -> Option<i32> {
        let loops = self.views.get(&view)?;
        loops
            .get(usize::try_from(loop_no).ok()?)
            .map(|cels| cels.len() as i32)
    }

    fn picture_cels(&self, picture: ResourceId) -> Option<Vec<PicCel>> {
        self.pictures
            .get(&picture)
            .map(|cels| cels.iter().map(|(info, _)| *info).collect())
    }

    fn metrics(&self, cel: &CelRef) -> Option<CelMetrics> {
        self.image(cel).map(CelImage::metrics)
    }

    fn read_pixel(&self, cel: &CelRef, x: i32, y: i32, mirrored: bool) -> u8 {
        match self.image(cel) {
            Some(img) => {
                let x = if mirrored { img.width - 1 - x } else { x };
                img.pixels[(y * img.width + x) as usize]
            }
            None => 0,
        }
    }
}
