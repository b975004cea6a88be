//! One positioned cel inside a plane.

use crate::cel::{CelMetrics, CelProvider, CelRef, CelSource, ResourceId};
use crate::config::CelClampPolicy;
use crate::defs::ScaleSignals;
use crate::engine::GfxError;
use crate::geometry::{Point, Ratio, Rect, mulinc};
use crate::renderer::CelBlit;
use crate::vm::{ObjectId, ObjectStore, Selector};

/// 100 % in scale selectors.
pub const SCALE_UNITY: i32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleInfo {
    pub x: i32,
    pub y: i32,
    pub max: i32,
    pub signal: ScaleSignals,
}

impl Default for ScaleInfo {
    fn default() -> Self {
        Self {
            x: SCALE_UNITY,
            y: SCALE_UNITY,
            max: 100,
            signal: ScaleSignals::empty(),
        }
    }
}

impl ScaleInfo {
    fn ratios(&self) -> (Ratio, Ratio) {
        if self.signal.is_empty() {
            (Ratio::ONE, Ratio::ONE)
        } else {
            (
                Ratio::new(self.x, SCALE_UNITY),
                Ratio::new(self.y, SCALE_UNITY),
            )
        }
    }
}

/// Geometry of the owning plane, copied out so an item can be updated
/// while the plane's item list is borrowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaneFrame {
    pub game_rect: Rect,
    pub plane_rect: Rect,
    pub screen_rect: Rect,
    pub vanishing_point: Point,
}

/// What `calc_rects` needs beyond the plane.
pub struct RectContext<'a> {
    pub cels: CelSource<'a>,
    /// Script-to-screen ratios.
    pub ratio_x: Ratio,
    pub ratio_y: Ratio,
}

/// Engine-side settings that shape `set_from_object`.
#[derive(Debug, Clone, Copy)]
pub struct ItemRules {
    pub clamp_policy: CelClampPolicy,
    pub script_width: i32,
}

#[derive(Debug, Clone)]
pub struct ScreenItem {
    pub object: ObjectId,
    pub plane: ObjectId,
    pub creation_id: u32,
    pub cel: CelRef,
    /// Picture this item was materialised from, if any.
    pub picture: Option<ResourceId>,
    pub position: Point,
    pub z: i32,
    pub priority: i16,
    pub fixed_priority: bool,
    pub scale: ScaleInfo,
    pub mirrored: bool,
    /// Cel-relative clip rectangle in script coordinates.
    pub inset_rect: Option<Rect>,

    /// Clipped on-screen rectangle.
    pub screen_rect: Rect,
    /// Where the whole scaled cel lands on screen.
    pub target_rect: Rect,
    now_seen: Rect,
    metrics: Option<CelMetrics>,

    pub created: u8,
    pub updated: u8,
    pub deleted: u8,
}

impl ScreenItem {
    pub fn new(
        object: ObjectId,
        plane: ObjectId,
        cel: CelRef,
        position: Point,
        creation_id: u32,
        screen_count: u8,
    ) -> Self {
        Self {
            object,
            plane,
            creation_id,
            cel,
            picture: None,
            position,
            z: 0,
            priority: 0,
            fixed_priority: false,
            scale: ScaleInfo::default(),
            mirrored: false,
            inset_rect: None,
            screen_rect: Rect::default(),
            target_rect: Rect::default(),
            now_seen: Rect::default(),
            metrics: None,
            created: screen_count,
            updated: 0,
            deleted: 0,
        }
    }

    /// Build an item from its script object.
    pub fn from_object(
        objects: &mut dyn ObjectStore,
        object: ObjectId,
        plane: ObjectId,
        frame: &PlaneFrame,
        cels: &dyn CelProvider,
        rules: ItemRules,
        creation_id: u32,
        screen_count: u8,
    ) -> Result<Self, GfxError> {
        let mut item = ScreenItem::new(
            object,
            plane,
            CelRef::View {
                view: -1,
                loop_no: -1,
                cel_no: -1,
            },
            Point::default(),
            creation_id,
            screen_count,
        );
        item.set_from_object(objects, frame, cels, rules, true)?;
        Ok(item)
    }

    /// Re-read the object after the script changed it.
    pub fn update(
        &mut self,
        objects: &mut dyn ObjectStore,
        frame: &PlaneFrame,
        cels: &dyn CelProvider,
        rules: ItemRules,
        screen_count: u8,
    ) -> Result<(), GfxError> {
        let view = objects.read(self.object, Selector::View);
        let loop_no = objects.read(self.object, Selector::Loop);
        let cel_no = objects.read(self.object, Selector::Cel);
        let update_cel = self.cel
            != CelRef::View {
                view,
                loop_no,
                cel_no,
            };
        self.set_from_object(objects, frame, cels, rules, update_cel)?;
        if self.created == 0 {
            self.updated = screen_count;
        }
        self.deleted = 0;
        Ok(())
    }

    fn set_from_object(
        &mut self,
        objects: &mut dyn ObjectStore,
        frame: &PlaneFrame,
        cels: &dyn CelProvider,
        rules: ItemRules,
        update_cel: bool,
    ) -> Result<(), GfxError> {
        let obj = self.object;
        let x = objects.read(obj, Selector::X);
        let y = objects.read(obj, Selector::Y);
        self.scale = ScaleInfo {
            x: objects.read(obj, Selector::ScaleX),
            y: objects.read(obj, Selector::ScaleY),
            max: objects.read(obj, Selector::MaxScale),
            signal: ScaleSignals::from_property(objects.read(obj, Selector::ScaleSignal)),
        };

        if update_cel {
            let view = objects.read(obj, Selector::View);
            let mut loop_no = objects.read(obj, Selector::Loop);
            let mut cel_no = objects.read(obj, Selector::Cel);

            let loop_count = cels.loop_count(view).ok_or(GfxError::ResourceNotFound {
                kind: "view",
                id: view,
            })?;
            let (fixed, persist) = clamp_index(loop_no, loop_count, rules.clamp_policy);
            if fixed != loop_no {
                log::warn!("{obj}: loop {loop_no} out of range for view {view}, using {fixed}");
            }
            loop_no = fixed;
            if let Some(v) = persist {
                objects.write(obj, Selector::Loop, v);
            }

            let cel_count = cels.cel_count(view, loop_no).unwrap_or(0);
            let (fixed, persist) = clamp_index(cel_no, cel_count, rules.clamp_policy);
            if fixed != cel_no {
                log::warn!("{obj}: cel {cel_no} out of range for view {view} loop {loop_no}, using {fixed}");
            }
            cel_no = fixed;
            if let Some(v) = persist {
                objects.write(obj, Selector::Cel, v);
            }

            self.cel = CelRef::View {
                view,
                loop_no,
                cel_no,
            };
        }

        if objects.read(obj, Selector::FixPriority) != 0 {
            self.fixed_priority = true;
            self.priority = objects.read(obj, Selector::Priority) as i16;
        } else {
            self.fixed_priority = false;
        }

        self.z = objects.read(obj, Selector::Z);
        self.position = Point::new(x, y - self.z);
        self.mirrored = objects.read(obj, Selector::Mirrored) != 0;

        self.inset_rect = (objects.read(obj, Selector::UseInsetRect) != 0).then(|| {
            Rect::new(
                objects.read(obj, Selector::InLeft),
                objects.read(obj, Selector::InTop),
                objects.read(obj, Selector::InRight) + 1,
                objects.read(obj, Selector::InBottom) + 1,
            )
        });

        if self.scale.signal.contains(ScaleSignals::VANISHING_POINT) {
            // width, not height: content is tuned against this
            let port = rules.script_width - frame.vanishing_point.y;
            if port == 0 {
                log::warn!("{obj}: vanishing point on the horizon, scale left unchanged");
            } else {
                let scale = self.scale.max * (y - frame.vanishing_point.y) / port;
                self.scale.x = scale;
                self.scale.y = scale;
                objects.write(obj, Selector::ScaleX, scale);
                objects.write(obj, Selector::ScaleY, scale);
            }
        }

        Ok(())
    }

    /// Resolve the cel and compute the item's screen rectangle inside the
    /// plane described by `frame`.
    pub fn calc_rects(&mut self, frame: &PlaneFrame, ctx: &RectContext<'_>) {
        let Some(metrics) = ctx.cels.metrics(&self.cel) else {
            log::error!("{}: cannot resolve {:?}", self.object, self.cel);
            self.metrics = None;
            self.screen_rect = Rect::default();
            self.target_rect = Rect::default();
            self.now_seen = Rect::default();
            return;
        };
        self.metrics = Some(metrics);

        if !self.fixed_priority {
            self.priority = (self.position.y + self.z) as i16;
        }

        let mirrored = self.mirrored ^ metrics.mirrored;
        let origin_x = if mirrored {
            metrics.width - 1 - metrics.origin.x
        } else {
            metrics.origin.x
        };

        if self.cel.is_screen_resolution() {
            let mut target = Rect::new(0, 0, metrics.width, metrics.height);
            target.translate(
                self.position.x - origin_x + frame.plane_rect.left,
                self.position.y - metrics.origin.y + frame.plane_rect.top,
            );
            self.target_rect = target;
            self.screen_rect = target;
            self.screen_rect.clip(&frame.screen_rect);

            let mut seen = target;
            seen.translate(-frame.plane_rect.left, -frame.plane_rect.top);
            seen.left = ctx.ratio_x.invert(seen.left);
            seen.right = ctx.ratio_x.invert(seen.right);
            seen.top = ctx.ratio_y.invert(seen.top);
            seen.bottom = ctx.ratio_y.invert(seen.bottom);
            self.now_seen = seen;
            return;
        }

        let (sx, sy) = self.scale.ratios();
        let width = sx.apply(metrics.width);
        let height = sy.apply(metrics.height);
        let mut script = Rect::new(0, 0, width, height);
        script.translate(
            self.position.x - sx.apply(origin_x),
            self.position.y - sy.apply(metrics.origin.y),
        );

        let mut visible = script;
        if let Some(inset) = self.inset_rect {
            visible.clip(&inset.translated(script.left, script.top));
        }
        self.now_seen = visible;

        let to_screen = |mut r: Rect| {
            r.translate(frame.game_rect.left, frame.game_rect.top);
            if !r.is_empty() && !(ctx.ratio_x.is_one() && ctx.ratio_y.is_one()) {
                mulinc(&mut r, ctx.ratio_x, ctx.ratio_y);
            }
            r
        };

        self.target_rect = to_screen(script);
        self.screen_rect = to_screen(visible);
        self.screen_rect.clip(&frame.screen_rect);
    }

    /// Unclipped item rectangle in script coordinates, as of the last
    /// `calc_rects`.
    pub fn now_seen(&self) -> Rect {
        self.now_seen
    }

    pub fn metrics(&self) -> Option<&CelMetrics> {
        self.metrics.as_ref()
    }

    /// Cel carries remap colours.
    pub fn has_remap(&self) -> bool {
        self.metrics.is_some_and(|m| m.remap)
    }

    /// Draw-order key: priority, then age.
    #[inline]
    pub fn sort_key(&self) -> (i16, u32) {
        (self.priority, self.creation_id)
    }

    /// Parameters for drawing this item, once its rectangles are known.
    pub fn blit(&self) -> Option<CelBlit> {
        let metrics = self.metrics?;
        Some(CelBlit {
            cel: self.cel,
            metrics,
            target: self.target_rect,
            mirrored: self.mirrored ^ metrics.mirrored,
            priority: self.priority,
        })
    }

    /// True when none of the lifecycle counters is running.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

/// Bring a loop or cel number into `0..count`.
///
/// Returns the index to use and, when the object must be corrected too,
/// the value to write back.
pub fn clamp_index(value: i32, count: i32, policy: CelClampPolicy) -> (i32, Option<i32>) {
    if (0..count).contains(&value) || count <= 0 {
        return (value.clamp(0, count.max(1) - 1), None);
    }
    let last = count - 1;
    match policy {
        CelClampPolicy::WrapHighKeepNegative if value >= count => (0, Some(0)),
        CelClampPolicy::WrapHighKeepNegative => (last, None),
        CelClampPolicy::ClampToLast => (last, Some(last)),
    }
}
