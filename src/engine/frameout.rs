//! Frame compositor: owns the plane lists, turns them into draw and erase
//! lists each frame, renders those into the buffer and blits what changed.

use crate::cel::{BitmapStore, CelProvider, CelRef, CelSource};
use crate::config::EngineConfig;
use crate::engine::GfxError;
use crate::engine::draw_list::{DrawList, sort_draw_list};
use crate::engine::plane::{IdSource, ListContext, Plane, PlaneType};
use crate::engine::plane_list::PlaneList;
use crate::engine::screen_item::{ItemRules, RectContext, ScreenItem};
use crate::engine::throttle::Throttler;
use crate::geometry::{Ratio, Rect, RectList, merge_to_show_list, split_rects};
use crate::renderer::{Buffer, Clock, Display, PaletteService};
use crate::vm::{ObjectId, ObjectStore, Selector};

fn is_benchmark(benchmark_view: Option<i32>, cel: &CelRef) -> bool {
    matches!((benchmark_view, cel), (Some(b), CelRef::View { view, .. }) if b == *view)
}

/// Collaborators the compositor is built with.
pub struct Services {
    pub cels: Box<dyn CelProvider>,
    pub palette: Box<dyn PaletteService>,
    pub display: Box<dyn Display>,
    pub clock: Box<dyn Clock>,
}

pub struct FrameOut {
    config: EngineConfig,
    screen_rect: Rect,
    ratio_x: Ratio,
    ratio_y: Ratio,

    planes: PlaneList,
    visible_planes: PlaneList,
    buffer: Buffer,
    show_list: RectList,
    bitmaps: BitmapStore,
    ids: IdSource,

    cels: Box<dyn CelProvider>,
    palette: Box<dyn PaletteService>,
    display: Box<dyn Display>,
    clock: Box<dyn Clock>,

    throttler: Throttler,
    throttle_enabled: bool,
    remap_occurred: bool,

    last_draw_lists: Vec<DrawList>,
    last_erase_lists: Vec<RectList>,
}

impl FrameOut {
    pub fn new(config: EngineConfig, services: Services) -> Self {
        let Services {
            cels,
            palette,
            display,
            clock,
        } = services;
        Self {
            screen_rect: Rect::sized(config.screen_width, config.screen_height),
            ratio_x: Ratio::new(config.screen_width, config.script_width),
            ratio_y: Ratio::new(config.screen_height, config.script_height),
            planes: PlaneList::new(),
            visible_planes: PlaneList::new(),
            buffer: Buffer::new(config.screen_width, config.screen_height),
            show_list: RectList::new(),
            bitmaps: BitmapStore::new(),
            ids: IdSource::default(),
            cels,
            palette,
            display,
            clock,
            throttler: Throttler::new(),
            throttle_enabled: config.throttle,
            remap_occurred: false,
            last_draw_lists: Vec::new(),
            last_erase_lists: Vec::new(),
            config,
        }
    }

    /*──────────────────────── accessors ────────────────────────*/

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn screen_count(&self) -> u8 {
        self.config.screen_count
    }

    pub fn screen_rect(&self) -> Rect {
        self.screen_rect
    }

    pub fn planes(&self) -> &PlaneList {
        &self.planes
    }

    pub fn planes_mut(&mut self) -> &mut PlaneList {
        &mut self.planes
    }

    pub fn visible_planes(&self) -> &PlaneList {
        &self.visible_planes
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn bitmaps(&self) -> &BitmapStore {
        &self.bitmaps
    }

    pub fn bitmaps_mut(&mut self) -> &mut BitmapStore {
        &mut self.bitmaps
    }

    pub fn ids_mut(&mut self) -> &mut IdSource {
        &mut self.ids
    }

    pub fn cels(&self) -> &dyn CelProvider {
        &*self.cels
    }

    /// What picture changes on a plane need, borrowed together.
    pub fn pic_context(&mut self) -> (&mut PlaneList, &dyn CelProvider, &mut IdSource) {
        (&mut self.planes, &*self.cels, &mut self.ids)
    }

    pub fn palette_mut(&mut self) -> &mut dyn PaletteService {
        &mut *self.palette
    }

    pub fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    pub fn throttle_enabled(&self) -> bool {
        self.throttle_enabled
    }

    /// Draw lists of the last frame, one per plane in plane order.
    pub fn last_draw_lists(&self) -> &[DrawList] {
        &self.last_draw_lists
    }

    pub fn last_erase_lists(&self) -> &[RectList] {
        &self.last_erase_lists
    }

    fn item_rules(&self) -> ItemRules {
        ItemRules {
            clamp_policy: self.config.clamp_policy,
            script_width: self.config.script_width,
        }
    }

    /*──────────────────────── planes ────────────────────────*/

    pub fn kernel_add_plane(&mut self, objects: &dyn ObjectStore, object: ObjectId) -> Result<(), GfxError> {
        if let Some(plane) = self.planes.find_mut(object) {
            plane.update(objects);
            return self.update_plane(object);
        }
        let plane = Plane::from_object(objects, object, self.ids.next_creation(), self.screen_count());
        self.add_plane(plane)
    }

    pub fn kernel_update_plane(&mut self, objects: &dyn ObjectStore, object: ObjectId) -> Result<(), GfxError> {
        let plane = self.planes.find_mut(object).ok_or(GfxError::PlaneNotFound(object))?;
        plane.update(objects);
        self.update_plane(object)
    }

    pub fn kernel_delete_plane(&mut self, object: ObjectId) -> Result<(), GfxError> {
        self.delete_plane(object)
    }

    /// Insert a new plane, or revive one that is still pending deletion.
    pub fn add_plane(&mut self, mut plane: Plane) -> Result<(), GfxError> {
        let screen_count = self.screen_count();
        if let Some(existing) = self.planes.find_mut(plane.object) {
            existing.deleted = 0;
            if existing.created == 0 {
                existing.moved = screen_count;
            }
            self.planes.sort();
            return Ok(());
        }

        plane.sync(
            None,
            &self.screen_rect,
            (self.ratio_x, self.ratio_y),
            &*self.cels,
            &mut self.ids,
            screen_count,
        )?;
        log::debug!("plane {} added ({:?}, priority {})", plane.object, plane.kind, plane.priority);
        self.planes.add(plane);
        Ok(())
    }

    /// Re-sync a plane whose properties changed.
    pub fn update_plane(&mut self, object: ObjectId) -> Result<(), GfxError> {
        let screen_count = self.screen_count();
        let plane = self.planes.find_mut(object).ok_or(GfxError::PlaneNotFound(object))?;
        let visible = self.visible_planes.find(object);
        plane.sync(
            visible,
            &self.screen_rect,
            (self.ratio_x, self.ratio_y),
            &*self.cels,
            &mut self.ids,
            screen_count,
        )?;
        self.planes.sort();
        Ok(())
    }

    pub fn delete_plane(&mut self, object: ObjectId) -> Result<(), GfxError> {
        let screen_count = self.screen_count();
        let plane = self.planes.find_mut(object).ok_or(GfxError::PlaneNotFound(object))?;
        if plane.created > 0 {
            self.planes.remove(object);
            log::debug!("plane {object} removed before it was shown");
        } else {
            plane.moved = 0;
            plane.updated = 0;
            plane.deleted = screen_count;
        }
        Ok(())
    }

    /// Schedule a full redraw of every plane.
    pub fn redraw_all_planes(&mut self) {
        let screen_count = self.screen_count();
        for plane in self.planes.iter_mut() {
            plane.redraw_all_count = screen_count;
        }
    }

    /// Frame for the palette-morph show styles. No morph tables are
    /// loaded, so this repaints everything against the current palette.
    pub fn palette_morph_frame_out(&mut self) {
        self.redraw_all_planes();
        self.frame_out(true, None);
    }

    /*──────────────────────── screen items ────────────────────────*/

    pub fn kernel_add_screen_item(&mut self, objects: &mut dyn ObjectStore, object: ObjectId) -> Result<(), GfxError> {
        let plane_object = ObjectId(objects.read(object, Selector::Plane) as u32);
        let screen_count = self.screen_count();
        let rules = self.item_rules();
        let plane = self
            .planes
            .find_mut(plane_object)
            .ok_or(GfxError::PlaneNotFound(plane_object))?;
        let frame = plane.frame();

        if let Some(item) = plane.find_item_mut(object) {
            return item.update(objects, &frame, &*self.cels, rules, screen_count);
        }

        let item = ScreenItem::from_object(
            objects,
            object,
            plane_object,
            &frame,
            &*self.cels,
            rules,
            self.ids.next_creation(),
            screen_count,
        )?;
        if is_benchmark(self.config.benchmark_view, &item.cel) {
            log::debug!("benchmark view on screen, frame throttling suspended");
            self.throttle_enabled = false;
        }
        plane.add_screen_item(item);
        Ok(())
    }

    pub fn kernel_update_screen_item(&mut self, objects: &mut dyn ObjectStore, object: ObjectId) -> Result<(), GfxError> {
        let plane_object = ObjectId(objects.read(object, Selector::Plane) as u32);
        let screen_count = self.screen_count();
        let rules = self.item_rules();
        let plane = self
            .planes
            .find_mut(plane_object)
            .ok_or(GfxError::PlaneNotFound(plane_object))?;
        let frame = plane.frame();
        let item = plane.find_item_mut(object).ok_or(GfxError::ScreenItemNotFound {
            plane: plane_object,
            item: object,
        })?;
        item.update(objects, &frame, &*self.cels, rules, screen_count)
    }

    /// Unknown planes and items are ignored; scripts delete defensively.
    pub fn kernel_delete_screen_item(&mut self, objects: &dyn ObjectStore, object: ObjectId) -> Result<(), GfxError> {
        let plane_object = ObjectId(objects.read(object, Selector::Plane) as u32);
        let benchmark = self
            .planes
            .find(plane_object)
            .and_then(|p| p.find_item(object))
            .is_some_and(|item| is_benchmark(self.config.benchmark_view, &item.cel));
        match self.delete_screen_item(plane_object, object) {
            Ok(()) => {
                if benchmark {
                    self.throttle_enabled = self.config.throttle;
                }
                Ok(())
            }
            Err(GfxError::PlaneNotFound(_) | GfxError::ScreenItemNotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Add an engine-made item to its plane.
    pub fn add_screen_item(&mut self, item: ScreenItem) -> Result<(), GfxError> {
        let plane = self.planes.find_mut(item.plane).ok_or(GfxError::PlaneNotFound(item.plane))?;
        plane.add_screen_item(item);
        Ok(())
    }

    /// Delete an item: one that was already shown is erased over the next
    /// frame, one that never was just disappears.
    pub fn delete_screen_item(&mut self, plane_object: ObjectId, object: ObjectId) -> Result<(), GfxError> {
        let screen_count = self.screen_count();
        let plane = self
            .planes
            .find_mut(plane_object)
            .ok_or(GfxError::PlaneNotFound(plane_object))?;
        let item = plane.find_item_mut(object).ok_or(GfxError::ScreenItemNotFound {
            plane: plane_object,
            item: object,
        })?;
        if item.created == 0 {
            item.updated = 0;
            item.deleted = screen_count;
        } else {
            plane.remove_screen_item(object);
        }
        Ok(())
    }

    /// Item rectangle in script coordinates as of the last frame.
    pub fn now_seen(&self, plane_object: ObjectId, object: ObjectId) -> Result<Rect, GfxError> {
        let plane = self.planes.find(plane_object).ok_or(GfxError::PlaneNotFound(plane_object))?;
        plane
            .find_item(object)
            .map(ScreenItem::now_seen)
            .ok_or(GfxError::ScreenItemNotFound {
                plane: plane_object,
                item: object,
            })
    }

    /*──────────────────────── frame ────────────────────────*/

    /// Compute, render and (optionally) show one frame. `erase_rect` forces
    /// an extra area to be redrawn.
    pub fn frame_out(&mut self, show_bits: bool, erase_rect: Option<Rect>) {
        if self.palette.remap_count() > 0 && self.remap_occurred {
            for plane in self.planes.iter_mut() {
                plane.remap_mark_redraw();
            }
        }

        let (mut draw_lists, erase_lists) = self.calc_lists(erase_rect);
        for list in &mut draw_lists {
            sort_draw_list(list);
        }

        self.remap_occurred = self.palette.update_for_frame();

        for (idx, plane) in self.planes.iter().enumerate() {
            // erase
            for rect in erase_lists[idx].iter() {
                merge_to_show_list(*rect, &mut self.show_list, self.config.overdraw_threshold);
                if plane.kind == PlaneType::Colored {
                    self.buffer.fill_rect(rect, plane.back_color);
                }
            }

            // draw
            let draw_list = &draw_lists[idx];
            for entry in draw_list.iter() {
                self.buffer.reset_priority(&entry.rect);
            }
            let source = CelSource::new(&*self.cels, &self.bitmaps);
            for entry in draw_list.iter() {
                let Some(blit) = plane.find_item(entry.item).and_then(ScreenItem::blit) else {
                    log::warn!("plane {}: nothing to draw for {}", plane.object, entry.item);
                    continue;
                };
                merge_to_show_list(entry.rect, &mut self.show_list, self.config.overdraw_threshold);
                self.buffer.draw_cel(&source, &blit, &entry.rect, &*self.palette);
            }
        }

        self.palette.update_hardware(!show_bits);

        if show_bits {
            self.show_bits();
        }

        self.last_draw_lists = draw_lists;
        self.last_erase_lists = erase_lists;
    }

    /// Blit the show list to the display, left/right rounded to even
    /// columns.
    pub fn show_bits(&mut self) {
        if self.show_list.live() == 0 {
            self.display.update_screen();
            return;
        }

        let rounded: Vec<Rect> = self
            .show_list
            .iter()
            .map(|r| {
                let mut r = Rect::new(r.left & !1, r.top, (r.right + 1) & !1, r.bottom);
                r.clip(&self.screen_rect);
                r
            })
            .filter(|r| !r.is_empty())
            .collect();

        self.display.begin_paint(&rounded);
        let pitch = self.buffer.pitch();
        for r in &rounded {
            self.display.copy_rect_to_screen(
                self.buffer.slice_from(r.left, r.top),
                pitch,
                r.left,
                r.top,
                r.width(),
                r.height(),
            );
        }
        self.display.done_painting();

        log::trace!("showed {} rects", rounded.len());
        self.show_list.clear();
        self.display.update_screen();
    }

    /// Sleep out the rest of the 60 fps frame budget.
    pub fn throttle(&mut self) {
        if self.throttle_enabled {
            self.throttler.frame(&mut *self.clock);
        }
    }

    /// Pause between forced transition frames.
    pub fn transition_throttle(&mut self) {
        let ms = self.config.transition_throttle_ms as u64;
        self.throttler.wait(&mut *self.clock, ms);
    }

    /*──────────────────────── list computation ────────────────────────*/

    /// Global list pass: route erase rectangles of deleted, moved and
    /// re-prioritised planes, then diff every plane and absorb the erase
    /// lists of transparent planes.
    fn calc_lists(&mut self, erase_rect: Option<Rect>) -> (Vec<DrawList>, Vec<RectList>) {
        let mut plane_count = self.planes.len();
        let mut draw_lists: Vec<DrawList> = (0..plane_count).map(|_| DrawList::new()).collect();
        let mut erase_lists: Vec<RectList> = (0..plane_count).map(|_| RectList::new()).collect();

        let mut erase_list = RectList::new();
        let mut deleted_count = 0;
        let mut added_to_erase_list = false;
        let mut found_transparent = false;

        if let Some(r) = erase_rect.filter(|r| !r.is_empty()) {
            erase_list.add(r);
            added_to_erase_list = true;
        }

        for outer in 0..plane_count {
            let Some(outer_plane) = self.planes.get(outer) else {
                continue;
            };
            let visible = self.visible_planes.find(outer_plane.object);

            if outer_plane.kind.is_transparent() {
                found_transparent = true;
            }

            if outer_plane.deleted > 0 {
                if let Some(v) = visible.filter(|v| !v.screen_rect.is_empty()) {
                    erase_list.add(v.screen_rect);
                    added_to_erase_list = true;
                }
                deleted_count += 1;
            } else if let Some(v) = visible.filter(|_| outer_plane.moved > 0) {
                match split_rects(v.screen_rect, &outer_plane.screen_rect) {
                    None if !v.screen_rect.is_empty() => {
                        erase_list.add(v.screen_rect);
                        added_to_erase_list = true;
                    }
                    Some(parts) if !parts.is_empty() => {
                        for part in parts {
                            erase_list.add(part);
                        }
                        added_to_erase_list = true;
                    }
                    _ => {}
                }

                if outer_plane.redraw_all_count == 0 {
                    if let Some(parts) = split_rects(outer_plane.screen_rect, &v.screen_rect) {
                        for part in parts {
                            erase_lists[outer].add(part);
                        }
                    }
                }
            }

            if added_to_erase_list {
                let mut i = 0;
                while i < erase_list.len() {
                    if let Some(&rect) = erase_list.get(i) {
                        for inner in (0..plane_count).rev() {
                            let Some(inner_plane) = self.planes.get(inner) else {
                                continue;
                            };
                            if inner_plane.deleted == 0
                                && !inner_plane.kind.is_transparent()
                                && inner_plane.screen_rect.intersects(&rect)
                            {
                                if inner_plane.redraw_all_count == 0 {
                                    erase_lists[inner].add(inner_plane.screen_rect.intersection(&rect));
                                }
                                if let Some(parts) = split_rects(rect, &inner_plane.screen_rect) {
                                    for part in parts {
                                        erase_list.add(part);
                                    }
                                }
                                erase_list.erase_at(i);
                                break;
                            }
                        }
                    }
                    i += 1;
                }
                erase_list.pack();
            }
        }

        if deleted_count > 0 {
            for idx in (0..plane_count).rev() {
                let Some(plane) = self.planes.get_mut(idx) else {
                    continue;
                };
                if plane.deleted == 0 {
                    continue;
                }
                plane.deleted -= 1;
                if plane.deleted == 0 {
                    let object = plane.object;
                    self.visible_planes.remove(object);
                    self.planes.remove_at(idx);
                    draw_lists.remove(idx);
                    erase_lists.remove(idx);
                    log::debug!("plane {object} deleted");
                }
                deleted_count -= 1;
                if deleted_count == 0 {
                    break;
                }
            }
        }

        plane_count = self.planes.len();

        for outer in 0..plane_count {
            let Some(outer_plane) = self.planes.get_mut(outer) else {
                continue;
            };
            if outer_plane.priority_changed == 0 {
                continue;
            }
            outer_plane.priority_changed -= 1;
            let outer_plane = outer_plane.clone();

            let Some(visible_outer) = self.visible_planes.find(outer_plane.object) else {
                log::warn!("calc_lists: no visible plane for {}", outer_plane.object);
                continue;
            };
            let visible_outer_priority = visible_outer.priority as i32;
            erase_list.add(outer_plane.screen_rect.intersection(&visible_outer.screen_rect));

            for inner in (0..plane_count).rev() {
                let Some(inner_plane) = self.planes.get(inner) else {
                    continue;
                };
                let visible_inner = self.visible_planes.find(inner_plane.object);
                // same priority, or relative order of the two planes flipped
                let flipped = visible_inner.is_some_and(|vi| {
                    (visible_outer_priority - vi.priority as i32)
                        * (outer_plane.priority as i32 - inner_plane.priority as i32)
                        <= 0
                });
                let target = if outer_plane.priority <= inner_plane.priority {
                    inner
                } else {
                    outer
                };

                let rect_count = erase_list.len();
                for ri in 0..rect_count {
                    let Some(&rect) = erase_list.get(ri) else {
                        continue;
                    };
                    match split_rects(rect, &inner_plane.screen_rect) {
                        None => {}
                        Some(parts) if parts.is_empty() => {
                            if flipped {
                                erase_lists[target].add(rect);
                            }
                            erase_list.erase_at(ri);
                        }
                        Some(parts) => {
                            for part in parts {
                                erase_list.add(part);
                            }
                            if flipped {
                                erase_lists[target]
                                    .add(outer_plane.screen_rect.intersection(&inner_plane.screen_rect));
                            }
                            erase_list.erase_at(ri);
                        }
                    }
                }
                erase_list.pack();
            }
        }

        let ctx = ListContext {
            rects: RectContext {
                cels: CelSource::new(&*self.cels, &self.bitmaps),
                ratio_x: self.ratio_x,
                ratio_y: self.ratio_y,
            },
            remap_active: self.palette.remap_count() > 0,
            high_res_pictures: self.config.high_res_pictures,
        };

        for idx in 0..plane_count {
            let occluders = self.planes.occluders_above(idx);
            let Some(plane) = self.planes.get_mut(idx) else {
                continue;
            };
            let object = plane.object;

            {
                let visible = self.visible_planes.find_mut(object);
                if plane.screen_rect.is_empty() {
                    plane.decrement_item_counts(visible, false);
                } else if plane.redraw_all_count > 0 {
                    plane.redraw_all(visible, &occluders, &mut draw_lists[idx], &mut erase_lists[idx], &ctx);
                } else {
                    let Some(visible) = visible else {
                        panic!("missing visible plane for source plane {object}");
                    };
                    plane.calc_lists(visible, &occluders, &mut draw_lists[idx], &mut erase_lists[idx], &ctx);
                }
            }

            plane.moved = plane.moved.saturating_sub(1);

            if plane.created > 0 {
                plane.created -= 1;
                match self.visible_planes.find_mut(object) {
                    Some(visible) => visible.assign_properties(plane),
                    None => self.visible_planes.add(plane.clone()),
                }
            } else if plane.updated > 0 {
                plane.updated -= 1;
                if let Some(visible) = self.visible_planes.find_mut(object) {
                    visible.assign_properties(plane);
                }
            }

            log::trace!(
                "plane {object}: {} draw, {} erase",
                draw_lists[idx].live(),
                erase_lists[idx].live()
            );
        }

        if found_transparent {
            for idx in 0..plane_count {
                for i in idx + 1..plane_count {
                    if let Some(upper) = self.planes.get(i).filter(|p| p.kind.is_transparent()) {
                        upper.filter_up_erase_rects(&mut draw_lists[i], &erase_lists[idx]);
                    }
                }

                if let Some(plane) = self.planes.get(idx).filter(|p| p.kind.is_transparent()) {
                    for i in (0..idx).rev() {
                        let (lower, higher) = erase_lists.split_at_mut(idx);
                        if let Some(below) = self.planes.get(i) {
                            below.filter_down_erase_rects(&mut draw_lists[i], &mut lower[i], &mut higher[0]);
                        }
                    }
                    if erase_lists[idx].live() > 0 {
                        panic!("transparent plane {}'s erase list not absorbed", plane.object);
                    }
                }

                for i in idx + 1..plane_count {
                    if let Some(upper) = self.planes.get(i).filter(|p| p.kind.is_transparent()) {
                        let (lower, higher) = draw_lists.split_at_mut(i);
                        upper.filter_up_draw_rects(&mut higher[0], &lower[idx]);
                    }
                }
            }
        }

        (draw_lists, erase_lists)
    }
}
