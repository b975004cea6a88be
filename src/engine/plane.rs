//! Planes: depth-sorted layers of screen items, and the per-plane half of
//! the dirty-rectangle computation.

use crate::cel::{CelProvider, CelRef, ResourceId};
use crate::engine::GfxError;
use crate::engine::draw_list::{DrawItem, DrawList, break_draw_list, break_rect_list};
use crate::engine::screen_item::{PlaneFrame, RectContext, ScreenItem};
use crate::geometry::{Point, Ratio, Rect, RectList, SlotList, merge_to_rect_list, mulru_rect, split_rects};
use crate::vm::{ObjectId, ObjectStore, Selector};

pub const PIC_TRANSPARENT_PICTURE: i32 = -4;
pub const PIC_OPAQUE: i32 = -3;
pub const PIC_COLORED: i32 = -2;
pub const PIC_TRANSPARENT: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneType {
    /// Erased with the back colour.
    Colored,
    /// Covered by the cels of a picture resource.
    Picture,
    /// Lets lower planes show through.
    Transparent,
    /// Never erased; its items are expected to cover it.
    Opaque,
    TransparentPicture,
}

impl PlaneType {
    pub fn is_transparent(self) -> bool {
        matches!(self, PlaneType::Transparent | PlaneType::TransparentPicture)
    }
}

/// Hands out creation ids and ids for engine-made objects.
#[derive(Debug, Default)]
pub struct IdSource {
    creation: u32,
    synthetic: u32,
}

impl IdSource {
    pub fn next_creation(&mut self) -> u32 {
        self.creation += 1;
        self.creation
    }

    pub fn next_synthetic(&mut self) -> ObjectId {
        self.synthetic += 1;
        ObjectId::synthetic(self.synthetic)
    }
}

/// Per-frame inputs of [`Plane::calc_lists`] and [`Plane::redraw_all`].
pub struct ListContext<'a> {
    pub rects: RectContext<'a>,
    /// Palette remapping is active.
    pub remap_active: bool,
    /// Alternate picture/sprite redraw order. No shipped game enables it.
    pub high_res_pictures: bool,
}

#[derive(Debug, Clone)]
pub struct Plane {
    pub object: ObjectId,
    pub creation_id: u32,
    pub kind: PlaneType,
    /// Picture number or one of the `PIC_*` codes.
    pub picture_id: i32,
    pub picture_changed: bool,
    pub priority: i16,
    /// Script coordinates, exclusive right/bottom.
    pub game_rect: Rect,
    /// `game_rect` in screen coordinates.
    pub plane_rect: Rect,
    /// `plane_rect` clipped to the screen.
    pub screen_rect: Rect,
    pub back_color: u8,
    pub mirrored: bool,
    pub vanishing_point: Point,
    pub items: SlotList<ScreenItem>,

    pub created: u8,
    pub updated: u8,
    pub deleted: u8,
    pub moved: u8,
    pub priority_changed: u8,
    pub redraw_all_count: u8,
}

impl Plane {
    pub fn new(object: ObjectId, creation_id: u32, game_rect: Rect, picture_id: i32, screen_count: u8) -> Self {
        Self {
            object,
            creation_id,
            kind: type_for_picture(picture_id, PlaneType::Colored),
            picture_id,
            picture_changed: true,
            priority: 0,
            game_rect,
            plane_rect: game_rect,
            screen_rect: game_rect,
            back_color: 0,
            mirrored: false,
            vanishing_point: Point::default(),
            items: SlotList::new(),
            created: screen_count,
            updated: 0,
            deleted: 0,
            moved: 0,
            priority_changed: 0,
            redraw_all_count: screen_count,
        }
    }

    /// Build a plane from its script object.
    pub fn from_object(objects: &dyn ObjectStore, object: ObjectId, creation_id: u32, screen_count: u8) -> Self {
        let mut plane = Plane::new(object, creation_id, Rect::default(), PIC_COLORED, screen_count);
        plane.update(objects);
        plane.picture_changed = true;
        plane
    }

    /// Re-read plane properties from the object.
    pub fn update(&mut self, objects: &dyn ObjectStore) {
        let obj = self.object;
        self.vanishing_point = Point::new(
            objects.read(obj, Selector::VanishingX),
            objects.read(obj, Selector::VanishingY),
        );
        self.game_rect = Rect::new(
            objects.read(obj, Selector::InLeft),
            objects.read(obj, Selector::InTop),
            objects.read(obj, Selector::InRight) + 1,
            objects.read(obj, Selector::InBottom) + 1,
        );
        self.priority = objects.read(obj, Selector::Priority) as i16;
        let picture_id = objects.read(obj, Selector::Picture);
        if picture_id != self.picture_id {
            self.picture_id = picture_id;
            self.picture_changed = true;
        }
        self.mirrored = objects.read(obj, Selector::Mirrored) != 0;
        self.back_color = objects.read(obj, Selector::Back) as u8;
    }

    pub fn frame(&self) -> PlaneFrame {
        PlaneFrame {
            game_rect: self.game_rect,
            plane_rect: self.plane_rect,
            screen_rect: self.screen_rect,
            vanishing_point: self.vanishing_point,
        }
    }

    /// Sort key of the plane list.
    #[inline]
    pub fn sort_key(&self) -> (i16, u32) {
        (self.priority, self.creation_id)
    }

    pub fn convert_game_rect_to_plane_rect(&mut self, ratio_x: Ratio, ratio_y: Ratio) {
        self.plane_rect = self.game_rect;
        if !self.plane_rect.is_empty() {
            mulru_rect(&mut self.plane_rect, ratio_x, ratio_y, 1);
        }
    }

    pub fn clip_screen_rect(&mut self, screen: &Rect) {
        if self.screen_rect.intersects(screen) {
            self.screen_rect.clip(screen);
        } else {
            self.screen_rect = Rect::default();
        }
    }

    /// Copy everything but the items, as the visible snapshot does when
    /// its plane is updated.
    pub fn assign_properties(&mut self, from: &Plane) {
        let items = std::mem::take(&mut self.items);
        *self = Plane {
            items: SlotList::new(),
            ..from.clone()
        };
        self.items = items;
    }

    fn set_type(&mut self) {
        self.kind = type_for_picture(self.picture_id, self.kind);
    }

    /// Compare against the visible snapshot and set the lifecycle counters
    /// that drive the next `calc_lists`.
    pub fn sync(
        &mut self,
        other: Option<&Plane>,
        screen: &Rect,
        ratios: (Ratio, Ratio),
        cels: &dyn CelProvider,
        ids: &mut IdSource,
        screen_count: u8,
    ) -> Result<(), GfxError> {
        self.convert_game_rect_to_plane_rect(ratios.0, ratios.1);
        match other {
            None => {
                if self.picture_changed {
                    self.delete_all_pics(screen_count);
                    self.set_type();
                    self.change_pic(cels, ids, screen_count)?;
                    self.redraw_all_count = screen_count;
                } else {
                    self.set_type();
                }
            }
            Some(other) => {
                let (now, was) = (self.plane_rect, other.plane_rect);
                if now.top != was.top || now.left != was.left || now.right > was.right || now.bottom > was.bottom {
                    // moved or grew
                    self.redraw_all_count = screen_count;
                    self.moved = screen_count;
                } else if now != was {
                    self.moved = screen_count;
                }

                if self.priority != other.priority {
                    self.priority_changed = screen_count;
                }

                if self.picture_id != other.picture_id || self.mirrored != other.mirrored || self.picture_changed {
                    self.delete_all_pics(screen_count);
                    self.set_type();
                    self.change_pic(cels, ids, screen_count)?;
                    self.redraw_all_count = screen_count;
                }

                if self.back_color != other.back_color {
                    self.redraw_all_count = screen_count;
                }
            }
        }

        self.deleted = 0;
        if self.created == 0 {
            self.updated = screen_count;
        }

        self.screen_rect = self.plane_rect;
        self.clip_screen_rect(screen);
        Ok(())
    }

    /*──────────────────────── pictures ────────────────────────*/

    fn change_pic(&mut self, cels: &dyn CelProvider, ids: &mut IdSource, screen_count: u8) -> Result<(), GfxError> {
        self.picture_changed = false;
        if self.kind != PlaneType::Picture || self.picture_id < 0 {
            return Ok(());
        }
        self.add_pic_internal(self.picture_id, None, self.mirrored, cels, ids, screen_count)
    }

    fn add_pic_internal(
        &mut self,
        picture: ResourceId,
        position: Option<Point>,
        mirrored: bool,
        cels: &dyn CelProvider,
        ids: &mut IdSource,
        screen_count: u8,
    ) -> Result<(), GfxError> {
        let pic_cels = cels.picture_cels(picture).ok_or(GfxError::ResourceNotFound {
            kind: "picture",
            id: picture,
        })?;
        let origin = position.unwrap_or_default();
        for (cel_no, info) in pic_cels.iter().enumerate() {
            let mut item = ScreenItem::new(
                ids.next_synthetic(),
                self.object,
                CelRef::Pic {
                    picture,
                    cel_no: cel_no as i32,
                },
                origin + info.relative_position,
                ids.next_creation(),
                screen_count,
            );
            item.picture = Some(picture);
            item.mirrored = mirrored;
            item.priority = info.priority;
            item.fixed_priority = true;
            self.items.add(item);
        }
        log::debug!("{}: added picture {picture} ({} cels)", self.object, pic_cels.len());
        Ok(())
    }

    /// Add the cels of `picture` at `position`, replacing any earlier copy
    /// of the same picture. Returns the plane's current picture id.
    pub fn add_pic(
        &mut self,
        picture: ResourceId,
        position: Point,
        mirrored: bool,
        cels: &dyn CelProvider,
        ids: &mut IdSource,
        screen_count: u8,
    ) -> Result<i32, GfxError> {
        self.delete_pic(picture, screen_count);
        self.add_pic_internal(picture, Some(position), mirrored, cels, ids, screen_count)?;
        Ok(self.picture_id)
    }

    /// Schedule every cel of `picture` for deletion.
    pub fn delete_pic(&mut self, picture: ResourceId, screen_count: u8) {
        for item in self.items.iter_mut().filter(|i| i.picture == Some(picture)) {
            item.created = 0;
            item.updated = 0;
            item.deleted = screen_count;
        }
    }

    /// Drop `old` and adopt `new` as the plane's picture.
    pub fn replace_pic(&mut self, old: ResourceId, new: ResourceId, screen_count: u8) {
        self.delete_pic(old, screen_count);
        self.picture_id = new;
    }

    pub fn delete_all_pics(&mut self, screen_count: u8) {
        for i in 0..self.items.len() {
            let Some(item) = self.items.get_mut(i) else {
                continue;
            };
            if !item.cel.is_pic() {
                continue;
            }
            if item.created == 0 {
                item.updated = 0;
                item.deleted = screen_count;
            } else {
                self.items.erase_at(i);
            }
        }
        self.items.pack();
    }

    /*──────────────────────── items ────────────────────────*/

    pub fn add_screen_item(&mut self, item: ScreenItem) {
        self.items.add(item);
    }

    pub fn find_item(&self, object: ObjectId) -> Option<&ScreenItem> {
        self.items.find(|i| i.object == object)
    }

    pub fn find_item_mut(&mut self, object: ObjectId) -> Option<&mut ScreenItem> {
        self.items.find_mut(|i| i.object == object)
    }

    /// Remove an item outright (one that never reached the screen).
    pub fn remove_screen_item(&mut self, object: ObjectId) {
        self.items.remove_where(|i| i.object == object);
        self.items.pack();
    }

    /// Move every item; the whole plane is redrawn.
    pub fn scroll_screen_items(&mut self, dx: i32, dy: i32, scroll_pics: bool, screen_count: u8) {
        self.redraw_all_count = screen_count;
        for item in self.items.iter_mut() {
            if item.deleted == 0 && (scroll_pics || !item.cel.is_pic()) {
                item.position.x += dx;
                item.position.y += dy;
            }
        }
    }

    /// Force items with remap colours to redraw.
    pub fn remap_mark_redraw(&mut self) {
        for item in self.items.iter_mut() {
            if item.deleted == 0 && item.created == 0 && item.has_remap() {
                item.updated = 1;
            }
        }
    }

    /*──────────────────────── list computation ────────────────────────*/

    /// Diff the items against `visible` and produce this plane's draw and
    /// erase lists. `occluders` are the screen rectangles of the opaque
    /// planes above this one.
    pub fn calc_lists(
        &mut self,
        visible: &mut Plane,
        occluders: &[Rect],
        draw_list: &mut DrawList,
        erase_list: &mut RectList,
        ctx: &ListContext<'_>,
    ) {
        let frame = self.frame();
        let remap = ctx.remap_active;
        let item_count = self.items.len();

        for i in 0..item_count {
            let Some(item) = self.items.get_mut(i) else {
                continue;
            };

            let visible_rect = visible.items.find(|v| v.object == item.object).map(|v| {
                let mut r = v.screen_rect;
                r.clip(&frame.screen_rect);
                r
            });
            let old = visible_rect.filter(|r| !r.is_empty());

            if item.deleted > 0 {
                if let Some(old) = old {
                    if remap {
                        merge_to_rect_list(old, erase_list);
                    } else {
                        erase_list.add(old);
                    }
                }
            }

            if item.created == 0 && item.updated == 0 {
                continue;
            }

            item.calc_rects(&frame, &ctx.rects);
            let new = item.screen_rect;

            if item.created > 0 {
                if !new.is_empty() {
                    draw_list.add(DrawItem::new(item, new));
                    if remap {
                        merge_to_rect_list(new, erase_list);
                    }
                }
            } else if !remap {
                if let Some(old) = old {
                    erase_list.add(old);
                }
                if !new.is_empty() {
                    draw_list.add(DrawItem::new(item, new));
                }
            } else {
                match old {
                    Some(old) if !new.is_empty() && old.intersects(&new) => {
                        let mut both = old;
                        both.extend(&new);
                        draw_list.add(DrawItem::new(item, both));
                        merge_to_rect_list(both, erase_list);
                    }
                    _ => {
                        if let Some(old) = old {
                            merge_to_rect_list(old, erase_list);
                        }
                        if !new.is_empty() {
                            draw_list.add(DrawItem::new(item, new));
                            merge_to_rect_list(new, erase_list);
                        }
                    }
                }
            }
        }

        break_rect_list(erase_list, occluders);
        break_draw_list(draw_list, occluders);

        let primary_count = draw_list.len();
        let erase_count = erase_list.len();

        if ctx.high_res_pictures {
            self.merge_exposed_high_res(erase_list, erase_count, draw_list);
        } else {
            for i in 0..erase_count {
                let Some(&rect) = erase_list.get(i) else {
                    continue;
                };
                for j in 0..item_count {
                    if self
                        .items
                        .get(j)
                        .is_some_and(|it| it.is_settled() && rect.intersects(&it.screen_rect))
                    {
                        self.merge_to_draw_list(j, rect, draw_list);
                    }
                }
            }
        }

        if !remap {
            // items above something being redrawn must be redrawn on top of it
            for i in 0..primary_count {
                let Some(&drawn) = draw_list.get(i) else {
                    continue;
                };
                for j in 0..item_count {
                    if self.items.get(j).is_some_and(|it| {
                        it.is_settled() && it.sort_key() > drawn.key && drawn.rect.intersects(&it.screen_rect)
                    }) {
                        self.merge_to_draw_list(j, drawn.rect, draw_list);
                    }
                }
            }
        }

        self.decrement_item_counts(Some(visible), false);
    }

    /// Dormant picture-aware variant of the exposure pass: screen items are
    /// only redrawn over pictures once a picture cel has been seen.
    fn merge_exposed_high_res(&self, erase_list: &RectList, erase_count: usize, draw_list: &mut DrawList) {
        let mut order: Vec<usize> = self.items.indexed().map(|(i, _)| i).collect();
        order.sort_by_key(|&i| self.items.get(i).map(ScreenItem::sort_key));

        let mut picture_drawn = false;
        let mut item_drawn = false;
        for i in 0..erase_count {
            let Some(&rect) = erase_list.get(i) else {
                continue;
            };
            for &j in &order {
                let Some(item) = self.items.get(j) else {
                    continue;
                };
                if item.deleted > 0 || !rect.intersects(&item.screen_rect) {
                    continue;
                }
                let exposed = rect.intersection(&item.screen_rect);
                let dirty = item.created > 0 || item.updated > 0;
                let first_pic_cel = matches!(item.cel, CelRef::Pic { cel_no: 0, .. });
                if picture_drawn {
                    if item.cel.is_pic() {
                        if item_drawn || first_pic_cel {
                            self.merge_to_draw_list(j, exposed, draw_list);
                        }
                    } else {
                        if !dirty {
                            self.merge_to_draw_list(j, exposed, draw_list);
                        }
                        item_drawn = true;
                    }
                } else {
                    if !dirty {
                        self.merge_to_draw_list(j, exposed, draw_list);
                    }
                    if item.cel.is_pic() {
                        picture_drawn = true;
                    }
                }
            }
        }
    }

    /// Schedule everything in the plane for drawing, e.g. after the plane
    /// itself moved or changed colour.
    pub fn redraw_all(
        &mut self,
        visible: Option<&mut Plane>,
        occluders: &[Rect],
        draw_list: &mut DrawList,
        erase_list: &mut RectList,
        ctx: &ListContext<'_>,
    ) {
        let frame = self.frame();
        for j in 0..self.items.len() {
            let rect = match self.items.get_mut(j) {
                Some(item) if item.deleted == 0 => {
                    item.calc_rects(&frame, &ctx.rects);
                    item.screen_rect
                }
                _ => continue,
            };
            if !rect.is_empty() {
                self.merge_to_draw_list(j, rect, draw_list);
            }
        }

        erase_list.clear();
        if !self.screen_rect.is_empty() && !matches!(self.kind, PlaneType::Picture | PlaneType::Opaque) {
            erase_list.add(self.screen_rect);
        }

        break_rect_list(erase_list, occluders);
        break_draw_list(draw_list, occluders);
        self.redraw_all_count = self.redraw_all_count.saturating_sub(1);
        self.decrement_item_counts(visible, true);
    }

    /// Add the part of item `index` inside `rect` to the draw list, minus
    /// whatever is already scheduled for the same item.
    pub fn merge_to_draw_list(&self, index: usize, rect: Rect, draw_list: &mut DrawList) {
        let Some(item) = self.items.get(index) else {
            return;
        };
        let mut first = item.screen_rect;
        first.clip(&rect);
        if first.is_empty() {
            return;
        }

        let mut merge_list = RectList::new();
        merge_list.add(first);

        let mut i = 0;
        while i < merge_list.len() {
            if let Some(&r) = merge_list.get(i) {
                for drawn in draw_list.iter().filter(|d| d.item == item.object) {
                    if drawn.rect.contains(&r) {
                        merge_list.erase_at(i);
                        break;
                    }
                    if let Some(parts) = split_rects(r, &drawn.rect) {
                        for part in parts.into_iter().rev() {
                            merge_list.add(part);
                        }
                        merge_list.erase_at(i);
                        break;
                    }
                }
            }
            i += 1;
        }

        merge_list.pack();
        for r in merge_list.iter() {
            draw_list.add(DrawItem::new(item, *r));
        }
    }

    /// Tick the item lifecycle counters and carry the changes over to the
    /// visible snapshot.
    pub fn decrement_item_counts(&mut self, mut visible: Option<&mut Plane>, force_update: bool) {
        for i in 0..self.items.len() {
            let Some(item) = self.items.get_mut(i) else {
                continue;
            };

            if let Some(vis) = visible.as_deref_mut() {
                let slot = vis.items.position(|v| v.object == item.object);
                if item.updated > 0 || force_update {
                    match slot {
                        Some(slot) => vis.items.set(slot, item.clone()),
                        None if item.updated > 0 && item.created == 0 => {
                            log::warn!("{}: no visible counterpart for updated item {}", self.object, item.object);
                        }
                        None => {}
                    }
                }
            }

            item.updated = item.updated.saturating_sub(1);

            if item.created > 0 {
                item.created -= 1;
                if let Some(vis) = visible.as_deref_mut() {
                    if vis.items.position(|v| v.object == item.object).is_none() {
                        vis.items.add(item.clone());
                    }
                }
            }

            if item.deleted > 0 {
                item.deleted -= 1;
                if item.deleted == 0 {
                    let object = item.object;
                    if let Some(vis) = visible.as_deref_mut() {
                        vis.items.remove_where(|v| v.object == object);
                    }
                    self.items.erase_at(i);
                }
            }
        }

        self.items.pack();
        if let Some(vis) = visible {
            vis.items.pack();
        }
    }

    /*──────────────────────── transparent plane filtering ────────────────────────*/

    /// Absorb the erase rectangles of a transparent plane above this one.
    pub fn filter_down_erase_rects(&self, draw_list: &mut DrawList, erase_list: &mut RectList, higher: &mut RectList) {
        let higher_count = higher.len();

        if self.kind.is_transparent() {
            for i in 0..higher_count {
                if let Some(&r) = higher.get(i) {
                    self.merge_items_touching(r, draw_list);
                }
            }
            return;
        }

        for i in 0..higher_count {
            let Some(&whole) = higher.get(i) else {
                continue;
            };
            if !whole.intersects(&self.screen_rect) {
                continue;
            }
            let mut r = whole;
            r.clip(&self.screen_rect);
            merge_to_rect_list(r, erase_list);
            self.merge_items_touching(r, draw_list);

            if let Some(parts) = split_rects(whole, &r) {
                for part in parts.into_iter().rev() {
                    higher.add(part);
                }
            }
            higher.erase_at(i);
        }
        higher.pack();
    }

    /// Redraw the items of this (transparent) plane over erased areas of a
    /// lower plane.
    pub fn filter_up_erase_rects(&self, draw_list: &mut DrawList, lower: &RectList) {
        for r in lower.iter() {
            self.merge_items_touching(*r, draw_list);
        }
    }

    /// Redraw the items of this (transparent) plane over areas a lower
    /// plane is about to draw.
    pub fn filter_up_draw_rects(&self, draw_list: &mut DrawList, lower: &DrawList) {
        for d in lower.iter() {
            self.merge_items_touching(d.rect, draw_list);
        }
    }

    fn merge_items_touching(&self, rect: Rect, draw_list: &mut DrawList) {
        for j in 0..self.items.len() {
            if self
                .items
                .get(j)
                .is_some_and(|it| it.deleted == 0 && rect.intersects(&it.screen_rect))
            {
                self.merge_to_draw_list(j, rect, draw_list);
            }
        }
    }
}

/// Plane type selected by a picture id. Picture numbers keep a
/// transparent-picture plane as it is.
pub fn type_for_picture(picture_id: i32, current: PlaneType) -> PlaneType {
    match picture_id {
        PIC_COLORED => PlaneType::Colored,
        PIC_TRANSPARENT => PlaneType::Transparent,
        PIC_OPAQUE => PlaneType::Opaque,
        PIC_TRANSPARENT_PICTURE => PlaneType::TransparentPicture,
        _ if current == PlaneType::TransparentPicture => current,
        _ => PlaneType::Picture,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cel::{BitmapStore, CelBank, CelImage, CelSource, PicCel};

    fn color_item(object: u32, rect: Rect, priority: i16, creation_id: u32) -> ScreenItem {
        let mut item = ScreenItem::new(
            ObjectId(object),
            ObjectId(1),
            CelRef::Color {
                color: 3,
                width: rect.width(),
                height: rect.height(),
            },
            Point::new(rect.left, rect.top),
            creation_id,
            1,
        );
        item.priority = priority;
        item.fixed_priority = true;
        item
    }

    fn run_lists(plane: &mut Plane, visible: &mut Plane, bank: &CelBank) -> (DrawList, RectList) {
        run_lists_with(plane, visible, bank, false, false)
    }

    fn run_lists_with(
        plane: &mut Plane,
        visible: &mut Plane,
        bank: &CelBank,
        remap_active: bool,
        high_res_pictures: bool,
    ) -> (DrawList, RectList) {
        let bitmaps = BitmapStore::new();
        let ctx = ListContext {
            rects: RectContext {
                cels: CelSource::new(bank, &bitmaps),
                ratio_x: Ratio::ONE,
                ratio_y: Ratio::ONE,
            },
            remap_active,
            high_res_pictures,
        };
        let mut draw = DrawList::new();
        let mut erase = RectList::new();
        plane.calc_lists(visible, &[], &mut draw, &mut erase, &ctx);
        (draw, erase)
    }

    fn steady_plane() -> (Plane, Plane) {
        let mut plane = Plane::new(ObjectId(1), 1, Rect::sized(320, 200), PIC_COLORED, 1);
        plane.created = 0;
        plane.redraw_all_count = 0;
        plane.picture_changed = false;
        let visible = plane.clone();
        (plane, visible)
    }

    #[test]
    fn picture_codes_select_types() {
        assert_eq!(type_for_picture(-2, PlaneType::Picture), PlaneType::Colored);
        assert_eq!(type_for_picture(-1, PlaneType::Colored), PlaneType::Transparent);
        assert_eq!(type_for_picture(-3, PlaneType::Colored), PlaneType::Opaque);
        assert_eq!(type_for_picture(-4, PlaneType::Colored), PlaneType::TransparentPicture);
        assert_eq!(type_for_picture(12, PlaneType::Colored), PlaneType::Picture);
        assert_eq!(type_for_picture(12, PlaneType::TransparentPicture), PlaneType::TransparentPicture);
    }

    #[test]
    fn calc_lists_reaches_steady_state() {
        let bank = CelBank::new();
        let (mut plane, mut visible) = steady_plane();
        plane.add_screen_item(color_item(10, Rect::new(10, 10, 20, 20), 0, 1));

        let (draw, erase) = run_lists(&mut plane, &mut visible, &bank);
        assert_eq!(draw.iter().map(|d| d.rect).collect::<Vec<_>>(), vec![Rect::new(10, 10, 20, 20)]);
        assert!(erase.is_empty());
        assert_eq!(plane.items.get(0).unwrap().created, 0);
        assert!(visible.find_item(ObjectId(10)).is_some());

        let (draw, erase) = run_lists(&mut plane, &mut visible, &bank);
        assert!(draw.is_empty() && erase.is_empty(), "second pass has nothing to do");
    }

    #[test]
    fn update_erases_old_and_redraws_overlapping_higher_items() {
        let bank = CelBank::new();
        let (mut plane, mut visible) = steady_plane();
        plane.add_screen_item(color_item(10, Rect::new(0, 0, 10, 10), 0, 1));
        plane.add_screen_item(color_item(11, Rect::new(5, 5, 15, 15), 5, 2));
        run_lists(&mut plane, &mut visible, &bank);

        let low = plane.find_item_mut(ObjectId(10)).unwrap();
        low.position = Point::new(2, 0);
        low.updated = 1;
        let (draw, erase) = run_lists(&mut plane, &mut visible, &bank);

        assert_eq!(erase.iter().copied().collect::<Vec<_>>(), vec![Rect::new(0, 0, 10, 10)]);
        let low: Vec<Rect> = draw.iter().filter(|d| d.item == ObjectId(10)).map(|d| d.rect).collect();
        assert!(low.contains(&Rect::new(2, 0, 12, 10)));
        let high: Vec<Rect> = draw.iter().filter(|d| d.item == ObjectId(11)).map(|d| d.rect).collect();
        assert!(!high.is_empty(), "higher item exposed by the move is redrawn");
        let covered: i32 = high.iter().map(Rect::area).sum();
        assert_eq!(covered, Rect::new(5, 5, 12, 10).area());
    }

    #[test]
    fn deleted_item_leaves_both_lists() {
        let bank = CelBank::new();
        let (mut plane, mut visible) = steady_plane();
        plane.add_screen_item(color_item(10, Rect::new(10, 10, 20, 20), 0, 1));
        run_lists(&mut plane, &mut visible, &bank);

        plane.find_item_mut(ObjectId(10)).unwrap().deleted = 1;
        let (draw, erase) = run_lists(&mut plane, &mut visible, &bank);
        assert!(draw.is_empty());
        assert_eq!(erase.iter().copied().collect::<Vec<_>>(), vec![Rect::new(10, 10, 20, 20)]);
        assert!(plane.find_item(ObjectId(10)).is_none());
        assert!(visible.find_item(ObjectId(10)).is_none());
    }

    #[test]
    fn redraw_all_erases_colored_plane() {
        let bank = CelBank::new();
        let bitmaps = BitmapStore::new();
        let ctx = ListContext {
            rects: RectContext {
                cels: CelSource::new(&bank, &bitmaps),
                ratio_x: Ratio::ONE,
                ratio_y: Ratio::ONE,
            },
            remap_active: false,
            high_res_pictures: false,
        };
        let mut plane = Plane::new(ObjectId(1), 1, Rect::sized(100, 100), PIC_COLORED, 1);
        plane.add_screen_item(color_item(10, Rect::new(10, 10, 20, 20), 0, 1));
        let mut draw = DrawList::new();
        let mut erase = RectList::new();
        plane.redraw_all(None, &[Rect::new(50, 0, 100, 100)], &mut draw, &mut erase, &ctx);

        assert_eq!(erase.iter().copied().collect::<Vec<_>>(), vec![Rect::new(0, 0, 50, 100)]);
        assert_eq!(draw.len(), 1);
        assert_eq!(plane.redraw_all_count, 0);
    }

    #[test]
    fn pictures_become_fixed_priority_items() {
        let mut bank = CelBank::new();
        bank.insert_picture(
            7,
            vec![
                (
                    PicCel {
                        priority: 0,
                        relative_position: Point::new(0, 0),
                    },
                    CelImage::solid(320, 200, 1),
                ),
                (
                    PicCel {
                        priority: 50,
                        relative_position: Point::new(30, 40),
                    },
                    CelImage::solid(10, 10, 2),
                ),
            ],
        );
        let mut ids = IdSource::default();
        let mut plane = Plane::new(ObjectId(1), 1, Rect::sized(320, 200), 7, 1);
        let ratios = (Ratio::ONE, Ratio::ONE);
        plane.sync(None, &Rect::sized(320, 200), ratios, &bank, &mut ids, 1).unwrap();

        assert_eq!(plane.kind, PlaneType::Picture);
        assert_eq!(plane.items.live(), 2);
        let top = plane.items.iter().find(|i| i.priority == 50).unwrap();
        assert!(top.fixed_priority);
        assert_eq!(top.position, Point::new(30, 40));

        plane.delete_all_pics(1);
        assert_eq!(plane.items.live(), 0, "never-shown cels are dropped at once");

        plane.picture_id = 99;
        plane.picture_changed = true;
        let err = plane.sync(None, &Rect::sized(320, 200), ratios, &bank, &mut ids, 1).unwrap_err();
        assert_eq!(err, GfxError::ResourceNotFound { kind: "picture", id: 99 });
    }

    #[test]
    fn sync_flags_moves_and_priority_changes() {
        let bank = CelBank::new();
        let mut ids = IdSource::default();
        let screen = Rect::sized(320, 200);
        let ratios = (Ratio::ONE, Ratio::ONE);
        let (mut plane, visible) = steady_plane();

        plane.game_rect = Rect::new(0, 0, 200, 100);
        plane.sync(Some(&visible), &screen, ratios, &bank, &mut ids, 1).unwrap();
        assert_eq!((plane.moved, plane.redraw_all_count), (1, 0), "shrinking only moves");
        assert_eq!(plane.updated, 1);

        plane.moved = 0;
        plane.game_rect = Rect::new(10, 0, 330, 200);
        plane.priority = 4;
        plane.sync(Some(&visible), &screen, ratios, &bank, &mut ids, 1).unwrap();
        assert_eq!((plane.moved, plane.redraw_all_count, plane.priority_changed), (1, 1, 1));
        assert_eq!(plane.screen_rect, Rect::new(10, 0, 320, 200));
    }

    fn rects(draw: &DrawList) -> Vec<(ObjectId, Rect)> {
        draw.iter().map(|d| (d.item, d.rect)).collect()
    }

    #[test]
    fn remap_moves_merge_into_the_erase_list() {
        let bank = CelBank::new();
        let (mut plane, mut visible) = steady_plane();
        plane.add_screen_item(color_item(10, Rect::new(10, 10, 20, 20), 0, 1));
        run_lists(&mut plane, &mut visible, &bank);

        // overlapping move: one rectangle covering both spots
        let item = plane.find_item_mut(ObjectId(10)).unwrap();
        item.position = Point::new(14, 10);
        item.updated = 1;
        let (draw, erase) = run_lists_with(&mut plane, &mut visible, &bank, true, false);
        assert_eq!(rects(&draw), vec![(ObjectId(10), Rect::new(10, 10, 24, 20))]);
        assert_eq!(erase.iter().copied().collect::<Vec<_>>(), vec![Rect::new(10, 10, 24, 20)]);

        // disjoint move: old and new erased separately, new drawn
        let item = plane.find_item_mut(ObjectId(10)).unwrap();
        item.position = Point::new(50, 10);
        item.updated = 1;
        let (draw, erase) = run_lists_with(&mut plane, &mut visible, &bank, true, false);
        assert_eq!(rects(&draw), vec![(ObjectId(10), Rect::new(50, 10, 60, 20))]);
        assert_eq!(
            erase.iter().copied().collect::<Vec<_>>(),
            vec![Rect::new(14, 10, 24, 20), Rect::new(50, 10, 60, 20)]
        );
    }

    #[test]
    fn remap_mark_redraw_touches_only_remap_items() {
        let mut bank = CelBank::new();
        bank.insert_view(
            3,
            vec![vec![CelImage {
                remap: true,
                ..CelImage::solid(10, 10, 20)
            }]],
        );
        let (mut plane, mut visible) = steady_plane();
        plane.add_screen_item(color_item(10, Rect::new(40, 10, 50, 20), 0, 1));
        plane.add_screen_item(ScreenItem::new(
            ObjectId(11),
            ObjectId(1),
            CelRef::View { view: 3, loop_no: 0, cel_no: 0 },
            Point::new(10, 10),
            2,
            1,
        ));
        run_lists(&mut plane, &mut visible, &bank);

        plane.remap_mark_redraw();
        assert_eq!(plane.find_item(ObjectId(10)).unwrap().updated, 0);
        assert_eq!(plane.find_item(ObjectId(11)).unwrap().updated, 1);

        let (draw, _) = run_lists_with(&mut plane, &mut visible, &bank, true, false);
        assert_eq!(rects(&draw), vec![(ObjectId(11), Rect::new(10, 10, 20, 20))]);
    }

    /// Picture 7: a full-plane cel at priority 0 and a small one at 50,
    /// with a colour item on top of both.
    fn layered_picture_plane() -> (CelBank, Plane, Plane) {
        let mut bank = CelBank::new();
        bank.insert_picture(
            7,
            vec![
                (
                    PicCel {
                        priority: 0,
                        relative_position: Point::new(0, 0),
                    },
                    CelImage::solid(320, 200, 1),
                ),
                (
                    PicCel {
                        priority: 50,
                        relative_position: Point::new(30, 40),
                    },
                    CelImage::solid(10, 10, 2),
                ),
            ],
        );
        let mut ids = IdSource::default();
        let mut plane = Plane::new(ObjectId(1), 1, Rect::sized(320, 200), 7, 1);
        plane
            .sync(None, &Rect::sized(320, 200), (Ratio::ONE, Ratio::ONE), &bank, &mut ids, 1)
            .unwrap();
        plane.add_screen_item(color_item(10, Rect::new(30, 40, 40, 50), 60, 10));
        let mut visible = plane.clone();
        visible.items = SlotList::new();
        run_lists(&mut plane, &mut visible, &bank);
        (bank, plane, visible)
    }

    #[test]
    fn exposed_picture_cels_are_redrawn() {
        let (bank, mut plane, mut visible) = layered_picture_plane();
        plane.find_item_mut(ObjectId(10)).unwrap().deleted = 1;
        let (draw, erase) = run_lists(&mut plane, &mut visible, &bank);

        assert_eq!(erase.iter().copied().collect::<Vec<_>>(), vec![Rect::new(30, 40, 40, 50)]);
        let priorities: Vec<i16> = draw
            .iter()
            .filter_map(|d| plane.find_item(d.item).map(|i| i.priority))
            .collect();
        assert_eq!(priorities.len(), 2);
        assert!(priorities.contains(&0) && priorities.contains(&50));
    }

    #[test]
    fn high_res_order_skips_later_picture_cels_until_an_item_is_drawn() {
        let (bank, mut plane, mut visible) = layered_picture_plane();
        plane.find_item_mut(ObjectId(10)).unwrap().deleted = 1;
        let (draw, _) = run_lists_with(&mut plane, &mut visible, &bank, false, true);

        let drawn: Vec<(i16, Rect)> = draw
            .iter()
            .filter_map(|d| plane.find_item(d.item).map(|i| (i.priority, d.rect)))
            .collect();
        assert_eq!(drawn, vec![(0, Rect::new(30, 40, 40, 50))]);
    }
}
