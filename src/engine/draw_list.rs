use crate::geometry::{Rect, SlotList, split_rects};
use crate::vm::ObjectId;

use super::screen_item::ScreenItem;

/// A screen item scheduled to be drawn inside `rect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawItem {
    pub item: ObjectId,
    /// Draw-order key of the item when it was scheduled.
    pub key: (i16, u32),
    pub rect: Rect,
}

impl DrawItem {
    pub fn new(item: &ScreenItem, rect: Rect) -> Self {
        Self {
            item: item.object,
            key: item.sort_key(),
            rect,
        }
    }
}

pub type DrawList = SlotList<DrawItem>;

/// Stable sort by draw order.
pub fn sort_draw_list(list: &mut DrawList) {
    list.sort_by(|a, b| a.key.cmp(&b.key));
}

/// Cut every entry around `occluders`; only the uncovered parts stay.
pub fn break_draw_list(list: &mut DrawList, occluders: &[Rect]) {
    let mut i = 0;
    while i < list.len() {
        if let Some(&entry) = list.get(i) {
            for occluder in occluders {
                if let Some(parts) = split_rects(entry.rect, occluder) {
                    for part in parts.into_iter().rev() {
                        list.add(DrawItem { rect: part, ..entry });
                    }
                    list.erase_at(i);
                    break;
                }
            }
        }
        i += 1;
    }
    list.pack();
}

/// [`break_draw_list`] for plain rectangles.
pub fn break_rect_list(list: &mut SlotList<Rect>, occluders: &[Rect]) {
    let mut i = 0;
    while i < list.len() {
        if let Some(&rect) = list.get(i) {
            for occluder in occluders {
                if let Some(parts) = split_rects(rect, occluder) {
                    for part in parts.into_iter().rev() {
                        list.add(part);
                    }
                    list.erase_at(i);
                    break;
                }
            }
        }
        i += 1;
    }
    list.pack();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, key: (i16, u32), rect: Rect) -> DrawItem {
        DrawItem {
            item: ObjectId(id),
            key,
            rect,
        }
    }

    #[test]
    fn occluded_part_is_removed() {
        let mut list = DrawList::new();
        list.add(entry(1, (0, 0), Rect::new(0, 0, 20, 10)));
        break_draw_list(&mut list, &[Rect::new(10, 0, 40, 40)]);
        let rects: Vec<Rect> = list.iter().map(|d| d.rect).collect();
        assert_eq!(rects, vec![Rect::new(0, 0, 10, 10)]);
        assert!(list.iter().all(|d| d.item == ObjectId(1)));
    }

    #[test]
    fn fully_covered_entry_vanishes() {
        let mut list: SlotList<Rect> = [Rect::new(5, 5, 8, 8)].into_iter().collect();
        break_rect_list(&mut list, &[Rect::sized(100, 100)]);
        assert!(list.is_empty());
    }

    #[test]
    fn sort_keeps_insertion_order_for_ties() {
        let mut list = DrawList::new();
        list.add(entry(1, (5, 2), Rect::sized(1, 1)));
        list.add(entry(2, (1, 9), Rect::sized(1, 1)));
        list.add(entry(1, (5, 2), Rect::sized(2, 2)));
        sort_draw_list(&mut list);
        let order: Vec<(u32, i32)> = list.iter().map(|d| (d.item.0, d.rect.right)).collect();
        assert_eq!(order, vec![(2, 1), (1, 1), (1, 2)]);
    }
}
