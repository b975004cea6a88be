//! Rectangle lists and the split/merge primitives the compositor is built on.
//!
//! The tiling produced here is part of the observable behaviour: which
//! rectangles get merged or split decides what is redrawn and blitted, so the
//! decompositions are single-pass and not minimal on purpose.

use smallvec::SmallVec;

use super::{Rect, SlotList};

pub type RectList = SlotList<Rect>;

/// Up to four remainder rectangles of a split.
pub type SplitRects = SmallVec<[Rect; 4]>;

/// Parts of `r` not covered by `other`.
///
/// * `None` – the two rectangles do not intersect.
/// * empty   – `r` lies entirely inside `other`.
/// * otherwise top strip, bottom strip, left column, right column (each only
///   if present), cut in that order from a shrinking copy of `r`.
pub fn split_rects(mut r: Rect, other: &Rect) -> Option<SplitRects> {
    if !r.intersects(other) {
        return None;
    }

    let mut out = SplitRects::new();

    if r.top < other.top {
        out.push(Rect::new(r.left, r.top, r.right, other.top));
        r.top = other.top;
    }

    if r.bottom > other.bottom {
        out.push(Rect::new(r.left, other.bottom, r.right, r.bottom));
        r.bottom = other.bottom;
    }

    if r.left < other.left {
        out.push(Rect::new(r.left, r.top, other.left, r.bottom));
        r.left = other.left;
    }

    if r.right > other.right {
        out.push(Rect::new(other.right, r.top, r.right, r.bottom));
    }

    Some(out)
}

/// Show-list split: `middle` becomes the horizontal band where both
/// rectangles overlap vertically (spanning both horizontally) and the strips
/// above and below are returned.
///
/// Returns `None` when the rectangles do not intersect, leaving `middle`
/// untouched.
pub fn split_rects_for_render(middle: &mut Rect, show: &Rect) -> Option<SmallVec<[Rect; 2]>> {
    if !middle.intersects(show) {
        return None;
    }

    let min_left = middle.left.min(show.left);
    let max_right = middle.right.max(show.right);

    let (upper_left, upper_top, upper_right, upper_max_top) = if middle.top < show.top {
        (middle.left, middle.top, middle.right, show.top)
    } else {
        (show.left, show.top, show.right, middle.top)
    };

    let (lower_left, lower_right, lower_bottom, lower_min_bottom) = if middle.bottom > show.bottom
    {
        (middle.left, middle.right, middle.bottom, show.bottom)
    } else {
        (show.left, show.right, show.bottom, middle.bottom)
    };

    *middle = Rect::new(min_left, upper_max_top, max_right, lower_min_bottom);

    let mut out = SmallVec::new();
    if upper_top != upper_max_top {
        out.push(Rect::new(upper_left, upper_top, upper_right, upper_max_top));
    }
    if lower_bottom != lower_min_bottom {
        out.push(Rect::new(lower_left, lower_min_bottom, lower_right, lower_bottom));
    }
    Some(out)
}

/// Add `rect` to `list` without creating overlap: the incoming rectangle is
/// split around every entry already present and only the uncovered pieces
/// are appended.
pub fn merge_to_rect_list(rect: Rect, list: &mut RectList) {
    let mut merge_list = RectList::new();
    merge_list.add(rect);

    let mut i = 0;
    while i < merge_list.len() {
        let Some(&r) = merge_list.get(i) else {
            i += 1;
            continue;
        };

        for j in 0..list.len() {
            let Some(existing) = list.get(j) else {
                continue;
            };

            if existing.contains(&r) {
                merge_list.erase_at(i);
                break;
            }

            if let Some(parts) = split_rects(r, existing) {
                for part in parts.into_iter().rev() {
                    merge_list.add(part);
                }
                merge_list.erase_at(i);
                break;
            }
        }
        i += 1;
    }

    merge_list.pack();
    for r in merge_list.iter() {
        list.add(*r);
    }
}

/// Merge a freshly drawn rectangle into the show list.
///
/// Two rectangles are fused into their bounding box whenever the wasted
/// area `bbox - a - b + overlap` is at most `overdraw_threshold`. Otherwise,
/// if they intersect, both are re-cut with [`split_rects_for_render`] and
/// the pieces re-enter the merge loop, so the show list never holds
/// overlapping entries.
pub fn merge_to_show_list(draw_rect: Rect, show_list: &mut RectList, overdraw_threshold: i32) {
    let mut merge_list = RectList::new();
    merge_list.add(draw_rect);

    let mut i = 0;
    while i < merge_list.len() {
        let Some(&r1) = merge_list.get(i) else {
            i += 1;
            continue;
        };
        if r1.is_empty() {
            i += 1;
            continue;
        }

        let mut did_merge = false;
        for j in 0..show_list.len() {
            let Some(&r2) = show_list.get(j) else {
                continue;
            };
            if r2.is_empty() {
                continue;
            }

            let mut merged = r1;
            merged.extend(&r2);

            let mut difference = merged.area() - r1.area() - r2.area();
            if r1.intersects(&r2) {
                difference += r1.intersection(&r2).area();
            }

            if difference <= overdraw_threshold {
                merge_list.erase_at(i);
                show_list.erase_at(j);
                merge_list.add(merged);
                did_merge = true;
                break;
            }

            let mut middle = r1;
            if let Some(parts) = split_rects_for_render(&mut middle, &r2) {
                merge_list.add(middle);
                merge_list.erase_at(i);
                show_list.erase_at(j);
                did_merge = true;
                for part in parts.into_iter().rev() {
                    merge_list.add(part);
                }
                break;
            }
        }

        if did_merge {
            show_list.pack();
        }
        i += 1;
    }

    merge_list.pack();
    for r in merge_list.iter() {
        show_list.add(*r);
    }
}
