mod rect;
mod rect_list;
mod slot_list;

pub use rect::{Point, Ratio, Rect, mulinc, mulru, mulru_rect};
pub use rect_list::{
    RectList, SplitRects, merge_to_rect_list, merge_to_show_list, split_rects,
    split_rects_for_render,
};
pub use slot_list::SlotList;
