use crate::geometry::Rect;
use crate::vm::ObjectId;

use super::plane::Plane;

/// Planes kept sorted by `(priority, creation id)`, lowest first.
#[derive(Debug, Default, Clone)]
pub struct PlaneList {
    planes: Vec<Plane>,
}

impl PlaneList {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Plane> {
        self.planes.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Plane> {
        self.planes.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&Plane> {
        self.planes.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Plane> {
        self.planes.get_mut(index)
    }

    pub fn find_index(&self, object: ObjectId) -> Option<usize> {
        self.planes.iter().position(|p| p.object == object)
    }

    pub fn find(&self, object: ObjectId) -> Option<&Plane> {
        self.planes.iter().find(|p| p.object == object)
    }

    pub fn find_mut(&mut self, object: ObjectId) -> Option<&mut Plane> {
        self.planes.iter_mut().find(|p| p.object == object)
    }

    /// Insert and restore the sort order.
    pub fn add(&mut self, plane: Plane) {
        self.planes.push(plane);
        self.sort();
    }

    pub fn sort(&mut self) {
        self.planes.sort_by_key(Plane::sort_key);
    }

    pub fn remove_at(&mut self, index: usize) -> Plane {
        self.planes.remove(index)
    }

    pub fn remove(&mut self, object: ObjectId) -> Option<Plane> {
        self.find_index(object).map(|i| self.planes.remove(i))
    }

    /// Screen rectangles of the non-transparent planes above `index`.
    pub fn occluders_above(&self, index: usize) -> Vec<Rect> {
        self.planes
            .iter()
            .skip(index + 1)
            .filter(|p| !p.kind.is_transparent())
            .map(|p| p.screen_rect)
            .collect()
    }

    /// Highest priority in use, or `None` for an empty list.
    pub fn top_priority(&self) -> Option<i16> {
        self.planes.last().map(|p| p.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::plane::{PIC_COLORED, PIC_TRANSPARENT};

    fn plane(id: u32, creation: u32, priority: i16, picture: i32) -> Plane {
        let mut p = Plane::new(ObjectId(id), creation, Rect::sized(10 * id as i32, 10), picture, 1);
        p.priority = priority;
        p
    }

    #[test]
    fn sorted_by_priority_then_age() {
        let mut list = PlaneList::new();
        list.add(plane(1, 1, 5, PIC_COLORED));
        list.add(plane(2, 2, 0, PIC_COLORED));
        list.add(plane(3, 3, 5, PIC_COLORED));
        let order: Vec<u32> = list.iter().map(|p| p.object.0).collect();
        assert_eq!(order, vec![2, 1, 3]);
        assert_eq!(list.top_priority(), Some(5));
    }

    #[test]
    fn transparent_planes_do_not_occlude() {
        let mut list = PlaneList::new();
        list.add(plane(1, 1, 0, PIC_COLORED));
        list.add(plane(2, 2, 1, PIC_TRANSPARENT));
        list.add(plane(3, 3, 2, PIC_COLORED));
        assert_eq!(list.occluders_above(0), vec![Rect::sized(30, 10)]);
        assert!(list.occluders_above(2).is_empty());
    }
}
