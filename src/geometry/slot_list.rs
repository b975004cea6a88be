//! Index-stable list with tombstones.
//!
//! Several list algorithms append to a list while walking it by index and
//! erase entries they have already visited. Erasing only leaves a hole, so
//! every index handed out stays valid until [`SlotList::pack`] is called.

#[derive(Debug, Clone, PartialEq)]
pub struct SlotList<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for SlotList<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> SlotList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, holes included. This is the bound to iterate with.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of live entries.
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn add(&mut self, value: T) -> usize {
        self.slots.push(Some(value));
        self.slots.len() - 1
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Leave a hole at `index`; later indices are untouched.
    pub fn erase_at(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Overwrite the slot at `index`, reviving a hole if needed.
    pub fn set(&mut self, index: usize, value: T) {
        self.slots[index] = Some(value);
    }

    /// Drop all holes. Invalidates every index.
    pub fn pack(&mut self) {
        self.slots.retain(Option::is_some);
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().flatten()
    }

    /// Live entries together with their slot index.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|v| (i, v)))
    }

    pub fn position(&self, mut pred: impl FnMut(&T) -> bool) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(&mut pred))
    }

    pub fn find(&self, pred: impl FnMut(&T) -> bool) -> Option<&T> {
        self.position(pred).and_then(|i| self.get(i))
    }

    pub fn find_mut(&mut self, pred: impl FnMut(&T) -> bool) -> Option<&mut T> {
        let i = self.position(pred)?;
        self.get_mut(i)
    }

    /// Stable sort of the live entries; holes are packed away first.
    pub fn sort_by(&mut self, mut cmp: impl FnMut(&T, &T) -> std::cmp::Ordering) {
        self.pack();
        self.slots.sort_by(|a, b| match (a, b) {
            (Some(a), Some(b)) => cmp(a, b),
            _ => std::cmp::Ordering::Equal,
        });
    }

    pub fn remove_where(&mut self, mut pred: impl FnMut(&T) -> bool) {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(&mut pred) {
                *slot = None;
            }
        }
    }
}

impl<T> FromIterator<T> for SlotList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().map(Some).collect(),
        }
    }
}
