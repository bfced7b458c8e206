/// Fixed-capacity slot table, the way the firmware stores schedules.
///
/// Occupied slots are always packed at the front: removing an entry shifts
/// the ones after it down by one, so indices stay dense `0..len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotArena<T, const N: usize> {
    slots: [Option<T>; N],
    len: usize,
}

impl<T, const N: usize> Default for SlotArena<T, N> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            len: 0,
        }
    }
}

impl<T, const N: usize> SlotArena<T, N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Store `item` in the next free slot. Hands it back when full.
    pub fn try_push(&mut self, item: T) -> Result<usize, T> {
        if self.is_full() {
            return Err(item);
        }
        let index = self.len;
        self.slots[index] = Some(item);
        self.len += 1;
        Ok(index)
    }

    /// Remove the entry at `index` and compact the rest.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        let item = self.slots[index].take();
        self.slots[index..self.len].rotate_left(1);
        self.len -= 1;
        item
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index)?.as_ref()
    }

    /// Index of the first entry matching `pred`.
    pub fn position(&self, mut pred: impl FnMut(&T) -> bool) -> Option<usize> {
        self.iter().position(|item| pred(item))
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots[..self.len] {
            *slot = None;
        }
        self.len = 0;
    }

    /// Clear and refill from `items`. Returns how many did not fit.
    pub fn replace_with(&mut self, items: impl IntoIterator<Item = T>) -> usize {
        self.clear();
        let mut dropped = 0;
        for item in items {
            if self.try_push(item).is_err() {
                dropped += 1;
            }
        }
        dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots[..self.len].iter().flatten()
    }
}

impl<T: Clone, const N: usize> SlotArena<T, N> {
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
