//! A stable-index pool.
//!
//! Every value added to a [Pool] gets a plain integer handle that stays valid until the value is
//! explicitly removed. Removed slots are recycled by later [Pool::add] calls, so a handle must not be
//! used after its removal.
use crate::error::PoolError;

/// A slot vector with a free list.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Add a value and retrieve its handle, reusing a free slot if there is one.
    pub fn add(&mut self, value: T) -> usize {
        self.len += 1;

        if let Some(handle) = self.free.pop() {
            self.slots[handle] = Some(value);
            handle
        } else {
            self.slots.push(Some(value));
            self.slots.len() - 1
        }
    }

    pub fn get(&self, handle: usize) -> Result<&T, PoolError> {
        self.slots
            .get(handle)
            .and_then(Option::as_ref)
            .ok_or(PoolError::NotFound { handle })
    }

    pub fn get_mut(&mut self, handle: usize) -> Result<&mut T, PoolError> {
        self.slots
            .get_mut(handle)
            .and_then(Option::as_mut)
            .ok_or(PoolError::NotFound { handle })
    }

    /// Overwrite the value behind a live handle.
    pub fn set(&mut self, handle: usize, value: T) -> Result<(), PoolError> {
        *self.get_mut(handle)? = value;
        Ok(())
    }

    /// Mutate the value behind a live handle in place and return what the closure returns.
    pub fn update<R>(&mut self, handle: usize, f: impl FnOnce(&mut T) -> R) -> Result<R, PoolError> {
        self.get_mut(handle).map(f)
    }

    /// Remove a value, its handle becomes invalid and the slot is up for reuse.
    pub fn remove(&mut self, handle: usize) -> Result<T, PoolError> {
        let value = self
            .slots
            .get_mut(handle)
            .and_then(Option::take)
            .ok_or(PoolError::NotFound { handle })?;

        self.free.push(handle);
        self.len -= 1;

        Ok(value)
    }

    pub fn contains(&self, handle: usize) -> bool {
        matches!(self.slots.get(handle), Some(Some(_)))
    }

    /// The number of live entries.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
    }

    /// Iterate `(handle, value)` over all live entries, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(handle, slot)| slot.as_ref().map(|value| (handle, value)))
    }

    /// Snapshot the live handles, e.g. to mutate the pool while walking them.
    pub fn handles(&self) -> Vec<usize> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}
