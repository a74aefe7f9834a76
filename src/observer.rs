//! Typed listener lists keyed by `Rc` identity.

use std::rc::Rc;

pub(crate) struct Listeners<T: ?Sized> {
    entries: Vec<Rc<T>>,
}

impl<T: ?Sized> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: ?Sized> Listeners<T> {
    /// Registers `listener` unless that same allocation is already present.
    pub fn add(&mut self, listener: Rc<T>) -> bool {
        if self.entries.iter().any(|entry| Rc::ptr_eq(entry, &listener)) {
            return false;
        }
        self.entries.push(listener);
        true
    }

    pub fn remove(&mut self, listener: &Rc<T>) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| !Rc::ptr_eq(entry, listener));
        self.entries.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<T>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
