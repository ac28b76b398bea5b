//! Scoped allocation arena
//!
//! Every regular test gets a fresh [`Arena`]. Values allocated through it are
//! tracked until their [`Tracked`] handle drops; anything still live when the
//! arena is closed is reported as a leak.

use std::cell::Cell;
use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};

/// Allocations still live when an arena was inspected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeakReport {
    pub allocations: usize,
    pub bytes: usize,
}

impl LeakReport {
    pub fn is_empty(&self) -> bool {
        self.allocations == 0
    }
}

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} allocation{}, {} byte{}",
            self.allocations,
            if self.allocations == 1 { "" } else { "s" },
            self.bytes,
            if self.bytes == 1 { "" } else { "s" }
        )
    }
}

/// Allocation region owned by a single test
#[derive(Debug, Default)]
pub struct Arena {
    live_allocations: Cell<usize>,
    live_bytes: Cell<usize>,
    total_allocations: Cell<usize>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `value` into a tracked heap allocation
    pub fn alloc<T>(&self, value: T) -> Tracked<'_, T> {
        let bytes = mem::size_of::<T>();
        let value = Box::new(value);
        self.acquire(bytes);
        Tracked {
            arena: self,
            value: Some(value),
            bytes,
        }
    }

    /// Allocate a zeroed byte buffer of `len` bytes
    pub fn alloc_bytes(&self, len: usize) -> Tracked<'_, Vec<u8>> {
        let buffer = Box::new(vec![0; len]);
        self.acquire(len);
        Tracked {
            arena: self,
            value: Some(buffer),
            bytes: len,
        }
    }

    /// Allocations currently live
    pub fn live(&self) -> LeakReport {
        LeakReport {
            allocations: self.live_allocations.get(),
            bytes: self.live_bytes.get(),
        }
    }

    /// Allocations made over the arena's lifetime, freed or not
    pub fn total_allocations(&self) -> usize {
        self.total_allocations.get()
    }

    /// Inspect the region and release it.
    ///
    /// Returns `Some` iff at least one allocation was never released.
    pub fn close(self) -> Option<LeakReport> {
        let report = self.live();
        if report.is_empty() {
            None
        } else {
            Some(report)
        }
    }

    fn acquire(&self, bytes: usize) {
        self.live_allocations.set(self.live_allocations.get() + 1);
        self.live_bytes.set(self.live_bytes.get() + bytes);
        self.total_allocations.set(self.total_allocations.get() + 1);
    }

    fn release(&self, bytes: usize) {
        self.live_allocations
            .set(self.live_allocations.get().saturating_sub(1));
        self.live_bytes
            .set(self.live_bytes.get().saturating_sub(bytes));
    }
}

/// A value allocated through an [`Arena`]; dropping it frees the allocation
pub struct Tracked<'a, T> {
    arena: &'a Arena,
    // Only `None` after `leak` has taken the box
    value: Option<Box<T>>,
    bytes: usize,
}

impl<'a, T> Tracked<'a, T> {
    /// Give up ownership without freeing. The arena keeps counting the
    /// allocation as live, so the enclosing test will report a leak.
    pub fn leak(mut self) -> &'static mut T
    where
        T: 'static,
    {
        let boxed = match self.value.take() {
            Some(boxed) => boxed,
            None => unreachable!("tracked value taken twice"),
        };
        mem::forget(self);
        Box::leak(boxed)
    }

    /// Consume the handle, freeing the allocation and returning the value
    pub fn into_inner(mut self) -> T {
        match self.value.take() {
            Some(boxed) => *boxed,
            None => unreachable!("tracked value taken twice"),
        }
        // `self` drops here and releases the allocation
    }
}

impl<T> Deref for Tracked<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.value {
            Some(boxed) => boxed,
            None => unreachable!("tracked value accessed after release"),
        }
    }
}

impl<T> DerefMut for Tracked<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(boxed) => boxed,
            None => unreachable!("tracked value accessed after release"),
        }
    }
}

impl<T> Drop for Tracked<'_, T> {
    fn drop(&mut self) {
        self.arena.release(self.bytes);
    }
}

impl<T: fmt::Debug> fmt::Debug for Tracked<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tracked").field(&**self).finish()
    }
}
