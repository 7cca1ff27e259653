//! Primitive types - Key functions and render thunks.

use std::fmt;
use std::rc::Rc;

// =============================================================================
// Key Function
// =============================================================================

/// Extracts the reconciliation key of an item.
///
/// A key function returning `None` is a configuration error: the pass that
/// hit it is aborted.
pub struct KeyFn<T, K> {
    extract: Rc<dyn Fn(&T, usize) -> Option<K>>,
}

impl<T, K> Clone for KeyFn<T, K> {
    fn clone(&self) -> Self {
        Self {
            extract: Rc::clone(&self.extract),
        }
    }
}

impl<T, K> fmt::Debug for KeyFn<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyFn")
    }
}

impl<T: 'static, K: 'static> KeyFn<T, K> {
    /// Key each item by `extract(item)`.
    pub fn new(extract: impl Fn(&T) -> Option<K> + 'static) -> Self {
        Self {
            extract: Rc::new(move |item: &T, _: usize| extract(item)),
        }
    }

    /// Key each item by an infallible `extract(item)`.
    pub fn by(extract: impl Fn(&T) -> K + 'static) -> Self {
        Self {
            extract: Rc::new(move |item: &T, _: usize| Some(extract(item))),
        }
    }

    /// Key for `item` at `index`.
    pub fn key(&self, item: &T, index: usize) -> Option<K> {
        (self.extract)(item, index)
    }
}

impl<T: 'static> KeyFn<T, usize> {
    /// Positional keys: the item's index in the sequence.
    ///
    /// This is the default when no key function is given. Items keep their
    /// node only while they stay at the same index.
    pub fn index() -> Self {
        Self {
            extract: Rc::new(|_: &T, index: usize| Some(index)),
        }
    }
}

impl<T: 'static> Default for KeyFn<T, usize> {
    fn default() -> Self {
        Self::index()
    }
}

// =============================================================================
// Render Thunk
// =============================================================================

/// Zero-argument render function producing one node.
pub type Thunk<N> = Box<dyn Fn() -> N>;
