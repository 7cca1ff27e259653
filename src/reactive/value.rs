//! Value - Reactive or plain.
//!
//! APIs that accept "a bool or a cell of bool" take a [`Value`] and match on
//! it, instead of guessing at runtime whether something is reactive.

use super::cell::{Cell, Subscription};
use super::same::Same;

/// Either a reactive cell or a fixed value.
#[derive(Clone, Debug)]
pub enum Value<T: Clone + Same + 'static> {
    /// Tracks a cell; changes propagate.
    Reactive(Cell<T>),
    /// Fixed value; never notifies.
    Plain(T),
}

impl<T: Clone + Same + 'static> Value<T> {
    /// Current value.
    pub fn get(&self) -> T {
        match self {
            Value::Reactive(cell) => cell.get(),
            Value::Plain(value) => value.clone(),
        }
    }

    pub fn is_reactive(&self) -> bool {
        matches!(self, Value::Reactive(_))
    }

    /// Subscribe when reactive. Plain values return `None`.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Option<Subscription> {
        match self {
            Value::Reactive(cell) => Some(cell.subscribe(callback)),
            Value::Plain(_) => None,
        }
    }
}

impl<T: Clone + Same + 'static> From<T> for Value<T> {
    fn from(value: T) -> Self {
        Value::Plain(value)
    }
}

impl<T: Clone + Same + 'static> From<Cell<T>> for Value<T> {
    fn from(cell: Cell<T>) -> Self {
        Value::Reactive(cell)
    }
}

impl<T: Clone + Same + 'static> From<&Cell<T>> for Value<T> {
    fn from(cell: &Cell<T>) -> Self {
        Value::Reactive(cell.clone())
    }
}
