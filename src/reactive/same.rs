//! Identity comparison for write no-ops and reuse decisions.
//!
//! [`Same`] is deliberately shallow: plain data compares by value, `Rc`
//! compares by pointer, and containers compare their immediate elements.
//! It never follows a reference, so cyclic structures cannot make it loop.

use std::rc::Rc;

/// Shallow identity comparison.
///
/// Implementations must be total: no panics for any input.
pub trait Same {
    /// Whether `self` and `other` are the same value for change detection.
    fn same(&self, other: &Self) -> bool;
}

macro_rules! same_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Same for $ty {
                #[inline]
                fn same(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_by_value!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, &'static str,
);

impl<T: ?Sized> Same for Rc<T> {
    #[inline]
    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: Same> Same for Option<T> {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Same> Same for Vec<T> {
    fn same(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same(b))
    }
}

macro_rules! same_for_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Same),+> Same for ($($name,)+) {
            fn same(&self, other: &Self) -> bool {
                $(self.$idx.same(&other.$idx))&&+
            }
        }
    };
}

same_for_tuple!(A: 0);
same_for_tuple!(A: 0, B: 1);
same_for_tuple!(A: 0, B: 1, C: 2);
same_for_tuple!(A: 0, B: 1, C: 2, D: 3);
