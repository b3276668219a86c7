//! Equality Primitives
//!
//! Snapshots are compared with the SameValue rule: strict equality, except
//! that `NaN` equals itself and `+0.0` differs from `-0.0`. Shared handles
//! (`Rc`, `Arc`) compare by identity, the way a reference to a record would.
//!
//! [`shallow_equal`] compares two records one level deep: same key set and
//! SameValue-equal values under every key. Nested records are compared by
//! whatever [`SameValue`] says about them, which for `Rc` is identity.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

/// SameValue equality.
///
/// Must be total and must never panic.
pub trait SameValue {
    /// Whether `self` and `other` are the same value.
    fn same_value(&self, other: &Self) -> bool;
}

/// SameValue comparison of two values.
pub fn same_value<T: SameValue + ?Sized>(a: &T, b: &T) -> bool {
    a.same_value(b)
}

macro_rules! same_value_via_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_via_eq!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, str, String,
);

impl SameValue for f64 {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        if self.is_nan() {
            return other.is_nan();
        }
        // Bit comparison keeps +0.0 and -0.0 apart.
        self.to_bits() == other.to_bits()
    }
}

impl SameValue for f32 {
    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        if self.is_nan() {
            return other.is_nan();
        }
        self.to_bits() == other.to_bits()
    }
}

impl<T: SameValue + ?Sized> SameValue for &T {
    fn same_value(&self, other: &Self) -> bool {
        (**self).same_value(*other)
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_value(b),
            _ => false,
        }
    }
}

impl<A: SameValue, B: SameValue> SameValue for (A, B) {
    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0) && self.1.same_value(&other.1)
    }
}

impl<A: SameValue, B: SameValue, C: SameValue> SameValue for (A, B, C) {
    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0) && self.1.same_value(&other.1) && self.2.same_value(&other.2)
    }
}

impl<T: ?Sized> SameValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> SameValue for Arc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

// ----------------------------------------------------------------------------
// Shallow comparison
// ----------------------------------------------------------------------------

/// A keyed collection of fields that can be compared one level deep.
pub trait Record {
    /// Number of own fields.
    fn field_count(&self) -> usize;

    /// Whether every field of `self` exists in `other` under the same key
    /// with a SameValue-equal value.
    fn fields_within(&self, other: &Self) -> bool;
}

/// Shallow structural comparison.
///
/// Identical references are equal. Otherwise both records must have the same
/// number of fields and every key of `a` must exist in `b` with a
/// SameValue-equal value.
pub fn shallow_equal<R: Record + ?Sized>(a: &R, b: &R) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }
    a.field_count() == b.field_count() && a.fields_within(b)
}

/// [`shallow_equal`] for possibly absent records.
///
/// Two absent records are equal; an absent record never equals a present one.
pub fn shallow_equal_opt<R: Record + ?Sized>(a: Option<&R>, b: Option<&R>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => shallow_equal(a, b),
        _ => false,
    }
}

impl<V: SameValue> Record for [V] {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn fields_within(&self, other: &Self) -> bool {
        self.iter()
            .enumerate()
            .all(|(index, value)| other.get(index).is_some_and(|theirs| value.same_value(theirs)))
    }
}

impl<V: SameValue> Record for Vec<V> {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn fields_within(&self, other: &Self) -> bool {
        self.as_slice().fields_within(other.as_slice())
    }
}

impl<K: Eq + Hash, V: SameValue, H: BuildHasher> Record for HashMap<K, V, H> {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn fields_within(&self, other: &Self) -> bool {
        self.iter()
            .all(|(key, value)| other.get(key).is_some_and(|theirs| value.same_value(theirs)))
    }
}

impl<K: Eq + Hash, V: SameValue, H: BuildHasher> Record for IndexMap<K, V, H> {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn fields_within(&self, other: &Self) -> bool {
        self.iter()
            .all(|(key, value)| other.get(key).is_some_and(|theirs| value.same_value(theirs)))
    }
}

impl<K: Ord, V: SameValue> Record for BTreeMap<K, V> {
    fn field_count(&self) -> usize {
        self.len()
    }

    fn fields_within(&self, other: &Self) -> bool {
        self.iter()
            .all(|(key, value)| other.get(key).is_some_and(|theirs| value.same_value(theirs)))
    }
}

impl<R: Record + ?Sized> Record for Rc<R> {
    fn field_count(&self) -> usize {
        (**self).field_count()
    }

    fn fields_within(&self, other: &Self) -> bool {
        (**self).fields_within(&**other)
    }
}

/// Snapshot wrapper whose SameValue equality is [`shallow_equal`].
///
/// Wrap object or array snapshots in `Shallow` so that a freshly built but
/// structurally unchanged snapshot does not force a re-render.
#[derive(Debug, Clone, Default)]
pub struct Shallow<R>(pub R);

impl<R> Shallow<R> {
    /// Unwrap the record.
    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R> std::ops::Deref for Shallow<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.0
    }
}

impl<R: Record> SameValue for Shallow<R> {
    fn same_value(&self, other: &Self) -> bool {
        shallow_equal(&self.0, &other.0)
    }
}
