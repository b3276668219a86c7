//! Dependency Lists
//!
//! A dependency list is an ordered sequence of comparison keys. A scope cache
//! entry (memo, lazy source, effect) is reused while its list is unchanged
//! and rebuilt when any key changes under SameValue or the length changes.
//!
//! Identity keys hold a strong reference to the object they identify, so an
//! address cannot be reused by a new allocation while the key is alive.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::equality::SameValue;

/// One comparison key in a dependency list.
#[derive(Clone)]
pub enum DepKey {
    /// Absent value.
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(Rc<str>),
    /// Identity of a shared handle.
    Ref {
        addr: *const (),
        keep_alive: Rc<dyn Any>,
    },
}

impl DepKey {
    /// Key on the identity of `handle`.
    pub fn identity<T: ?Sized + 'static>(handle: &Rc<T>) -> Self {
        DepKey::Ref {
            addr: Rc::as_ptr(handle) as *const (),
            keep_alive: Rc::new(Rc::clone(handle)),
        }
    }
}

impl SameValue for DepKey {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (DepKey::Null, DepKey::Null) => true,
            (DepKey::Bool(a), DepKey::Bool(b)) => a == b,
            (DepKey::Int(a), DepKey::Int(b)) => a == b,
            (DepKey::Uint(a), DepKey::Uint(b)) => a == b,
            (DepKey::Float(a), DepKey::Float(b)) => a.same_value(b),
            (DepKey::Str(a), DepKey::Str(b)) => a == b,
            (DepKey::Ref { addr: a, .. }, DepKey::Ref { addr: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for DepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepKey::Null => f.write_str("Null"),
            DepKey::Bool(v) => write!(f, "Bool({v})"),
            DepKey::Int(v) => write!(f, "Int({v})"),
            DepKey::Uint(v) => write!(f, "Uint({v})"),
            DepKey::Float(v) => write!(f, "Float({v})"),
            DepKey::Str(v) => write!(f, "Str({v:?})"),
            DepKey::Ref { addr, .. } => write!(f, "Ref({addr:p})"),
        }
    }
}

macro_rules! dep_key_from {
    ($variant:ident, $target:ty: $($ty:ty),*) => {
        $(
            impl From<$ty> for DepKey {
                fn from(value: $ty) -> Self {
                    DepKey::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

dep_key_from!(Bool, bool: bool);
dep_key_from!(Int, i64: i8, i16, i32, i64);
dep_key_from!(Uint, u64: u8, u16, u32, u64);
dep_key_from!(Float, f64: f32, f64);

impl From<usize> for DepKey {
    fn from(value: usize) -> Self {
        DepKey::Uint(value as u64)
    }
}

impl From<()> for DepKey {
    fn from(_: ()) -> Self {
        DepKey::Null
    }
}

impl From<&str> for DepKey {
    fn from(value: &str) -> Self {
        DepKey::Str(Rc::from(value))
    }
}

impl From<String> for DepKey {
    fn from(value: String) -> Self {
        DepKey::Str(Rc::from(value))
    }
}

impl<T: Into<DepKey>> From<Option<T>> for DepKey {
    fn from(value: Option<T>) -> Self {
        value.map_or(DepKey::Null, Into::into)
    }
}

/// An ordered dependency list.
pub type Deps = SmallVec<[DepKey; 4]>;

/// Build a [`Deps`] list from values convertible into [`DepKey`].
///
/// ```rust,ignore
/// let deps = deps!["user", 42, lazy.key()];
/// ```
#[macro_export]
macro_rules! deps {
    () => {
        $crate::deps::Deps::new()
    };
    ($($key:expr),+ $(,)?) => {{
        let mut deps = $crate::deps::Deps::new();
        $( deps.push($crate::deps::DepKey::from($key)); )+
        deps
    }};
}

/// Whether `next` differs from `previous`.
///
/// A length change counts as a change; otherwise keys are compared pairwise
/// with SameValue.
pub fn deps_changed(previous: &[DepKey], next: &[DepKey]) -> bool {
    previous.len() != next.len()
        || previous
            .iter()
            .zip(next)
            .any(|(before, after)| !before.same_value(after))
}

/// Concatenate two lists.
pub(crate) fn chain(head: Deps, tail: Option<&Deps>) -> Deps {
    let mut deps = head;
    if let Some(tail) = tail {
        deps.extend(tail.iter().cloned());
    }
    deps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_lists_are_unchanged() {
        assert!(!deps_changed(&deps!["a", 1, true], &deps!["a", 1, true]));
        assert!(!deps_changed(&deps![], &deps![]));
    }

    #[test]
    fn length_change_is_a_change() {
        assert!(deps_changed(&deps![1], &deps![1, 2]));
        assert!(deps_changed(&deps![1, 2], &deps![1]));
    }

    #[test]
    fn keys_compare_with_same_value() {
        assert!(!deps_changed(&deps![f64::NAN], &deps![f64::NAN]));
        assert!(deps_changed(&deps![0.0], &deps![-0.0]));
        assert!(deps_changed(&deps!["A"], &deps!["B"]));
        // Different kinds never match.
        assert!(deps_changed(&deps![1], &deps![1_u32]));
    }

    #[test]
    fn identity_keys() {
        let a = Rc::new(5);
        let b = Rc::new(5);
        assert!(!deps_changed(&deps![DepKey::identity(&a)], &deps![DepKey::identity(&a)]));
        assert!(deps_changed(&deps![DepKey::identity(&a)], &deps![DepKey::identity(&b)]));
    }

    #[test]
    fn option_maps_to_null() {
        assert!(!deps_changed(&deps![None::<i32>], &deps![()]));
        assert!(deps_changed(&deps![Some(1)], &deps![None::<i32>]));
    }

    #[test]
    fn chain_appends() {
        let joined = chain(deps![1], Some(&deps![2, 3]));
        assert_eq!(joined.len(), 3);
        assert_eq!(chain(deps![1], None).len(), 1);
    }
}
