//! Overwrite-if-set deep merge.
//!
//! A value in the override replaces the receiver's value only when it is
//! set: non-empty strings, non-zero numbers and durations, `true` booleans,
//! `Some` options, non-empty lists. Lists are replaced whole. Maps are merged
//! key by key. Structs recurse field by field through [`merge_struct!`].

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Merge a user override onto a baseline in place.
pub trait Merge {
    /// Leaf values are replaced wholesale inside an `Option` instead of being
    /// merged, so `Some(false)` can override `Some(true)`.
    const ATOMIC: bool = false;

    /// Overwrite `self` with every set value of `other`.
    fn merge_from(&mut self, other: &Self);
}

/// Implement [`Merge`] for a struct by merging the listed fields.
///
/// Every field must be listed; a missing field fails to compile.
#[macro_export]
macro_rules! merge_struct {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::Merge for $ty {
            fn merge_from(&mut self, other: &Self) {
                let Self { $($field),* } = other;
                $( $crate::Merge::merge_from(&mut self.$field, $field); )*
            }
        }
    };
}

macro_rules! merge_scalar {
    ($($ty:ty),*) => {
        $(
            impl Merge for $ty {
                const ATOMIC: bool = true;

                fn merge_from(&mut self, other: &Self) {
                    if *other != <$ty>::default() {
                        *self = other.clone();
                    }
                }
            }
        )*
    };
}

merge_scalar!(String, bool, i32, i64, u16, u32, u64, usize, f64);

impl<T: Merge + Clone> Merge for Option<T> {
    fn merge_from(&mut self, other: &Self) {
        let Some(theirs) = other else {
            return;
        };
        match self {
            Some(ours) if !T::ATOMIC => ours.merge_from(theirs),
            _ => *self = Some(theirs.clone()),
        }
    }
}

impl<T: Clone> Merge for Vec<T> {
    fn merge_from(&mut self, other: &Self) {
        if !other.is_empty() {
            *self = other.clone();
        }
    }
}

impl<K: Ord + Clone, V: Clone> Merge for BTreeMap<K, V> {
    fn merge_from(&mut self, other: &Self) {
        for (k, v) in other {
            self.insert(k.clone(), v.clone());
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Merge for HashMap<K, V> {
    fn merge_from(&mut self, other: &Self) {
        for (k, v) in other {
            self.insert(k.clone(), v.clone());
        }
    }
}
