//! Fixed-capacity arrays as the kernel circuits see them.
//!
//! Circuit inputs are arrays of a fixed size where unused trailing slots hold
//! an "empty" value. [`BoundedVec`] keeps only the occupied prefix and refuses
//! to grow past its capacity; the free functions convert between the packed
//! and padded representations.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Items that have a distinguished "empty" value used for padding.
pub trait IsEmpty {
    /// Returns `true` if this is a padding value.
    fn is_empty(&self) -> bool;
}

/// Side effects ordered by the per-transaction side-effect counter.
pub trait Ordered {
    /// The side-effect counter of this item.
    fn counter(&self) -> u32;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    #[error("{len} items do not fit in an array of capacity {capacity}")]
    Overflow { capacity: usize, len: usize },
    #[error("expected an array of length {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// A vector that never holds more than `N` items.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundedVec<T, const N: usize> {
    items: Vec<T>,
}

impl<T, const N: usize> BoundedVec<T, N> {
    /// Maximum number of items.
    pub const CAPACITY: usize = N;

    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends `item`, failing if the vector is full.
    pub fn push(&mut self, item: T) -> Result<(), CollectionError> {
        if self.items.len() >= N {
            return Err(CollectionError::Overflow {
                capacity: N,
                len: self.items.len() + 1,
            });
        }
        self.items.push(item);
        Ok(())
    }

    /// Appends every item of `iter`. On overflow the vector is left unchanged.
    pub fn try_extend(&mut self, iter: impl IntoIterator<Item = T>) -> Result<(), CollectionError> {
        let before = self.items.len();
        self.items.extend(iter);
        if self.items.len() > N {
            let len = self.items.len();
            self.items.truncate(before);
            return Err(CollectionError::Overflow { capacity: N, len });
        }
        Ok(())
    }

    /// Removes and returns the last item.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Number of free slots.
    pub fn remaining_capacity(&self) -> usize {
        N - self.items.len()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == N
    }

    pub fn clear(&mut self) {
        self.items.clear()
    }

    pub fn retain(&mut self, f: impl FnMut(&T) -> bool) {
        self.items.retain(f)
    }

    pub fn remove(&mut self, index: usize) -> T {
        self.items.remove(index)
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// The circuit view of this vector: `N` items, padded with `T::default()`.
    pub fn padded(&self) -> Vec<T>
    where
        T: Clone + Default,
    {
        let mut out = self.items.clone();
        out.resize_with(N, T::default);
        out
    }
}

impl<T, const N: usize> Default for BoundedVec<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Deref for BoundedVec<T, N> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

// Slices cannot change length, so mutable access keeps the capacity invariant.
impl<T, const N: usize> DerefMut for BoundedVec<T, N> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<T, const N: usize> TryFrom<Vec<T>> for BoundedVec<T, N> {
    type Error = CollectionError;

    fn try_from(items: Vec<T>) -> Result<Self, Self::Error> {
        if items.len() > N {
            return Err(CollectionError::Overflow {
                capacity: N,
                len: items.len(),
            });
        }
        Ok(Self { items })
    }
}

impl<'a, T, const N: usize> IntoIterator for &'a BoundedVec<T, N> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T, const N: usize> IntoIterator for BoundedVec<T, N> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<T: Serialize, const N: usize> Serialize for BoundedVec<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>, const N: usize> Deserialize<'de> for BoundedVec<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Self::try_from(items).map_err(serde::de::Error::custom)
    }
}

/// Pads `items` with `pad` up to `len` items.
pub fn pad_array_end<T: Clone>(
    mut items: Vec<T>,
    pad: T,
    len: usize,
) -> Result<Vec<T>, CollectionError> {
    if items.len() > len {
        return Err(CollectionError::Overflow {
            capacity: len,
            len: items.len(),
        });
    }
    items.resize(len, pad);
    Ok(items)
}

/// Iterates over the non-padding items of a circuit array.
pub fn non_empty_items<T: IsEmpty>(items: &[T]) -> impl Iterator<Item = &T> + '_ {
    items.iter().filter(|item| !item.is_empty())
}

/// Counts the non-padding items of a circuit array.
pub fn array_non_empty_length<T: IsEmpty>(items: &[T]) -> usize {
    non_empty_items(items).count()
}

/// Checks that `items` has exactly `expected` entries.
pub fn assert_length<T>(items: Vec<T>, expected: usize) -> Result<Vec<T>, CollectionError> {
    if items.len() != expected {
        return Err(CollectionError::LengthMismatch {
            expected,
            actual: items.len(),
        });
    }
    Ok(items)
}

/// Sorts `items` by side-effect counter.
///
/// Returns the sorted items together with, for every original position, the
/// position that item moved to. Empty items keep their relative order at the
/// end.
pub fn sort_by_counter_get_sorted_hints<T: Ordered + IsEmpty + Clone>(
    items: &[T],
) -> (Vec<T>, Vec<usize>) {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| (items[i].is_empty(), items[i].counter()));
    let mut hints = vec![0; items.len()];
    for (sorted_index, &original_index) in order.iter().enumerate() {
        hints[original_index] = sorted_index;
    }
    let sorted = order.iter().map(|&i| items[i].clone()).collect();
    (sorted, hints)
}

#[cfg(test)]
mod tests {
    use assert2::{assert, let_assert};

    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Item(u32);

    impl IsEmpty for Item {
        fn is_empty(&self) -> bool {
            self.0 == 0
        }
    }

    impl Ordered for Item {
        fn counter(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn push_past_capacity_fails() {
        let mut v = BoundedVec::<Item, 2>::new();
        v.push(Item(1)).unwrap();
        v.push(Item(2)).unwrap();
        assert!(v.is_full());
        let_assert!(Err(CollectionError::Overflow { capacity: 2, len: 3 }) = v.push(Item(3)));
        assert!(v.len() == 2);
    }

    #[test]
    fn try_extend_is_all_or_nothing() {
        let mut v = BoundedVec::<Item, 3>::new();
        v.push(Item(1)).unwrap();
        assert!(v.try_extend([Item(2), Item(3), Item(4)]).is_err());
        assert!(v.len() == 1);
        v.try_extend([Item(2), Item(3)]).unwrap();
        assert!(v.remaining_capacity() == 0);
    }

    #[test]
    fn padding_and_counting() {
        let padded = pad_array_end(vec![Item(4), Item(0), Item(5)], Item(0), 6).unwrap();
        assert!(padded.len() == 6);
        assert!(array_non_empty_length(&padded) == 2);
        assert!(pad_array_end(vec![Item(1); 3], Item(0), 2).is_err());

        let v = BoundedVec::<Item, 4>::try_from(vec![Item(9)]).unwrap();
        assert!(v.padded() == vec![Item(9), Item(0), Item(0), Item(0)]);
    }

    #[test]
    fn sorted_hints_map_original_to_sorted_positions() {
        let items = [Item(7), Item(0), Item(3), Item(5)];
        let (sorted, hints) = sort_by_counter_get_sorted_hints(&items);
        assert!(sorted == vec![Item(3), Item(5), Item(7), Item(0)]);
        assert!(hints == vec![2, 3, 0, 1]);
        for (original, &target) in items.iter().zip(&hints) {
            assert!(&sorted[target] == original);
        }
    }

    #[test]
    fn deserialize_rejects_oversized_arrays() {
        let res: Result<BoundedVec<u32, 2>, _> = serde_json::from_str("[1,2,3]");
        assert!(res.is_err());
        let ok: BoundedVec<u32, 2> = serde_json::from_str("[1,2]").unwrap();
        assert!(ok.len() == 2);
    }
}
