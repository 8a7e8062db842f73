use std::fmt;

use super::PackageId;

const WORD_BITS: usize = 64;

/// A set of package ids backed by a bitmap.
///
/// Ids are positive, so bit 0 of the first word is never used. Sets handed out by the
/// goal are always independent copies.
#[derive(Clone, Default)]
pub struct PackageSet {
    words: Vec<u64>,
}

impl PackageSet {
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Create a set able to hold ids up to `max_id` without growing
    pub fn with_capacity(max_id: usize) -> Self {
        Self {
            words: vec![0; max_id / WORD_BITS + 1],
        }
    }

    #[inline]
    fn position(id: PackageId) -> Option<(usize, u64)> {
        if id <= 0 {
            return None;
        }
        let id = id as usize;
        Some((id / WORD_BITS, 1u64 << (id % WORD_BITS)))
    }

    pub fn set(&mut self, id: PackageId) {
        let Some((word, mask)) = Self::position(id) else {
            return;
        };
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= mask;
    }

    pub fn remove(&mut self, id: PackageId) {
        if let Some((word, mask)) = Self::position(id) {
            if let Some(w) = self.words.get_mut(word) {
                *w &= !mask;
            }
        }
    }

    #[inline]
    pub fn has(&self, id: PackageId) -> bool {
        match Self::position(id) {
            Some((word, mask)) => self.words.get(word).is_some_and(|w| w & mask != 0),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Add every id of `other` to this set
    pub fn union_with(&mut self, other: &PackageSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= o;
        }
    }

    /// Keep only ids also present in `other`
    pub fn intersect_with(&mut self, other: &PackageSet) {
        for (i, w) in self.words.iter_mut().enumerate() {
            *w &= other.words.get(i).copied().unwrap_or(0);
        }
    }

    /// Drop every id present in `other`
    pub fn difference_with(&mut self, other: &PackageSet) {
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w &= !o;
        }
    }

    pub fn intersection(&self, other: &PackageSet) -> PackageSet {
        let mut result = self.clone();
        result.intersect_with(other);
        result
    }

    /// Smallest id greater than `after`, or `None`
    pub fn next(&self, after: PackageId) -> Option<PackageId> {
        let start = (after.max(0) as usize) + 1;
        let mut word = start / WORD_BITS;
        if word >= self.words.len() {
            return None;
        }

        let mut bits = self.words[word] & (!0u64 << (start % WORD_BITS));
        loop {
            if bits != 0 {
                return Some((word * WORD_BITS + bits.trailing_zeros() as usize) as PackageId);
            }
            word += 1;
            if word >= self.words.len() {
                return None;
            }
            bits = self.words[word];
        }
    }

    /// Iterate ids in ascending order
    pub fn iter(&self) -> impl Iterator<Item = PackageId> + '_ {
        let mut current = 0;
        std::iter::from_fn(move || {
            let next = self.next(current)?;
            current = next;
            Some(next)
        })
    }
}

impl FromIterator<PackageId> for PackageSet {
    fn from_iter<I: IntoIterator<Item = PackageId>>(iter: I) -> Self {
        let mut set = PackageSet::new();
        for id in iter {
            set.set(id);
        }
        set
    }
}

impl Extend<PackageId> for PackageSet {
    fn extend<I: IntoIterator<Item = PackageId>>(&mut self, iter: I) {
        for id in iter {
            self.set(id);
        }
    }
}

impl PartialEq for PackageSet {
    fn eq(&self, other: &Self) -> bool {
        let len = self.words.len().max(other.words.len());
        (0..len).all(|i| self.words.get(i).copied().unwrap_or(0) == other.words.get(i).copied().unwrap_or(0))
    }
}

impl Eq for PackageSet {}

impl fmt::Debug for PackageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
