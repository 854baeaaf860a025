// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sequence and fragment numbering.
//!
//! `SequenceNumberSet` and `FragmentNumberSet` mirror the RTPS bitmap sets
//! carried by ACKNACK and NACK_FRAG submessages (DDS-RTPS v2.5 Sec.9.4.2.6 and
//! Sec.9.4.2.8): a base number followed by up to 256 bits, bit `i` standing for
//! `base + i`. Wire decoding lives elsewhere; these are the decoded forms.

/// Writer-assigned sample number. Starts at 1; 0 means "unknown / none".
pub type SequenceNumber = u64;

/// 1-based fragment index within one sample.
pub type FragmentNumber = u32;

/// Sequence number meaning "nothing acknowledged yet".
pub const SEQUENCE_NUMBER_UNKNOWN: SequenceNumber = 0;

/// Maximum number of bitmap bits (RTPS limit).
pub const MAX_BITMAP_BITS: u32 = 256;
const WORD_BITS: u32 = 32;
const BITMAP_WORDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Bitmap {
    num_bits: u32,
    words: [u32; BITMAP_WORDS],
}

impl Bitmap {
    fn set(&mut self, offset: u32) {
        let word = (offset / WORD_BITS) as usize;
        let bit = offset % WORD_BITS;
        self.words[word] |= 1 << (31 - bit);
        self.num_bits = self.num_bits.max(offset + 1);
    }

    fn is_set(&self, offset: u32) -> bool {
        if offset >= self.num_bits {
            return false;
        }
        let word = (offset / WORD_BITS) as usize;
        let bit = offset % WORD_BITS;
        self.words[word] & (1 << (31 - bit)) != 0
    }

    fn offsets(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.num_bits).filter(move |&offset| self.is_set(offset))
    }

    fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }
}

/// Set of sequence numbers (ACKNACK `readerSNState`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceNumberSet {
    base: SequenceNumber,
    bitmap: Bitmap,
}

impl SequenceNumberSet {
    /// Maximum number of bitmap bits (RTPS limit).
    pub const MAX_BITS: u32 = MAX_BITMAP_BITS;

    /// Create an empty set with the provided base sequence number.
    pub fn empty(base: SequenceNumber) -> Self {
        Self {
            base,
            bitmap: Bitmap::default(),
        }
    }

    /// Create from explicit sequence numbers (must be >= base and < base + 256).
    ///
    /// Returns `None` if any sequence falls outside the bitmap window.
    pub fn from_sequences(base: SequenceNumber, sequences: &[SequenceNumber]) -> Option<Self> {
        let mut set = Self::empty(base);
        for &seq in sequences {
            if !set.insert(seq) {
                return None;
            }
        }
        Some(set)
    }

    /// Add a sequence number. Returns `false` if it lies outside the window.
    pub fn insert(&mut self, seq: SequenceNumber) -> bool {
        match seq.checked_sub(self.base) {
            Some(offset) if offset < u64::from(Self::MAX_BITS) => {
                self.bitmap.set(offset as u32);
                true
            }
            _ => false,
        }
    }

    /// Base sequence number of the set.
    ///
    /// In an ACKNACK this is the first sequence number the reader is missing:
    /// everything below it is acknowledged.
    pub fn base(&self) -> SequenceNumber {
        self.base
    }

    /// Number of bitmap bits actually used.
    pub fn num_bits(&self) -> u32 {
        self.bitmap.num_bits
    }

    /// True if no sequence number is set.
    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    /// Check membership.
    pub fn contains(&self, seq: SequenceNumber) -> bool {
        match seq.checked_sub(self.base) {
            Some(offset) if offset < u64::from(Self::MAX_BITS) => {
                self.bitmap.is_set(offset as u32)
            }
            _ => false,
        }
    }

    /// Iterate through all sequence numbers contained in the set, ascending.
    pub fn iter(&self) -> impl Iterator<Item = SequenceNumber> + '_ {
        self.bitmap.offsets().map(move |o| self.base + u64::from(o))
    }
}

impl std::fmt::Display for SequenceNumberSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:[", self.base)?;
        for (i, seq) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", seq)?;
        }
        write!(f, "]")
    }
}

/// Set of fragment numbers (NACK_FRAG `fragmentNumberState`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentNumberSet {
    base: FragmentNumber,
    bitmap: Bitmap,
}

impl FragmentNumberSet {
    /// Maximum number of bitmap bits (RTPS limit).
    pub const MAX_BITS: u32 = MAX_BITMAP_BITS;

    /// Create an empty set with the provided base fragment number.
    pub fn empty(base: FragmentNumber) -> Self {
        Self {
            base,
            bitmap: Bitmap::default(),
        }
    }

    /// Create from explicit fragment numbers (must be >= base and < base + 256).
    pub fn from_fragments(base: FragmentNumber, fragments: &[FragmentNumber]) -> Option<Self> {
        let mut set = Self::empty(base);
        for &frag in fragments {
            if !set.insert(frag) {
                return None;
            }
        }
        Some(set)
    }

    /// Add a fragment number. Returns `false` if it lies outside the window.
    pub fn insert(&mut self, frag: FragmentNumber) -> bool {
        match frag.checked_sub(self.base) {
            Some(offset) if offset < Self::MAX_BITS => {
                self.bitmap.set(offset);
                true
            }
            _ => false,
        }
    }

    /// Base fragment number of the set.
    pub fn base(&self) -> FragmentNumber {
        self.base
    }

    /// True if no fragment is set.
    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    /// Iterate through all fragment numbers contained in the set, ascending.
    pub fn iter(&self) -> impl Iterator<Item = FragmentNumber> + '_ {
        self.bitmap.offsets().map(move |o| self.base + o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_set_iteration_is_sorted() {
        let set = SequenceNumberSet::from_sequences(10, &[42, 10, 13]).expect("in window");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![10, 13, 42]);
        assert!(set.contains(13));
        assert!(!set.contains(11));
        assert!(!set.contains(9));
        assert_eq!(set.num_bits(), 33);
    }

    #[test]
    fn test_sequence_set_window_limits() {
        assert!(SequenceNumberSet::from_sequences(5, &[4]).is_none());
        assert!(SequenceNumberSet::from_sequences(5, &[5 + 256]).is_none());
        let set = SequenceNumberSet::from_sequences(5, &[5 + 255]).expect("last bit");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![260]);
    }

    #[test]
    fn test_empty_sets() {
        let set = SequenceNumberSet::empty(7);
        assert!(set.is_empty());
        assert_eq!(set.base(), 7);
        assert_eq!(set.iter().count(), 0);
        assert_eq!(set.to_string(), "7:[]");

        let frags = FragmentNumberSet::empty(1);
        assert!(frags.is_empty());
    }

    #[test]
    fn test_fragment_set() {
        let set = FragmentNumberSet::from_fragments(1, &[3, 1]).expect("in window");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 3]);
        assert!(FragmentNumberSet::from_fragments(2, &[1]).is_none());
    }

    #[test]
    fn test_display() {
        let set = SequenceNumberSet::from_sequences(3, &[3, 5]).expect("in window");
        assert_eq!(set.to_string(), "3:[3 5]");
    }
}
