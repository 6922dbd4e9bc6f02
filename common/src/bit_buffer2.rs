//! Bit-packed 2D buffer for binary masks.
//!
//! Rows are padded to whole `u64` words so run extraction can scan one row
//! with word-level bit tricks without straddling into the next row.

use std::ops::Index;

/// Number of bits per storage word.
pub const BITS_PER_WORD: usize = 64;

/// A 2D binary mask stored as row-aligned packed bits (LSB = lowest x).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBuffer2 {
    words: Vec<u64>,
    width: usize,
    height: usize,
    words_per_row: usize,
}

impl BitBuffer2 {
    /// Create a new mask filled with the given value.
    pub fn new_filled(width: usize, height: usize, value: bool) -> Self {
        let words_per_row = width.div_ceil(BITS_PER_WORD);
        let mut buf = Self {
            words: vec![0u64; words_per_row * height],
            width,
            height,
            words_per_row,
        };
        if value {
            buf.fill(true);
        }
        buf
    }

    /// Create a new mask with all bits cleared.
    #[inline]
    pub fn new_default(width: usize, height: usize) -> Self {
        Self::new_filled(width, height, false)
    }

    /// Create a mask from a row-major slice of booleans.
    pub fn from_slice(width: usize, height: usize, data: &[bool]) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "data length {} does not match dimensions {}x{}",
            data.len(),
            width,
            height
        );
        Self::from_fn(width, height, |x, y| data[y * width + x])
    }

    /// Build a mask by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut buf = Self::new_default(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    buf.set_xy(x, y, true);
                }
            }
        }
        buf
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of pixels (`width * height`).
    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn words_per_row(&self) -> usize {
        self.words_per_row
    }

    #[inline]
    fn locate(&self, x: usize, y: usize) -> (usize, u64) {
        debug_assert!(x < self.width && y < self.height);
        let word = y * self.words_per_row + x / BITS_PER_WORD;
        (word, 1u64 << (x % BITS_PER_WORD))
    }

    #[inline]
    pub fn get_xy(&self, x: usize, y: usize) -> bool {
        let (word, bit) = self.locate(x, y);
        self.words[word] & bit != 0
    }

    #[inline]
    pub fn set_xy(&mut self, x: usize, y: usize, value: bool) {
        let (word, bit) = self.locate(x, y);
        if value {
            self.words[word] |= bit;
        } else {
            self.words[word] &= !bit;
        }
    }

    /// Get a bit by row-major linear index.
    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        self.get_xy(idx % self.width, idx / self.width)
    }

    /// Set a bit by row-major linear index.
    #[inline]
    pub fn set(&mut self, idx: usize, value: bool) {
        self.set_xy(idx % self.width, idx / self.width, value);
    }

    /// Fill all pixels with the given value; padding bits stay clear.
    pub fn fill(&mut self, value: bool) {
        if !value {
            self.words.fill(0);
            return;
        }
        let tail_bits = self.width % BITS_PER_WORD;
        let tail_mask = if tail_bits == 0 {
            !0u64
        } else {
            (1u64 << tail_bits) - 1
        };
        for row in self.words.chunks_mut(self.words_per_row.max(1)) {
            row.fill(!0u64);
            if let Some(last) = row.last_mut() {
                *last = tail_mask;
            }
        }
    }

    /// Packed words of one row. Bits past `width` are always zero.
    #[inline]
    pub fn row_words(&self, y: usize) -> &[u64] {
        &self.words[y * self.words_per_row..(y + 1) * self.words_per_row]
    }

    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Mutable word storage; rows are `words_per_row` words long.
    /// Callers must keep padding bits zero.
    #[inline]
    pub fn words_mut(&mut self) -> &mut [u64] {
        &mut self.words
    }

    /// Count set pixels.
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterate over all pixel values in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| self.get_xy(x, y)))
    }
}

impl Index<(usize, usize)> for BitBuffer2 {
    type Output = bool;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        if self.get_xy(x, y) {
            &true
        } else {
            &false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_filled_true_keeps_padding_clear() {
        let buf = BitBuffer2::new_filled(70, 3, true);
        assert_eq!(buf.words_per_row(), 2);
        assert_eq!(buf.count_ones(), 70 * 3);
        for y in 0..3 {
            assert_eq!(buf.row_words(y)[1], (1u64 << 6) - 1);
        }
    }

    #[test]
    fn test_set_get_xy_across_word_boundary() {
        let mut buf = BitBuffer2::new_default(130, 4);
        buf.set_xy(63, 1, true);
        buf.set_xy(64, 1, true);
        buf.set_xy(129, 3, true);

        assert!(buf.get_xy(63, 1));
        assert!(buf.get_xy(64, 1));
        assert!(buf.get_xy(129, 3));
        assert!(!buf.get_xy(65, 1));
        assert!(!buf.get_xy(63, 0));
        assert_eq!(buf.count_ones(), 3);

        buf.set_xy(64, 1, false);
        assert!(!buf.get_xy(64, 1));
    }

    #[test]
    fn test_linear_index_matches_xy() {
        let mut buf = BitBuffer2::new_default(10, 10);
        buf.set(42, true);
        assert!(buf.get_xy(2, 4));
        assert!(buf[(2, 4)]);
    }

    #[test]
    fn test_from_slice_roundtrip_iter() {
        let data = vec![true, false, true, false, false, true];
        let buf = BitBuffer2::from_slice(3, 2, &data);
        let back: Vec<bool> = buf.iter().collect();
        assert_eq!(back, data);
    }

    #[test]
    fn test_fill_false_clears() {
        let mut buf = BitBuffer2::new_filled(65, 2, true);
        buf.fill(false);
        assert_eq!(buf.count_ones(), 0);
    }
}
