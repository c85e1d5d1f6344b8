const WORD_BITS: usize = u64::BITS as usize;

/// One occupancy bit per grid cell, packed into 64-bit words. Each row owns
/// a contiguous run of words, so a rectangle test touches `height` rows and
/// only the words overlapping `[x, x + w)` within each.
///
/// Callers validate bounds first, nothing here checks them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridOccupancyIndex {
    width: usize,
    height: usize,
    words_per_row: usize,
    words: Vec<u64>,
}

impl GridOccupancyIndex {
    pub fn new(width: usize, height: usize) -> Self {
        let words_per_row = width.div_ceil(WORD_BITS);
        Self {
            width,
            height,
            words_per_row,
            words: vec![0; words_per_row * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_free(&self, x: usize, y: usize, w: usize, h: usize) -> bool {
        for row in y..y + h {
            let row_start = row * self.words_per_row;
            let mut clear = true;
            Self::for_each_word(x, w, |word, mask| {
                if self.words[row_start + word] & mask != 0 {
                    clear = false;
                }
            });
            if !clear {
                return false;
            }
        }
        true
    }

    pub fn fill(&mut self, x: usize, y: usize, w: usize, h: usize) {
        for row in y..y + h {
            let row_start = row * self.words_per_row;
            let words = &mut self.words;
            Self::for_each_word(x, w, |word, mask| {
                words[row_start + word] |= mask;
            });
        }
    }

    pub fn clear(&mut self, x: usize, y: usize, w: usize, h: usize) {
        for row in y..y + h {
            let row_start = row * self.words_per_row;
            let words = &mut self.words;
            Self::for_each_word(x, w, |word, mask| {
                words[row_start + word] &= !mask;
            });
        }
    }

    pub fn clear_all(&mut self) {
        self.words.iter_mut().for_each(|word| *word = 0);
    }

    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        let word = self.words[y * self.words_per_row + x / WORD_BITS];
        word & (1 << (x % WORD_BITS)) != 0
    }

    pub fn occupied_count(&self) -> usize {
        self.words
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum()
    }

    // Splits the column span [x, x + w) into per-word masks
    fn for_each_word(x: usize, w: usize, mut f: impl FnMut(usize, u64)) {
        let end = x + w;
        let mut column = x;
        while column < end {
            let word = column / WORD_BITS;
            let bit = column % WORD_BITS;
            let span = (WORD_BITS - bit).min(end - column);
            let mask = if span == WORD_BITS {
                u64::MAX
            } else {
                ((1_u64 << span) - 1) << bit
            };
            f(word, mask);
            column += span;
        }
    }
}
