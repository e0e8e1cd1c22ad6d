use crate::grid::{CellIndex, GridModel};

/// Set of selected grid cells, backed by a bitset over row-major cell numbers.
///
/// Ordering contract:
/// - Iteration yields cells in ascending row-major order (`i` major, then `j`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellSelection {
    n_lat: usize,
    n_lon: usize,
    words: Vec<u64>,
    len: usize,
}

impl CellSelection {
    /// Empty selection for a grid of `n_lat` rows by `n_lon` columns. Cells
    /// outside those dimensions are never stored.
    pub fn new(n_lat: usize, n_lon: usize) -> Self {
        Self {
            n_lat,
            n_lon: n_lon.max(1),
            words: Vec::new(),
            len: 0,
        }
    }

    pub fn for_grid(grid: &GridModel) -> Self {
        Self::new(grid.n_lat(), grid.n_lon())
    }

    pub fn from_cells(n_lat: usize, n_lon: usize, cells: impl IntoIterator<Item = CellIndex>) -> Self {
        let mut s = Self::new(n_lat, n_lon);
        for c in cells {
            s.insert(c);
        }
        s
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, cell: CellIndex) -> bool {
        let Some(flat) = self.flat(cell) else {
            return false;
        };
        let (word, bit) = word_bit(flat);
        self.words
            .get(word)
            .is_some_and(|w| (w & (1u64 << bit)) != 0)
    }

    /// Inserts `cell` into the set.
    ///
    /// Returns `true` if the set changed.
    pub fn insert(&mut self, cell: CellIndex) -> bool {
        let Some(flat) = self.flat(cell) else {
            return false;
        };
        let (word, bit) = word_bit(flat);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        let w = &mut self.words[word];
        if (*w & mask) != 0 {
            return false;
        }
        *w |= mask;
        self.len += 1;
        true
    }

    /// Iterates selected cells in ascending row-major order.
    pub fn iter(&self) -> impl Iterator<Item = CellIndex> + '_ {
        let n_lon = self.n_lon;
        SelectionIndexIter {
            words: &self.words,
            word_index: 0,
            current_word: 0,
            base_index: 0,
        }
        .map(move |flat| CellIndex::new(flat / n_lon, flat % n_lon))
    }

    pub fn to_vec(&self) -> Vec<CellIndex> {
        self.iter().collect()
    }

    /// Panel caption shown to the user for this selection.
    pub fn summary_text(&self) -> String {
        format!("Adjust {} selected cells", self.len)
    }

    fn flat(&self, cell: CellIndex) -> Option<usize> {
        if cell.i >= self.n_lat || cell.j >= self.n_lon {
            return None;
        }
        Some(cell.i * self.n_lon + cell.j)
    }
}

fn word_bit(index: usize) -> (usize, u32) {
    (index / 64, (index % 64) as u32)
}

struct SelectionIndexIter<'a> {
    words: &'a [u64],
    word_index: usize,
    current_word: u64,
    base_index: usize,
}

impl Iterator for SelectionIndexIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let tz = self.current_word.trailing_zeros();
                self.current_word &= !(1u64 << tz);
                return Some(self.base_index + tz as usize);
            }

            let w = *self.words.get(self.word_index)?;
            self.current_word = w;
            self.base_index = self.word_index * 64;
            self.word_index += 1;
        }
    }
}
