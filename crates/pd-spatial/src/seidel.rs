//! Exact all-pairs shortest paths on an unweighted, undirected, connected
//! graph (Seidel's algorithm).
//!
//! ```text
//! apsp(A):
//!   if A is complete:           D = A
//!   B = A ∪ A²   (off-diagonal)
//!   T = apsp(B)                 # distances halved, rounded up
//!   X = T · A
//!   D[i][j] = 2·T[i][j]         if X[i][j] ≥ T[i][j] · deg(j)
//!             2·T[i][j] − 1     otherwise
//! ```
//!
//! Each level halves the diameter, so recursion depth is ⌈log₂ diameter⌉+1.
//! The caller passes a hard bound; exceeding it means the input was not
//! connected and is reported as [`SpatialError::RecursionLimit`] instead of
//! recursing forever.
//!
//! Boolean squaring runs on 64-bit row bitsets.  `T · A` only touches the
//! non-zero entries of `A` through per-column neighbor lists.

use crate::{SpatialError, SpatialResult};

// ── BitMatrix ─────────────────────────────────────────────────────────────────

/// Square boolean matrix, one bitset row per vertex.
#[derive(Clone)]
struct BitMatrix {
    n:     usize,
    words: usize,
    bits:  Vec<u64>,
}

impl BitMatrix {
    fn new(n: usize) -> Self {
        let words = n.div_ceil(64);
        Self { n, words, bits: vec![0; n * words] }
    }

    #[inline]
    fn set(&mut self, i: usize, j: usize) {
        self.bits[i * self.words + j / 64] |= 1u64 << (j % 64);
    }

    #[inline]
    fn clear(&mut self, i: usize, j: usize) {
        self.bits[i * self.words + j / 64] &= !(1u64 << (j % 64));
    }

    #[inline]
    fn row(&self, i: usize) -> &[u64] {
        &self.bits[i * self.words..(i + 1) * self.words]
    }

    /// Column indices of the set bits in row `i`.
    fn ones(&self, i: usize) -> Vec<usize> {
        let mut out = Vec::new();
        for (w, &word) in self.row(i).iter().enumerate() {
            let mut word = word;
            while word != 0 {
                let bit = word.trailing_zeros() as usize;
                out.push(w * 64 + bit);
                word &= word - 1;
            }
        }
        out
    }

    fn count_ones(&self, i: usize) -> usize {
        self.row(i).iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Every vertex is adjacent to every other vertex.
    fn is_complete(&self) -> bool {
        (0..self.n).all(|i| self.count_ones(i) == self.n - 1)
    }

    /// `A ∪ A²` with the diagonal cleared.
    fn square_union(&self) -> BitMatrix {
        let mut out = self.clone();
        for i in 0..self.n {
            for k in self.ones(i) {
                let (dst, src) = (i * self.words, k * self.words);
                for w in 0..self.words {
                    out.bits[dst + w] |= self.bits[src + w];
                }
            }
            out.clear(i, i);
        }
        out
    }
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Distance matrix (row-major, `n × n`) of the graph given as adjacency
/// lists over local indices `0..n`.  The graph must be connected.
pub fn all_pairs(adjacency: &[Vec<u32>]) -> SpatialResult<Vec<u32>> {
    let n = adjacency.len();
    if n <= 1 {
        return Ok(vec![0; n * n]);
    }

    let mut a = BitMatrix::new(n);
    for (i, nbrs) in adjacency.iter().enumerate() {
        for &j in nbrs {
            let j = j as usize;
            if j != i {
                a.set(i, j);
                a.set(j, i);
            }
        }
    }

    // Diameter ≤ n − 1, so ⌈log₂ n⌉ + 1 levels always suffice.
    let max_depth = usize::BITS - (n - 1).leading_zeros() + 1;
    seidel(&a, 0, max_depth)
}

fn seidel(a: &BitMatrix, depth: u32, max_depth: u32) -> SpatialResult<Vec<u32>> {
    let n = a.n;
    if depth > max_depth {
        return Err(SpatialError::RecursionLimit(max_depth));
    }

    if a.is_complete() {
        let mut d = vec![1u32; n * n];
        for i in 0..n {
            d[i * n + i] = 0;
        }
        return Ok(d);
    }

    let t = seidel(&a.square_union(), depth + 1, max_depth)?;

    let neighbors: Vec<Vec<usize>> = (0..n).map(|j| a.ones(j)).collect();
    let mut d = vec![0u32; n * n];
    for i in 0..n {
        let t_row = &t[i * n..(i + 1) * n];
        for j in 0..n {
            if i == j {
                continue;
            }
            let x: u64 = neighbors[j].iter().map(|&k| t_row[k] as u64).sum();
            let tij = t_row[j];
            d[i * n + j] = if x >= tij as u64 * neighbors[j].len() as u64 {
                2 * tij
            } else {
                2 * tij - 1
            };
        }
    }
    Ok(d)
}
