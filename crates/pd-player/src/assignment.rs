//! Team task assignment.
//!
//! Rows are agents (self first), columns are intentions, entries are
//! utilities.  [`assign_max`] finds the one-to-one assignment with the
//! largest total utility using the Hungarian algorithm with potentials.
//!
//! # Rectangular matrices
//!
//! The matrix is padded with zero columns (or rows) to a square.  A row
//! matched to a padding column gets `None`: that agent has no task this
//! round.  Because padding is zero, an agent is only ever pulled onto a
//! real intention when that raises the team total.

/// Maximum-weight assignment.  `weights[row][col]`; every row must have the
/// same length.  Returns, per row, the column it was assigned.
///
/// Negative weights are treated as zero.  Among equal-total assignments the
/// lowest-index row wins contested columns.
pub fn assign_max(weights: &[Vec<f64>]) -> Vec<Option<usize>> {
    let rows = weights.len();
    let cols = weights.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return vec![None; rows];
    }
    let n = rows.max(cols);

    let weight = |r: usize, c: usize| -> f64 {
        if r < rows && c < cols {
            weights[r].get(c).copied().unwrap_or(0.0).max(0.0)
        } else {
            0.0
        }
    };
    let top = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .map(|(r, c)| weight(r, c))
        .fold(0.0_f64, f64::max);

    // Convert to a minimisation over 1-based indices.  The tiny row bias
    // makes ties resolve toward earlier rows deterministically.
    let cost = |r: usize, c: usize| -> f64 {
        let bias = if r <= rows && c <= cols { (r - 1) as f64 * 1e-9 } else { 0.0 };
        top - weight(r - 1, c - 1) + bias
    };

    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; n + 1];
    // p[col] = row matched to col (0 = none); way[col] = previous col on the
    // augmenting path.
    let mut p = vec![0_usize; n + 1];
    let mut way = vec![0_usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0;
        let mut minv = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let cur = cost(i0, j) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        // Augment along the alternating path.
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut out = vec![None; rows];
    for (col, &row) in p.iter().enumerate().skip(1) {
        if row >= 1 && row <= rows && col <= cols {
            out[row - 1] = Some(col - 1);
        }
    }
    out
}

/// Total weight of an assignment returned by [`assign_max`].
pub fn total_weight(weights: &[Vec<f64>], assignment: &[Option<usize>]) -> f64 {
    assignment
        .iter()
        .enumerate()
        .filter_map(|(r, c)| c.map(|c| weights[r][c].max(0.0)))
        .sum()
}
