//! First-party dense matrix helpers for the Gaussian process.
//!
//! None of the numerical work here needs a linear-algebra crate: matrices
//! stay small (one row per observed sample within a single optimization
//! run), so a plain Gauss-Jordan solve is both simpler and easier to audit
//! than pulling in BLAS/LAPACK bindings for a handful of n x n systems.

pub type Matrix = Vec<Vec<f64>>;

pub fn zeros(rows: usize, cols: usize) -> Matrix {
    vec![vec![0.0; cols]; rows]
}

pub fn identity(n: usize) -> Matrix {
    let mut m = zeros(n, n);
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

pub fn add_diagonal(m: &mut Matrix, value: f64) {
    for (i, row) in m.iter_mut().enumerate() {
        row[i] += value;
    }
}

/// Matrix-matrix product.
pub fn matmul(a: &Matrix, b: &Matrix) -> Matrix {
    let (n, k) = (a.len(), a.first().map_or(0, Vec::len));
    let m = b.first().map_or(0, Vec::len);
    let mut out = zeros(n, m);
    for i in 0..n {
        for (l, row_l) in b.iter().enumerate().take(k) {
            let a_il = a[i][l];
            if a_il == 0.0 {
                continue;
            }
            for j in 0..m {
                out[i][j] += a_il * row_l[j];
            }
        }
    }
    out
}

pub fn transpose(a: &Matrix) -> Matrix {
    if a.is_empty() {
        return Vec::new();
    }
    let (n, m) = (a.len(), a[0].len());
    let mut out = zeros(m, n);
    for i in 0..n {
        for j in 0..m {
            out[j][i] = a[i][j];
        }
    }
    out
}

/// Matrix-vector product.
pub fn matvec(a: &Matrix, v: &[f64]) -> Vec<f64> {
    a.iter()
        .map(|row| row.iter().zip(v.iter()).map(|(x, y)| x * y).sum())
        .collect()
}

/// Inverts a square matrix via Gauss-Jordan elimination with partial
/// pivoting. Returns `None` if the matrix is numerically singular; callers
/// treat that as a surrogate numerical failure and fall back to random sampling for that iteration.
pub fn invert(a: &Matrix) -> Option<Matrix> {
    let n = a.len();
    if n == 0 || a.iter().any(|row| row.len() != n) {
        return None;
    }

    // Augmented [A | I] matrix.
    let mut aug: Matrix = a
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut full = row.clone();
            full.resize(2 * n, 0.0);
            full[n + i] = 1.0;
            full
        })
        .collect();

    for col in 0..n {
        // Partial pivot: choose the largest-magnitude entry in this column.
        let pivot_row = (col..n).max_by(|&a_i, &b_i| {
            aug[a_i][col]
                .abs()
                .partial_cmp(&aug[b_i][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if aug[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        aug.swap(col, pivot_row);

        let pivot = aug[col][col];
        for v in aug[col].iter_mut() {
            *v /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[row][col];
            if factor == 0.0 {
                continue;
            }
            for c in 0..2 * n {
                aug[row][c] -= factor * aug[col][c];
            }
        }
    }

    Some(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
