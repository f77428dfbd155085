//! Sparse Jacobian types and assembly helpers.
//!
//! Jacobians are assembled in triplet form and converted to CSC once all
//! blocks have scattered their entries. Scatter offsets always come from
//! registration-time bookkeeping (variable-set column offsets, problem row
//! offsets), never from caller-supplied indices, so writes outside a
//! block's declared region cannot happen by construction.

use sprs::{CsMat, TriMat};

/// Sparse matrix in CSC format.
pub type SparseCsc = CsMat<f64>;

/// Triplet-format builder that constraint and cost blocks scatter into.
///
/// Duplicate entries are summed by `to_csc()`, which is what the
/// cost-gradient accumulation relies on.
pub type SparseTriplets = TriMat<f64>;

/// Scatter an N×N identity block scaled by `scale` at the given offsets.
pub fn scatter_identity(
    out: &mut SparseTriplets,
    row_offset: usize,
    col_offset: usize,
    n: usize,
    scale: f64,
) {
    for i in 0..n {
        out.add_triplet(row_offset + i, col_offset + i, scale);
    }
}

/// Extract a dense row of a sparse matrix (used by tests and diagnostics).
pub fn dense_row(m: &SparseCsc, row: usize) -> Vec<f64> {
    let mut out = vec![0.0; m.cols()];
    for (&val, (r, c)) in m.iter() {
        if r == row {
            out[c] += val;
        }
    }
    out
}
