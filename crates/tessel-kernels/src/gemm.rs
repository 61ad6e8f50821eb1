//! Dense matrix multiply behind a trait, consumed by the im2col convolution.
//!
//! Matrices are row-major with explicit leading dimensions, as in BLAS
//! `gemm`: `C = alpha * op(A) @ op(B) + beta * C`, where `op(A)` is `m x k`,
//! `op(B)` is `k x n` and `C` is `m x n`.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use tessel_core::Element;

// A TILE_K x TILE_N panel of op(B) is reused by every row of a TILE_M
// block: 16 KiB at f32, 32 KiB at f64. TILE_M is also the rayon work unit.
const TILE_M: usize = 64;
const TILE_N: usize = 64;
const TILE_K: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transpose {
    #[default]
    No,
    Yes,
}

/// Row-major GEMM. Plug in a BLAS binding by implementing this; the
/// kernels only ever call it with `beta = 0`.
pub trait Gemm<T: Element> {
    #[allow(clippy::too_many_arguments)]
    fn gemm(
        &self,
        trans_a: Transpose,
        trans_b: Transpose,
        m: usize,
        n: usize,
        k: usize,
        alpha: T,
        a: &[T],
        lda: usize,
        b: &[T],
        ldb: usize,
        beta: T,
        c: &mut [T],
        ldc: usize,
    );
}

/// Portable tiled GEMM. With the `parallel` feature, row blocks of `C`
/// run on the rayon pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiledGemm;

#[derive(Clone, Copy)]
struct Operand<'a, T> {
    data: &'a [T],
    ld: usize,
    trans: Transpose,
}

impl<T: Copy> Operand<'_, T> {
    #[inline]
    fn at(&self, row: usize, col: usize) -> T {
        match self.trans {
            Transpose::No => self.data[row * self.ld + col],
            Transpose::Yes => self.data[col * self.ld + row],
        }
    }
}

/// Compute rows `i0..i_end` of `C` into `c_block`, whose row `r` starts at
/// `(r - i0) * ldc`.
#[allow(clippy::too_many_arguments)]
fn gemm_rows<T: Element>(
    i0: usize,
    i_end: usize,
    n: usize,
    k: usize,
    alpha: T,
    a: Operand<'_, T>,
    b: Operand<'_, T>,
    beta: T,
    c_block: &mut [T],
    ldc: usize,
) {
    for i in i0..i_end {
        let row = &mut c_block[(i - i0) * ldc..(i - i0) * ldc + n];
        // beta == 0 overwrites, so stale NaNs in C never leak through.
        if beta == T::ZERO {
            row.fill(T::ZERO);
        } else if beta != T::ONE {
            for v in row.iter_mut() {
                *v = v.mul_wrapping(beta);
            }
        }
    }

    for j0 in (0..n).step_by(TILE_N) {
        let j_end = (j0 + TILE_N).min(n);
        for p0 in (0..k).step_by(TILE_K) {
            let p_end = (p0 + TILE_K).min(k);

            for i in i0..i_end {
                let row = &mut c_block[(i - i0) * ldc..];
                for p in p0..p_end {
                    let a_val = alpha.mul_wrapping(a.at(i, p));
                    for j in j0..j_end {
                        row[j] = row[j].add_wrapping(a_val.mul_wrapping(b.at(p, j)));
                    }
                }
            }
        }
    }
}

impl<T: Element> Gemm<T> for TiledGemm {
    fn gemm(
        &self,
        trans_a: Transpose,
        trans_b: Transpose,
        m: usize,
        n: usize,
        k: usize,
        alpha: T,
        a: &[T],
        lda: usize,
        b: &[T],
        ldb: usize,
        beta: T,
        c: &mut [T],
        ldc: usize,
    ) {
        if m == 0 || n == 0 {
            return;
        }
        tracing::debug!(dtype = %T::DTYPE, ?trans_a, ?trans_b, m, n, k, "tiled gemm");
        let a = Operand { data: a, ld: lda, trans: trans_a };
        let b = Operand { data: b, ld: ldb, trans: trans_b };
        let c = &mut c[..(m - 1) * ldc + n];

        #[cfg(feature = "parallel")]
        if m > TILE_M {
            c.par_chunks_mut(TILE_M * ldc)
                .enumerate()
                .for_each(|(blk, c_block)| {
                    let i0 = blk * TILE_M;
                    let i_end = (i0 + TILE_M).min(m);
                    gemm_rows(i0, i_end, n, k, alpha, a, b, beta, c_block, ldc);
                });
            return;
        }

        for i0 in (0..m).step_by(TILE_M) {
            let i_end = (i0 + TILE_M).min(m);
            let c_block = &mut c[i0 * ldc..];
            gemm_rows(i0, i_end, n, k, alpha, a, b, beta, c_block, ldc);
        }
    }
}
