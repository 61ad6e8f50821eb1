//! Direct-loop matrix multiply, plain and batched.
//!
//! These are reference kernels: every output element is one dot product
//! accumulated in the element type. They work for integer elements too,
//! which the tiled GEMM path is never asked to handle.

use tessel_core::Element;

/// `C[m, n] = A[m, k] @ B[k, n]`, all row-major.
pub fn naive_matmul<T: Element>(m: usize, n: usize, k: usize, a: &[T], b: &[T], c: &mut [T]) {
    naive_matmul_strided(m, n, k, a, [k, 1], b, [n, 1], c, [n, 1]);
}

/// [`naive_matmul`] with `[row, col]` strides for each operand.
#[allow(clippy::too_many_arguments)]
pub fn naive_matmul_strided<T: Element>(
    m: usize,
    n: usize,
    k: usize,
    a: &[T],
    a_strides: [usize; 2],
    b: &[T],
    b_strides: [usize; 2],
    c: &mut [T],
    c_strides: [usize; 2],
) {
    for i in 0..m {
        for j in 0..n {
            let mut sum = T::ZERO;
            for l in 0..k {
                let prod = a[i * a_strides[0] + l * a_strides[1]].mul_wrapping(b[l * b_strides[0] + j * b_strides[1]]);
                sum = sum.add_wrapping(prod);
            }
            c[i * c_strides[0] + j * c_strides[1]] = sum;
        }
    }
}

/// Batched `C[bb] = A[bb] @ B[bb]` over densely packed batches.
pub fn naive_batched_matmul<T: Element>(
    batch: usize,
    m: usize,
    n: usize,
    k: usize,
    a: &[T],
    b: &[T],
    c: &mut [T],
) {
    naive_batched_matmul_strided(
        batch,
        m,
        n,
        k,
        a,
        [m * k, k, 1],
        b,
        [k * n, n, 1],
        c,
        [m * n, n, 1],
    );
}

/// Batched matmul with `[batch, row, col]` strides per operand.
///
/// A zero batch stride on `a` or `b` reuses the same matrix for every batch
/// entry, which is how a shared weight broadcasts against a batch.
#[allow(clippy::too_many_arguments)]
pub fn naive_batched_matmul_strided<T: Element>(
    batch: usize,
    m: usize,
    n: usize,
    k: usize,
    a: &[T],
    a_strides: [usize; 3],
    b: &[T],
    b_strides: [usize; 3],
    c: &mut [T],
    c_strides: [usize; 3],
) {
    for bb in 0..batch {
        let a_base = bb * a_strides[0];
        let b_base = bb * b_strides[0];
        let c_base = bb * c_strides[0];
        for i in 0..m {
            for j in 0..n {
                let mut sum = T::ZERO;
                for l in 0..k {
                    let prod = a[a_base + i * a_strides[1] + l * a_strides[2]]
                        .mul_wrapping(b[b_base + l * b_strides[1] + j * b_strides[2]]);
                    sum = sum.add_wrapping(prod);
                }
                c[c_base + i * c_strides[1] + j * c_strides[2]] = sum;
            }
        }
    }
}
