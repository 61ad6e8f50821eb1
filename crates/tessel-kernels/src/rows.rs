//! Row-loop driver shared by the last-axis kernels.
//!
//! Rows are data-independent, so with the `parallel` feature large inputs
//! are split across the rayon pool. Without it every kernel stays on the
//! calling thread.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Minimum element count before rows are handed to rayon.
#[cfg(feature = "parallel")]
const PAR_THRESHOLD: usize = 8192;

/// Call `f(row_index, row)` for each `ncols`-wide row of `dst`.
pub(crate) fn for_each_row<T, F>(dst: &mut [T], ncols: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if ncols == 0 || dst.is_empty() {
        return;
    }

    #[cfg(feature = "parallel")]
    if dst.len() >= PAR_THRESHOLD {
        dst.par_chunks_mut(ncols)
            .enumerate()
            .for_each(|(row, chunk)| f(row, chunk));
        return;
    }

    for (row, chunk) in dst.chunks_mut(ncols).enumerate() {
        f(row, chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_visited_in_order() {
        let mut data = vec![0usize; 12];
        for_each_row(&mut data, 4, |row, chunk| {
            for v in chunk.iter_mut() {
                *v = row;
            }
        });
        assert_eq!(data, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn test_zero_width_is_noop() {
        let mut data: Vec<f32> = Vec::new();
        for_each_row(&mut data, 0, |_, _| panic!("no rows expected"));
    }
}
