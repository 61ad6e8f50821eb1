//! Benchmark: direct-loop convolution vs im2col + tiled GEMM, and tiled GEMM
//! vs the naive matmul it replaces.

use std::time::Instant;

use tessel_core::{Conv2dParams, Result};
use tessel_kernels::conv::{conv2d, conv2d_im2col};
use tessel_kernels::matmul::naive_matmul;
use tessel_kernels::{Conv2dDims, Gemm, TiledGemm, Transpose};

fn time_per_iter(iters: usize, mut f: impl FnMut()) -> f64 {
    let start = Instant::now();
    for _ in 0..iters {
        f();
    }
    start.elapsed().as_secs_f64() / iters as f64
}

fn gflops(m: usize, n: usize, k: usize, secs: f64) -> f64 {
    (2.0 * m as f64 * n as f64 * k as f64) / secs / 1e9
}

fn bench_gemm() {
    let sizes: &[usize] = &[64, 128, 256, 512];

    println!("{:<12} {:>12} {:>12} {:>10} {:>10}", "Size", "Naive (ms)", "Tiled (ms)", "Speedup", "GF/s");
    println!("{}", "-".repeat(60));

    for &s in sizes {
        let a: Vec<f32> = (0..s * s).map(|i| ((i * 7 + 3) % 13) as f32 * 0.1 - 0.6).collect();
        let b: Vec<f32> = (0..s * s).map(|i| ((i * 11 + 5) % 17) as f32 * 0.1 - 0.8).collect();
        let mut c = vec![0.0f32; s * s];
        let iters = if s <= 128 { 100 } else if s <= 256 { 10 } else { 2 };

        let naive_s = time_per_iter(iters, || naive_matmul(s, s, s, &a, &b, &mut c));
        let tiled_s = time_per_iter(iters, || {
            TiledGemm.gemm(Transpose::No, Transpose::No, s, s, s, 1.0, &a, s, &b, s, 0.0, &mut c, s)
        });

        println!(
            "{:<12} {:>10.3}ms {:>10.3}ms {:>9.1}x {:>10.2}",
            format!("{s}x{s}x{s}"),
            naive_s * 1000.0,
            tiled_s * 1000.0,
            naive_s / tiled_s,
            gflops(s, s, s, tiled_s),
        );
    }
}

fn bench_conv2d() -> Result<()> {
    let cases: &[(usize, usize, usize, usize)] = &[
        // (c_in, spatial, c_out, kernel)
        (3, 32, 16, 3),
        (16, 32, 32, 3),
        (32, 64, 64, 3),
    ];

    println!("\n{:<20} {:>12} {:>12} {:>10}", "Conv2d", "Direct (ms)", "im2col (ms)", "Speedup");
    println!("{}", "-".repeat(58));

    let params = Conv2dParams::new(1, 1, 1);
    for &(c_in, hw, c_out, k) in cases {
        let dims = Conv2dDims { batch: 2, c_in, h_in: hw, w_in: hw, c_out, h_k: k, w_k: k };
        let (h_out, w_out) = params.out_hw(hw, hw, k, k)?;
        let src: Vec<f32> = (0..2 * c_in * hw * hw).map(|i| ((i * 7) % 13) as f32 * 0.1).collect();
        let kernel: Vec<f32> = (0..c_out * c_in * k * k).map(|i| ((i * 5) % 11) as f32 * 0.1 - 0.5).collect();
        let mut dst = vec![0.0f32; 2 * c_out * h_out * w_out];
        let iters = if c_in <= 3 { 20 } else { 3 };

        // Warm-up pass surfaces config errors before anything is timed.
        conv2d(&dims, &params, &src, &kernel, &mut dst)?;
        conv2d_im2col(&TiledGemm, &dims, &params, &src, &kernel, &mut dst)?;
        tracing::debug!(?dims, h_out, w_out, "conv2d case ready");

        let direct_s = time_per_iter(iters, || {
            conv2d(&dims, &params, &src, &kernel, &mut dst).expect("conv2d validated by warm-up");
        });
        let lowered_s = time_per_iter(iters, || {
            conv2d_im2col(&TiledGemm, &dims, &params, &src, &kernel, &mut dst)
                .expect("conv2d_im2col validated by warm-up");
        });

        println!(
            "{:<20} {:>10.3}ms {:>10.3}ms {:>9.1}x",
            format!("{c_in}->{c_out} {hw}x{hw} k{k}"),
            direct_s * 1000.0,
            lowered_s * 1000.0,
            direct_s / lowered_s,
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    println!("=== tessel kernels benchmark ===\n");
    bench_gemm();
    bench_conv2d()
}
