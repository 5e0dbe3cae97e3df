//! Flat-loop throughput compared against sequential execution and rayon.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use divan::Bencher;
use rayon::prelude::*;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tutti::ThreadPool;

// -----------------------------------------------------------------------------
// Workload

/// A cheap stand-in for a shader: a few dozen cycles of integer mixing per
/// index.
#[inline]
fn shade(index: i32) -> u64 {
    let mut x = index as u64 ^ 0x9e37_79b9_7f4a_7c15;
    for _ in 0..32 {
        x ^= x >> 29;
        x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    }
    x
}

const SIZES: &[i32] = &[1 << 10, 1 << 14, 1 << 18];

// -----------------------------------------------------------------------------
// Benchmark

#[divan::bench(args = SIZES)]
fn baseline(bencher: Bencher, size: i32) {
    bencher.bench_local(move || {
        let mut sum = 0u64;
        for index in 0..size {
            sum = sum.wrapping_add(shade(index));
        }
        sum
    });
}

static POOL: ThreadPool = ThreadPool::new();

#[divan::bench(args = SIZES)]
fn tutti(bencher: Bencher, size: i32) {
    bencher.bench_local(move || {
        let sum = AtomicU64::new(0);
        let status = POOL.for_each(0, size, |index| {
            sum.fetch_add(shade(index), Ordering::Relaxed);
            0
        });
        assert_eq!(status, 0);
        sum.into_inner()
    });
}

#[divan::bench(args = SIZES)]
fn rayon(bencher: Bencher, size: i32) {
    bencher.bench_local(move || {
        (0..size)
            .into_par_iter()
            .map(shade)
            .reduce(|| 0u64, u64::wrapping_add)
    });
}

fn main() {
    let fmt_layer = fmt::layer()
        .without_time()
        .with_target(false)
        .with_thread_names(true)
        .compact();

    tracing_subscriber::registry().with(fmt_layer).init();

    POOL.set_num_threads(0);

    divan::main();
}
