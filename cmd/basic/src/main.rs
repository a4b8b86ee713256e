//! Basic tpool example
//!
//! Builds a 4-worker pool, floods it with small print jobs, waits for the
//! queue to drain, then tears the pool down.
//!
//! # Environment Variables
//!
//! - `TPOOL_LOG_LEVEL=debug` - Show worker lifecycle lines
//! - `TPOOL_FLUSH_EPRINT=1` - Flush debug output immediately
//! - `BASIC_JOBS=<n>` - Number of jobs to submit (default 40)
//! - `BASIC_QUIET=1` - Count jobs instead of printing each one

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tpool::{env_get, env_get_bool, kinfo, PoolConfig, ThreadPool};

// TPOOL_LOG_LEVEL=debug cargo run -p tpool-basic
fn main() {
    println!("=== tpool Basic Example ===\n");

    let jobs: usize = env_get("BASIC_JOBS", 40);
    let quiet = env_get_bool("BASIC_QUIET", false);

    println!("Making threadpool with 4 threads");
    let pool = match ThreadPool::with_config(PoolConfig::from_env().num_workers(4)) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("failed to create pool: {}", e);
            std::process::exit(1);
        }
    };

    println!("Adding {} tasks to threadpool", jobs);
    let completed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    for i in 0..jobs {
        let c = Arc::clone(&completed);
        let submitted = pool.submit(
            move |n: usize| {
                if !quiet {
                    println!(
                        "Thread {} working on {}",
                        tpool::current_worker_id().unwrap_or(usize::MAX),
                        n
                    );
                }
                c.fetch_add(1, Ordering::Relaxed);
            },
            i,
        );
        if let Err(e) = submitted {
            eprintln!("failed to submit job {}: {}", i, e);
        }
    }

    pool.wait();
    kinfo!(
        "{} job(s) completed in {:?}",
        completed.load(Ordering::Relaxed),
        start.elapsed()
    );

    println!("Killing threadpool");
    pool.destroy();

    println!("\n=== Example Complete ===");
}
