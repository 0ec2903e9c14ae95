use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Instant;

use tb_app::cli;
use tb_app::config_loader;
use tb_app::shutdown_handler;
use tb_ratelimit::Bucket;
use tracing::debug;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "config/throttle.toml";

/// Push batches through the shared bucket until none remain or shutdown is requested
fn run_worker(worker: usize, bucket: &Bucket, running: &AtomicBool, remaining: &AtomicU64, batch_size: u64) -> u64 {
    let mut completed = 0;

    while running.load(Ordering::Relaxed) {
        if remaining.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1)).is_err() {
            break;
        }

        bucket.wait(batch_size);
        completed += 1;
        debug!(worker, completed, available = bucket.available(), "Batch admitted");
    }

    completed
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Keep guard alive for entire application lifetime
    let _guard = tb_app::tracing_setup::init_with_stdout("tb_throttle", "./logs", tracing::Level::INFO);

    let path = cli::get_config_path(DEFAULT_CONFIG_PATH);
    let config = config_loader::load_throttle_config_or_default(&path);

    let bucket = Arc::new(config.bucket.build()?);
    info!(
        rate = bucket.rate(),
        capacity = bucket.capacity(),
        quantum = bucket.quantum(),
        fill_interval = ?bucket.fill_interval(),
        "Token bucket ready"
    );

    let running = shutdown_handler::install()?;

    let remaining = Arc::new(AtomicU64::new(config.batches));
    let started = Instant::now();

    let handles = (0..config.workers.max(1))
        .map(|worker| {
            let bucket = Arc::clone(&bucket);
            let running = Arc::clone(&running);
            let remaining = Arc::clone(&remaining);
            let batch_size = config.batch_size;
            thread::Builder::new()
                .name(format!("throttle-{worker}"))
                .spawn(move || run_worker(worker, &bucket, &running, &remaining, batch_size))
        })
        .collect::<Result<Vec<_>, _>>()?;
    info!("Started {} workers for {} batches of {}", handles.len(), config.batches, config.batch_size);

    let mut completed = 0;
    for handle in handles {
        completed += handle.join().map_err(|_| "worker thread panicked")?;
    }

    let elapsed = started.elapsed();
    let tokens = completed * config.batch_size;
    let achieved_rate = tokens as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    info!(
        batches = completed,
        tokens,
        elapsed = ?elapsed,
        achieved_rate,
        target_rate = bucket.rate(),
        "Throttle run finished"
    );

    Ok(())
}
