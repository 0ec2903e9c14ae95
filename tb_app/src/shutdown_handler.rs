use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Installs a Ctrl+C handler and returns the flag it clears
///
/// Workers poll the flag between batches; tokens already reserved by a
/// worker when the signal arrives are not handed back to the bucket.
pub fn install() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        tracing::info!("Shutdown signal received, finishing in-flight batches");
        flag.store(false, Ordering::Relaxed);
    })?;
    Ok(running)
}
