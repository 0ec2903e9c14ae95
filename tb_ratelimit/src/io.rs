use std::io;
use std::io::Read;
use std::io::Write;
use std::sync::Arc;

use crate::bucket::Bucket;
use crate::clock::Clock;

/// Reader whose throughput is limited to the rate of a bucket
///
/// One token is one byte. Each read returns as soon as the underlying
/// reader does and then blocks until the bytes it returned are paid for.
#[derive(Debug)]
pub struct RateLimitedReader<R, C: Clock> {
    inner: R,
    bucket: Arc<Bucket<C>>,
}

/// Writer whose throughput is limited to the rate of a bucket
///
/// One token is one byte. Each write first waits for tokens covering the
/// whole buffer.
#[derive(Debug)]
pub struct RateLimitedWriter<W, C: Clock> {
    inner: W,
    bucket: Arc<Bucket<C>>,
}

/// Wrap `inner` so reads are throttled by `bucket`
pub fn reader<R: Read, C: Clock>(inner: R, bucket: Arc<Bucket<C>>) -> RateLimitedReader<R, C> {
    RateLimitedReader { inner, bucket }
}

/// Wrap `inner` so writes are throttled by `bucket`
pub fn writer<W: Write, C: Clock>(inner: W, bucket: Arc<Bucket<C>>) -> RateLimitedWriter<W, C> {
    RateLimitedWriter { inner, bucket }
}

impl<R, C: Clock> RateLimitedReader<R, C> {
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<W, C: Clock> RateLimitedWriter<W, C> {
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<R: Read, C: Clock> Read for RateLimitedReader<R, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.bucket.wait(n as u64);
        }
        Ok(n)
    }
}

impl<W: Write, C: Clock> Write for RateLimitedWriter<W, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bucket.wait(buf.len() as u64);
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;

    fn bucket(clock: &ManualClock) -> Arc<Bucket<ManualClock>> {
        // 10 bytes per millisecond, 10 byte burst
        Arc::new(Bucket::with_quantum_and_clock(Duration::from_millis(1), 10, 10, clock.clone()))
    }

    #[test]
    fn test_reader_throttles() {
        let clock = ManualClock::new();
        let start = clock.now();
        let data = vec![7u8; 100];

        let mut out = Vec::new();
        let mut limited = reader(data.as_slice(), bucket(&clock));
        limited.read_to_end(&mut out).unwrap();

        assert_eq!(out, data);
        // First 10 bytes are covered by the burst, the other 90 take 9ms
        assert_eq!(clock.now() - start, Duration::from_millis(9));
    }

    #[test]
    fn test_writer_throttles() {
        let clock = ManualClock::new();
        let start = clock.now();

        let mut limited = writer(Vec::new(), bucket(&clock));
        limited.write_all(&[1u8; 10]).unwrap();
        assert_eq!(clock.now(), start);

        limited.write_all(&[2u8; 25]).unwrap();
        limited.flush().unwrap();
        assert_eq!(clock.now() - start, Duration::from_millis(3));

        let written = limited.into_inner();
        assert_eq!(written.len(), 35);
    }

    #[test]
    fn test_empty_reads_are_free() {
        let clock = ManualClock::new();
        let bucket = bucket(&clock);
        let mut limited = reader(io::empty(), Arc::clone(&bucket));

        let mut buf = [0u8; 16];
        assert_eq!(limited.read(&mut buf).unwrap(), 0);
        assert_eq!(bucket.available(), 10);
    }
}
