//! # tb_ratelimit
//!
//! Token bucket admission control: decide how long a caller must wait before
//! consuming N tokens, given a fill rate and a burst capacity.

pub mod bucket;
pub mod clock;
pub mod config;
pub mod error;
pub mod io;
pub mod rate;

pub use bucket::Bucket;
pub use bucket::MAX_TOKENS;
pub use bucket::UNBOUNDED_WAIT;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::MonotonicClock;
pub use config::BucketConfig;
pub use error::RateLimitError;
pub use error::Result;
pub use io::RateLimitedReader;
pub use io::RateLimitedWriter;
pub use io::reader;
pub use io::writer;
pub use rate::RATE_MARGIN;
