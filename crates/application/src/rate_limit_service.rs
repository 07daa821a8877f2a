//! Rate limiting ports and application service.
//!
//! Implements a fixed-window limiter: each key gets a counter and a window
//! start, and the counter resets once the window has fully elapsed. A burst
//! straddling a reset can therefore admit up to twice the configured quota in
//! a short span.

mod config;
mod ports;
mod service;

pub use config::RateLimitRule;
pub use ports::{AttemptInfo, RateLimitRepository};
pub use service::{FixedWindowRateLimiter, RateLimitDecision};
