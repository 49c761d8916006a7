//! # Resilience Module
//!
//! Retry policies layered over single-attempt [`Transport`](crate::transport::Transport) calls.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`LinearBackoff`] | Client-wide policy: connection/timeout/5xx, delay `base * n` |
//! | [`ExponentialBackoff`] | `create_completion_with_retry` policy: anything but 4xx, delay `unit * 2^(n-1)` |
//! | [`execute_with_retry`] | Serial attempt loop driven by a [`ResiliencePolicy`] |
//!
//! The two policies are independent; callers pick one explicitly.
//!
//! ```rust
//! use paxsenix_ai::resilience::{LinearBackoff, ResiliencePolicy};
//! use std::time::Duration;
//!
//! let policy = LinearBackoff::new(2, Duration::from_millis(100));
//! let err = paxsenix_ai::Error::connection("refused");
//! assert_eq!(policy.should_retry(1, &err), Some(Duration::from_millis(100)));
//! assert_eq!(policy.should_retry(2, &err), Some(Duration::from_millis(200)));
//! assert_eq!(policy.should_retry(3, &err), None);
//! ```

pub mod retry;

pub use retry::{execute_with_retry, ExponentialBackoff, LinearBackoff, ResiliencePolicy};
