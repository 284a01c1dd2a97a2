//! Request-forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, headers, buffered body)
//!     → headers.rs (strip hop-by-hop headers)
//!     → forward.rs (one upstream call under the resolved read timeout)
//!     → headers.rs (strip hop-by-hop headers, response direction)
//!     → Return: buffered response, or streamed chunk relay
//!
//! Failures:
//!     error.rs maps every upstream failure to a structured
//!     504 / 502 / 500 response; nothing is dropped silently
//! ```
//!
//! # Design Decisions
//! - No retries: a single failed attempt is surfaced immediately
//! - Streaming uses one upstream call; headers are returned as soon as
//!   they arrive and the body is relayed from that same call
//! - A process-wide semaphore caps concurrent upstream connections

pub mod error;
pub mod forward;
pub mod headers;

pub use error::ProxyError;
pub use forward::UpstreamClient;
