//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → resolver.rs (ordered prefix scan)
//!     → Return: route timeout override or upstream default
//!
//! Route Compilation (at startup):
//!     RouteRule[]
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes frozen at startup, immutable at runtime
//! - Literal prefix matching only, no normalization, no regex
//! - Deterministic: same input always resolves the same timeout
//! - First matching rule with an override wins

pub mod resolver;

pub use resolver::RouteTable;
